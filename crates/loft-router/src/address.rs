//! Address surfaces.
//!
//! Drivers read and write navigation state through [`AddressSurface`], so
//! the same protocol runs against a browser location bar or, as here, an
//! in-process history stack.

use std::cell::RefCell;

/// The address bar as the drivers see it.
pub trait AddressSurface {
    fn pathname(&self) -> String;
    fn hash(&self) -> String;
    /// Push a new history entry with this path.
    fn push(&self, path: &str);
    /// Replace the current entry's path, leaving history length alone.
    fn replace(&self, path: &str);
    /// Push a new entry with the current path and this fragment.
    fn set_hash(&self, hash: &str);
    /// Replace the current entry's fragment.
    fn replace_hash(&self, hash: &str);
    /// Move back one entry. Returns whether the cursor moved; surfaces
    /// that cannot report this may always return `true`.
    fn go_back(&self) -> bool;
    /// Move forward one entry.
    fn go_forward(&self) -> bool;
}

/// One history entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressEntry {
    pub pathname: String,
    pub hash: String,
}

struct AddressState {
    entries: Vec<AddressEntry>,
    current: usize,
}

/// An in-process address: a history stack with a cursor. Pushing a new
/// entry truncates forward history, like a browser does.
pub struct MemoryAddress {
    state: RefCell<AddressState>,
}

impl MemoryAddress {
    pub fn new(initial_path: &str) -> Self {
        Self {
            state: RefCell::new(AddressState {
                entries: vec![AddressEntry {
                    pathname: initial_path.to_string(),
                    hash: String::new(),
                }],
                current: 0,
            }),
        }
    }

    pub fn current(&self) -> AddressEntry {
        let state = self.state.borrow();
        state.entries[state.current].clone()
    }

    /// Move the cursor back one entry. Returns the restored entry, or
    /// `None` at the oldest entry.
    pub fn back(&self) -> Option<AddressEntry> {
        self.shift(-1)
    }

    /// Move the cursor forward one entry.
    pub fn forward(&self) -> Option<AddressEntry> {
        self.shift(1)
    }

    pub fn len(&self) -> usize {
        self.state.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        false // there is always at least the initial entry
    }

    fn shift(&self, delta: isize) -> Option<AddressEntry> {
        let mut state = self.state.borrow_mut();
        let target = state.current as isize + delta;
        if target < 0 || target as usize >= state.entries.len() {
            return None;
        }
        state.current = target as usize;
        Some(state.entries[state.current].clone())
    }

    fn push_entry(&self, entry: AddressEntry) {
        let mut state = self.state.borrow_mut();
        let keep = state.current + 1;
        state.entries.truncate(keep);
        state.entries.push(entry);
        state.current = state.entries.len() - 1;
    }
}

impl AddressSurface for MemoryAddress {
    fn pathname(&self) -> String {
        self.current().pathname
    }

    fn hash(&self) -> String {
        self.current().hash
    }

    fn push(&self, path: &str) {
        self.push_entry(AddressEntry {
            pathname: path.to_string(),
            hash: String::new(),
        });
    }

    fn replace(&self, path: &str) {
        let mut state = self.state.borrow_mut();
        let current = state.current;
        state.entries[current].pathname = path.to_string();
    }

    fn set_hash(&self, hash: &str) {
        let pathname = self.pathname();
        self.push_entry(AddressEntry {
            pathname,
            hash: hash.to_string(),
        });
    }

    fn replace_hash(&self, hash: &str) {
        let mut state = self.state.borrow_mut();
        let current = state.current;
        state.entries[current].hash = hash.to_string();
    }

    fn go_back(&self) -> bool {
        self.back().is_some()
    }

    fn go_forward(&self) -> bool {
        self.forward().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_truncates_forward_history() {
        let addr = MemoryAddress::new("/");
        addr.push("/a");
        addr.push("/b");
        addr.back();
        assert_eq!(addr.pathname(), "/a");

        addr.push("/c");
        assert_eq!(addr.len(), 3, "forward entry dropped");
        assert!(addr.forward().is_none());
        assert_eq!(addr.pathname(), "/c");
    }

    #[test]
    fn test_replace_keeps_length() {
        let addr = MemoryAddress::new("/");
        addr.push("/a/");
        addr.replace("/a");
        assert_eq!(addr.len(), 2);
        assert_eq!(addr.pathname(), "/a");
    }

    #[test]
    fn test_hash_entries() {
        let addr = MemoryAddress::new("/");
        addr.set_hash("#!/books");
        assert_eq!(addr.hash(), "#!/books");
        assert_eq!(addr.pathname(), "/");

        addr.replace_hash("#!/about");
        assert_eq!(addr.hash(), "#!/about");
        assert_eq!(addr.len(), 2);

        addr.back();
        assert_eq!(addr.hash(), "");
    }

    #[test]
    fn test_back_at_oldest_is_none() {
        let addr = MemoryAddress::new("/");
        assert!(addr.back().is_none());
        assert_eq!(addr.pathname(), "/");
    }
}
