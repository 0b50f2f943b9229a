//! Loft Router - Nested path resolution and navigation
//!
//! A route specification is parsed once into an immutable matching tree:
//! literal segments, one wildcard-capture branch per level, terminals that
//! are either pages or redirect strings. Resolution walks the tree segment
//! by segment, capturing parameters and following redirects, and two
//! drivers (history mode and hash mode) connect resolution to an address
//! surface.

mod address;
mod driver;
mod router;
mod routes;

pub use address::{AddressEntry, AddressSurface, MemoryAddress};
pub use driver::{HashDriver, HistoryDriver, OnMove};
pub use router::{Route, Router, MAX_REDIRECTS};
pub use routes::{RouteSpecError, Routes};

/// Resolution failures. Drivers catch these and fall back to the root
/// path; redirects are not errors and never surface here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    /// A path segment matched no branch and no wildcard fallback exists.
    #[error("no route matches {0}")]
    NotFound(String),
    /// The walk reached an interior node but no `index` terminal resolves.
    #[error("no page defined for {0}")]
    PageNotDefined(String),
    /// Redirects chained past [`MAX_REDIRECTS`] hops.
    #[error("redirect loop at {0}")]
    RedirectLoop(String),
}
