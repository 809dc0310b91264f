//! Shared error taxonomy (spec.md §7).
//!
//! `NodeNotFound` is the only variant the membership engine is allowed to
//! catch and convert into a cascading remove; every other variant must
//! bubble all the way up to the caller.

use crate::location::Location;

/// Result type alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Connect- or transport-level failure talking to a named peer.
    #[error("node not found: {0}")]
    NodeNotFound(Location),

    /// An IDL/encoding anomaly. Never caught by the gossip engine.
    #[error("protocol error: {0}")]
    ProtocolError(String),

    /// On start-up, our intended self-location already answers `ping`.
    #[error("address already in use: {0}")]
    AlreadyInUse(Location),

    /// Anything else internal to a single process.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// The peer this error concerns, if any — used by callers that need to
    /// cascade a removal keyed on the dead location.
    pub fn dead_location(&self) -> Option<&Location> {
        match self {
            Error::NodeNotFound(loc) => Some(loc),
            _ => None,
        }
    }
}
