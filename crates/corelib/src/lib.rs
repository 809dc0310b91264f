//! Core library: node identity, the consistent-hash ring, and the shared
//! error taxonomy used by every other crate in the workspace.

pub mod error;
pub mod location;
pub mod ring;

pub use error::{Error, Result};
pub use location::Location;
pub use ring::{Ring, RingBuilder};
