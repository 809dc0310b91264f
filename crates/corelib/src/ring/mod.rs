//! Consistent hash ring (spec.md §3, §4.1).
//!
//! A weighted consistent-hash circle over node identities (canonical
//! `address:port` strings). Lookups are `O(log n)` over the sorted virtual
//! key list; every mutation rebuilds that list from scratch, since the
//! per-node virtual key count depends on the full node set.

mod ring;

pub use ring::{Ring, RingBuilder};
