//! `StoreNode`: a single peer on the ring. Combines the gossip membership
//! engine with a local key-value table, routes `get`/`put` through the ring,
//! and owns the join/cleanup lifecycle (spec.md §4.4-§4.6).

mod node;

pub use node::StoreNode;
