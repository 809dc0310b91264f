//! The gossip membership engine (spec.md §4.3, §4.4): authority-bounded
//! add/remove propagation with cascading dead-peer removal, and the join
//! protocol's bootstrap side.

mod engine;

pub use engine::{ping_until_return, MembershipEngine};
