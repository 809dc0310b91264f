//! Integration tests for the hash ring, covering spec.md §8's boundary
//! behaviors and invariants from outside the crate (no `src/` internals).

use corelib::Ring;

#[test]
fn empty_ring_has_no_nodes_and_no_lookup() {
    let ring = Ring::new();
    assert_eq!(ring.lookup("key1"), None);
    assert_eq!(ring.node_count(), 0);
    assert_eq!(ring.virtual_key_count(), 0);
}

#[test]
fn single_node_ring_answers_every_lookup() {
    let ring = Ring::new();
    ring.add("127.0.0.1:9900", 1);
    for key in ["A", "Z", "hello world", ""] {
        assert_eq!(ring.lookup(key).as_deref(), Some("127.0.0.1:9900"));
    }
}

#[test]
fn adding_and_removing_nodes_rebalances_the_whole_ring() {
    let ring = Ring::new();
    ring.add("a", 1);
    let solo_count = ring.virtual_key_count();

    ring.add("b", 1);
    // Virtual key count depends on |nodes|, so adding a second node changes
    // both nodes' vnode counts, not just appends the new node's vnodes.
    assert_ne!(ring.virtual_key_count(), solo_count * 2);

    ring.remove("b");
    assert_eq!(ring.virtual_key_count(), solo_count);
}

#[test]
fn lookup_is_deterministic_across_repeated_calls() {
    let ring = Ring::new();
    for n in ["a", "b", "c", "d"] {
        ring.add(n, 1);
    }
    let owners: Vec<_> = (0..50).map(|i| ring.lookup(&format!("key-{i}"))).collect();
    let owners_again: Vec<_> = (0..50).map(|i| ring.lookup(&format!("key-{i}"))).collect();
    assert_eq!(owners, owners_again);
}

#[test]
fn weighted_nodes_get_proportionally_more_virtual_keys() {
    let ring = Ring::new();
    ring.add("light", 1);
    ring.add("heavy", 3);

    let mut counts = std::collections::HashMap::new();
    for node in ring.nodes() {
        counts.insert(node, 0usize);
    }
    // Re-derive counts indirectly: every key should map to one of the two
    // nodes, and with a 3x weight difference the heavy node should win a
    // clear majority of a large enough sample.
    let mut heavy_hits = 0;
    let total = 2000;
    for i in 0..total {
        if ring.lookup(&format!("sample-{i}")).as_deref() == Some("heavy") {
            heavy_hits += 1;
        }
    }
    assert!(heavy_hits > total / 2, "heavy node should own more than half the keys");
}
