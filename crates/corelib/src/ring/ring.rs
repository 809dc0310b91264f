//! The weighted consistent-hash ring.

use std::collections::HashMap;
use std::collections::HashSet;

use parking_lot::RwLock;

/// Per-node virtual key count: `4 * floor(30 * |nodes| * weight / total_weight)`.
const SEEDS_PER_NODE_FACTOR: u64 = 30;
const WINDOWS_PER_SEED: u32 = 4;

struct Inner {
    /// node (canonical `address:port`) -> weight.
    weights: HashMap<String, u32>,
    /// Sorted by key ascending; kept consistent with `weights` after every
    /// mutation (spec.md §3 "Ring" invariant).
    keys: Vec<(u32, String)>,
}

impl Inner {
    fn regenerate(&mut self) {
        self.keys.clear();
        let total_weight: u64 = self.weights.values().map(|&w| w as u64).sum();
        if total_weight == 0 {
            return;
        }
        let node_count = self.weights.len() as u64;
        for (node, &weight) in &self.weights {
            let factor = (SEEDS_PER_NODE_FACTOR * node_count * weight as u64) / total_weight;
            for j in 0..factor {
                for key in virtual_keys(node, j) {
                    self.keys.push((key, node.clone()));
                }
            }
        }
        self.keys.sort_by_key(|(k, _)| *k);
    }
}

/// Four virtual keys generated from `MD5(node + "-" + j)` (spec.md §3).
///
/// Only the digest's first four bytes feed all four windows; window `i`
/// adds an extra `8*i`-bit shift on top of the usual big-endian combination,
/// truncated to 32 bits. This looks wasteful of the other twelve digest
/// bytes, but it is the exact formula spec.md pins for interoperability —
/// do not "fix" it to use the full digest.
fn virtual_keys(node: &str, j: u64) -> [u32; WINDOWS_PER_SEED as usize] {
    let digest = md5::compute(format!("{node}-{j}").as_bytes());
    let b = digest.0;
    let mut keys = [0u32; WINDOWS_PER_SEED as usize];
    for (i, slot) in keys.iter_mut().enumerate() {
        let extra = 8 * i as u32;
        let v: u64 = ((b[0] as u64) << (24 + extra))
            | ((b[1] as u64) << (16 + extra))
            | ((b[2] as u64) << (8 + extra))
            | ((b[3] as u64) << extra);
        *slot = v as u32;
    }
    keys
}

/// Consistent-hash ring over node identities.
///
/// Internally a `parking_lot::RwLock`: lookups take a read guard, mutations
/// take a write guard and rebuild the virtual-key table and the weight map
/// together so no reader ever observes a partial rebuild (spec.md §9).
pub struct Ring {
    inner: RwLock<Inner>,
}

impl Default for Ring {
    fn default() -> Self {
        Self::new()
    }
}

impl Ring {
    pub fn new() -> Self {
        Ring {
            inner: RwLock::new(Inner { weights: HashMap::new(), keys: Vec::new() }),
        }
    }

    /// Inserts `node` with the given weight and regenerates the whole
    /// virtual-key table. Idempotent in set terms (re-adding an existing
    /// node with a different weight updates it and still regenerates).
    pub fn add(&self, node: impl Into<String>, weight: u32) {
        let mut inner = self.inner.write();
        inner.weights.insert(node.into(), weight.max(1));
        inner.regenerate();
    }

    /// Removes `node` if present and regenerates. Idempotent: removing a
    /// node that is not present is a no-op (still triggers a regeneration
    /// with identical output).
    pub fn remove(&self, node: &str) {
        let mut inner = self.inner.write();
        inner.weights.remove(node);
        inner.regenerate();
    }

    /// Set-union of `nodes` (each with weight 1) followed by a single
    /// regeneration.
    pub fn extend(&self, nodes: impl IntoIterator<Item = String>) {
        let mut inner = self.inner.write();
        for node in nodes {
            inner.weights.entry(node).or_insert(1);
        }
        inner.regenerate();
    }

    /// Returns the node owning `key`: the least virtual key strictly
    /// greater than `gen_key(key)`, wrapping to the smallest virtual key.
    /// `None` if the ring is empty.
    pub fn lookup(&self, key: &str) -> Option<String> {
        let inner = self.inner.read();
        if inner.keys.is_empty() {
            return None;
        }
        let target = Self::gen_key(key);
        let idx = inner.keys.partition_point(|&(k, _)| k <= target);
        let idx = if idx == inner.keys.len() { 0 } else { idx };
        Some(inner.keys[idx].1.clone())
    }

    /// Current node identities.
    pub fn nodes(&self) -> HashSet<String> {
        self.inner.read().weights.keys().cloned().collect()
    }

    pub fn node_count(&self) -> usize {
        self.inner.read().weights.len()
    }

    pub fn virtual_key_count(&self) -> usize {
        self.inner.read().keys.len()
    }

    /// Whether `node` currently holds any position on the ring.
    pub fn contains(&self, node: &str) -> bool {
        self.inner.read().weights.contains_key(node)
    }

    /// Hashes a key to its 32-bit ring position.
    ///
    /// If `key` is exactly 32 lowercase hex characters, the first 8 are
    /// read directly as a big-endian u32 (the short-circuit that lets a
    /// caller pass a precomputed MD5 hex digest without re-hashing it).
    /// Otherwise this is `MD5(key)`'s first four bytes, big-endian.
    pub fn gen_key(key: &str) -> u32 {
        if key.len() == 32 && key.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase())
        {
            if let Ok(v) = u32::from_str_radix(&key[0..8], 16) {
                return v;
            }
        }
        let digest = md5::compute(key.as_bytes());
        u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
    }
}

/// Convenience builder for assembling a ring's initial membership.
pub struct RingBuilder {
    nodes: Vec<(String, u32)>,
}

impl Default for RingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RingBuilder {
    pub fn new() -> Self {
        RingBuilder { nodes: Vec::new() }
    }

    pub fn add_node(mut self, node: impl Into<String>) -> Self {
        self.nodes.push((node.into(), 1));
        self
    }

    pub fn add_node_with_weight(mut self, node: impl Into<String>, weight: u32) -> Self {
        self.nodes.push((node.into(), weight));
        self
    }

    pub fn build(self) -> Ring {
        let ring = Ring::new();
        for (node, weight) in self.nodes {
            ring.add(node, weight);
        }
        ring
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_ring_lookup_returns_none() {
        let ring = Ring::new();
        assert_eq!(ring.lookup("anything"), None);
        assert_eq!(ring.node_count(), 0);
    }

    #[test]
    fn single_node_owns_every_key() {
        let ring = Ring::new();
        ring.add("127.0.0.1:9900", 1);
        for key in ["a", "b", "the-quick-brown-fox", ""] {
            assert_eq!(ring.lookup(key).as_deref(), Some("127.0.0.1:9900"));
        }
    }

    #[test]
    fn virtual_key_count_matches_weighted_formula() {
        let ring = Ring::new();
        ring.add("a", 1);
        ring.add("b", 1);
        ring.add("c", 2);
        // total_weight = 4, node_count = 3
        // factor(a) = floor(30*3*1/4) = 22, factor(b) = 22, factor(c) = floor(30*3*2/4) = 45
        assert_eq!(ring.virtual_key_count(), 4 * (22 + 22 + 45));
    }

    #[test]
    fn lookup_is_deterministic() {
        let ring = Ring::new();
        ring.add("a", 1);
        ring.add("b", 1);
        ring.add("c", 1);
        let key = "consistent-key";
        let first = ring.lookup(key);
        for _ in 0..10 {
            assert_eq!(ring.lookup(key), first);
        }
    }

    #[test]
    fn gen_key_is_stable_and_hex_short_circuit_matches_md5() {
        let digest = md5::compute(b"hello");
        let hex = format!("{digest:x}");
        assert_eq!(Ring::gen_key("hello"), Ring::gen_key(&hex));
        assert_eq!(Ring::gen_key("hello"), Ring::gen_key("hello"));
    }

    #[test]
    fn gen_key_matches_md5_first_four_bytes_big_endian() {
        let digest = md5::compute(b"hello");
        let expected = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
        assert_eq!(Ring::gen_key("hello"), expected);
    }

    #[test]
    fn non_hex_32_char_key_takes_md5_path() {
        // 32 characters, but contains a non-hex letter ('g'), so it must be
        // hashed rather than parsed as a literal digest.
        let key = "g23456789012345678901234567890a";
        assert_eq!(key.len(), 32);
        let digest = md5::compute(key.as_bytes());
        let expected = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
        assert_eq!(Ring::gen_key(key), expected);
    }

    #[test]
    fn idempotent_add_and_remove() {
        let ring = Ring::new();
        ring.add("a", 1);
        let count_once = ring.virtual_key_count();
        ring.add("a", 1);
        assert_eq!(ring.virtual_key_count(), count_once);
        assert_eq!(ring.node_count(), 1);

        ring.remove("missing");
        assert_eq!(ring.node_count(), 1);

        ring.remove("a");
        assert_eq!(ring.node_count(), 0);
        assert_eq!(ring.lookup("x"), None);
    }

    #[test]
    fn extend_unions_nodes_with_default_weight() {
        let ring = Ring::new();
        ring.extend(["a".to_string(), "b".to_string()]);
        assert_eq!(ring.nodes(), HashSet::from(["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn builder_assembles_initial_membership() {
        let ring = RingBuilder::new()
            .add_node("a")
            .add_node_with_weight("b", 2)
            .build();
        assert_eq!(ring.node_count(), 2);
        assert!(ring.contains("a"));
        assert!(ring.contains("b"));
    }
}
