use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use corelib::{Error, Location, Result, Ring};
use rpc::RpcClient;

/// An async method that recurses (`remove` re-invokes itself on cascade)
/// needs its return type boxed; the plain `async fn` sugar can't express an
/// infinitely-sized self-referential future.
type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A node's own view of the ring plus the gossip logic for keeping it in
/// sync with the rest of the cluster. Holds no data of its own beyond the
/// ring and this node's identity — the local key-value table lives one
/// layer up, in `store`.
pub struct MembershipEngine {
    self_location: Location,
    ring: Arc<Ring>,
}

impl MembershipEngine {
    pub fn new(self_location: Location) -> Self {
        MembershipEngine { self_location, ring: Arc::new(Ring::new()) }
    }

    pub fn self_location(&self) -> &Location {
        &self.self_location
    }

    pub fn ring(&self) -> &Arc<Ring> {
        &self.ring
    }

    /// Join bootstrap, run by the node that is joining (spec.md §4.4 step 1).
    /// With no known peer, a node simply starts as the sole member of its
    /// own ring.
    pub async fn bootstrap_join(&self, peer: Option<Location>) {
        self.ring.add(self.self_location.canonical(), 1);
        let Some(peer) = peer else { return };
        if let Ok(roster) = RpcClient::get_all(&peer).await {
            self.ring.extend(roster.into_iter().map(|loc| loc.canonical()));
        }
        if let Err(err) = RpcClient::join(&peer, self.self_location.clone()).await {
            tracing::debug!(%peer, ?err, "join announce to bootstrap peer failed");
        }
    }

    /// Gossip `add` handler (spec.md §4.3). Forwards to the sorted candidate
    /// set before admitting `new_loc` locally, per the after-forwarding
    /// insertion order this expansion resolved in DESIGN.md.
    pub async fn add(&self, new_loc: Location, authorities: Vec<Location>) {
        let mut authorities = authorities;
        authorities.push(self.self_location.clone());
        for candidate in self.sorted_candidates(&authorities) {
            match RpcClient::add(&candidate, new_loc.clone(), authorities.clone()).await {
                Ok(()) => break,
                Err(Error::NodeNotFound(dead)) => {
                    self.cascade_remove(dead).await;
                }
                Err(err) => {
                    tracing::debug!(%candidate, ?err, "add forwarding stopped on protocol error");
                    break;
                }
            }
        }
        self.ring.add(new_loc.canonical(), 1);
    }

    /// Gossip `remove` handler (spec.md §4.3). Removes locally first, since
    /// a peer that cannot be reached is dead whether or not the forwarding
    /// chain below ever completes.
    pub fn remove<'a>(
        &'a self,
        dead_loc: Location,
        authorities: Vec<Location>,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            self.ring.remove(&dead_loc.canonical());
            let mut authorities = authorities;
            authorities.push(self.self_location.clone());
            for candidate in self.sorted_candidates(&authorities) {
                match RpcClient::remove(&candidate, dead_loc.clone(), authorities.clone()).await {
                    Ok(()) => break,
                    Err(Error::NodeNotFound(dead)) => {
                        self.cascade_remove(dead).await;
                    }
                    Err(err) => {
                        tracing::debug!(%candidate, ?err, "remove forwarding stopped on protocol error");
                        break;
                    }
                }
            }
        })
    }

    /// Candidate set for gossip forwarding: every node currently on the
    /// ring, minus whoever is already in the authority list, sorted
    /// ascending by canonical location string so every receiver computes the
    /// same order independently.
    fn sorted_candidates(&self, authorities: &[Location]) -> Vec<Location> {
        let excluded: HashSet<String> = authorities.iter().map(Location::canonical).collect();
        let mut candidates: Vec<String> =
            self.ring.nodes().into_iter().filter(|node| !excluded.contains(node)).collect();
        candidates.sort();
        candidates
            .into_iter()
            .filter_map(|node| node.parse().ok())
            .collect()
    }

    /// A hop in the forwarding chain (or a store-layer request forward, see
    /// `store::StoreNode`) came back `NodeNotFound`: locally invoke `remove`
    /// for that peer with every node currently on the ring as the authority
    /// list, so the cascade cannot loop back through whoever is already
    /// propagating it.
    pub async fn report_dead(&self, dead: Location) {
        let saturated: Vec<Location> =
            self.ring.nodes().into_iter().filter_map(|node| node.parse().ok()).collect();
        self.remove(dead, saturated).await;
    }

    async fn cascade_remove(&self, dead: Location) {
        self.report_dead(dead).await;
    }
}

/// Exponential back-off liveness check used by the join handshake (spec.md
/// §4.4 step 2): starts at 10ms, doubles each attempt, gives up after 10
/// tries. A timeout here does not unwind the gossip chain that already ran —
/// the caller treats it as "N may still be starting up" rather than aborting.
pub async fn ping_until_return(location: &Location) -> Result<()> {
    let mut delay = Duration::from_millis(10);
    let mut last_err = Error::NodeNotFound(location.clone());
    for _ in 0..10 {
        match RpcClient::ping(location).await {
            Ok(()) => return Ok(()),
            Err(err) => {
                last_err = err;
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
        }
    }
    Err(last_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bootstrap_with_no_peer_admits_only_self() {
        let engine = MembershipEngine::new(Location::new("127.0.0.1", 9900));
        engine.bootstrap_join(None).await;
        assert_eq!(engine.ring().nodes(), HashSet::from(["127.0.0.1:9900".to_string()]));
    }

    #[tokio::test]
    async fn remove_of_unknown_peer_is_a_silent_no_op() {
        let engine = MembershipEngine::new(Location::new("127.0.0.1", 9900));
        engine.ring().add("127.0.0.1:9900", 1);
        engine.remove(Location::new("127.0.0.1", 9999), vec![]).await;
        assert_eq!(engine.ring().nodes(), HashSet::from(["127.0.0.1:9900".to_string()]));
    }

    #[tokio::test]
    async fn add_forwards_to_nobody_when_ring_is_otherwise_empty() {
        let engine = MembershipEngine::new(Location::new("127.0.0.1", 9900));
        engine.add(Location::new("127.0.0.1", 9901), vec![]).await;
        assert!(engine.ring().contains("127.0.0.1:9901"));
    }

    #[tokio::test]
    async fn ping_until_return_gives_up_after_ten_attempts_against_a_dead_peer() {
        let dead = Location::new("127.0.0.1", 1);
        let result = ping_until_return(&dead).await;
        assert!(result.is_err());
    }
}
