use async_trait::async_trait;
use dashmap::DashMap;

use corelib::{Error, Location, Result};
use membership::{ping_until_return, MembershipEngine};
use rpc::{RpcClient, Service, SERVICE_TYPE};

/// Where a key's request should be served from.
enum Owner {
    Local,
    Remote(Location),
    /// The ring has no members at all.
    None,
}

/// One peer: the gossip membership engine plus the slice of the keyspace it
/// currently owns.
pub struct StoreNode {
    membership: MembershipEngine,
    table: DashMap<String, String>,
}

impl StoreNode {
    pub fn new(self_location: Location) -> Self {
        StoreNode { membership: MembershipEngine::new(self_location), table: DashMap::new() }
    }

    pub fn self_location(&self) -> &Location {
        self.membership.self_location()
    }

    pub fn membership(&self) -> &MembershipEngine {
        &self.membership
    }

    /// Lifecycle entry point (spec.md §4.4 step 1, new node's side): insert
    /// self into the ring, pull the roster from `peer` if one was given,
    /// then announce arrival.
    pub async fn local_join(&self, peer: Option<Location>) {
        self.membership.bootstrap_join(peer).await;
    }

    /// Graceful departure (spec.md §4.6): remove self from the ring, then
    /// hand each locally-held key to its new owner, sending that owner the
    /// departure notice (`remove`) at most once, the first time we reach it.
    /// If nothing got handed off — an empty table, or every owner turning
    /// out to be unreachable — falls back to notifying one remaining peer
    /// directly so the rest of the cluster still learns this node is gone.
    pub async fn cleanup(&self) {
        self.membership.ring().remove(&self.self_location().canonical());

        if self.membership.ring().nodes().is_empty() {
            return;
        }

        let mut informed: std::collections::HashSet<String> = std::collections::HashSet::new();
        let keys: Vec<String> = self.table.iter().map(|entry| entry.key().clone()).collect();
        for key in keys {
            let Some(value) = self.table.get(&key).map(|v| v.clone()) else { continue };
            let Some(owner) = self.membership.ring().lookup(&key) else { continue };
            let Ok(location) = owner.parse::<Location>() else { continue };

            if !informed.contains(&owner) {
                let self_loc = self.self_location().clone();
                if RpcClient::remove(&location, self_loc.clone(), vec![self_loc]).await.is_err() {
                    tracing::debug!(%location, "departure notice failed, destination unreachable");
                    continue;
                }
            }
            if RpcClient::ping(&location).await.is_err() {
                tracing::debug!(%location, "hand-off ping failed, destination unreachable");
                continue;
            }
            informed.insert(owner);
            if let Err(err) = RpcClient::put(&location, key, value).await {
                tracing::debug!(%location, ?err, "hand-off put failed");
            }
        }

        if informed.is_empty() {
            let mut remaining: Vec<String> = self.membership.ring().nodes().into_iter().collect();
            remaining.sort();
            for node in remaining {
                let Ok(location) = node.parse::<Location>() else { continue };
                let self_loc = self.self_location().clone();
                match RpcClient::remove(&location, self_loc.clone(), vec![self_loc]).await {
                    Ok(()) => break,
                    Err(Error::NodeNotFound(dead)) => {
                        self.membership.ring().remove(&dead.canonical());
                    }
                    Err(_) => break,
                }
            }
        }
    }

    fn route(&self, key: &str) -> Owner {
        match self.membership.ring().lookup(key) {
            None => Owner::None,
            Some(owner) if owner == self.self_location().canonical() => Owner::Local,
            Some(owner) => match owner.parse() {
                Ok(location) => Owner::Remote(location),
                Err(_) => Owner::None,
            },
        }
    }

    /// The tail of the join handler (spec.md §4.4 steps 2-3), run by the
    /// peer a new node `N` announced itself to: wait for `N` to come up,
    /// then drain every key this node holds whose owner is now `N`.
    async fn hand_off_to(&self, new_node: &Location) {
        if ping_until_return(new_node).await.is_err() {
            tracing::debug!(%new_node, "join ping never returned; handing off anyway");
        }
        let new_owner = new_node.canonical();
        let keys: Vec<String> = self.table.iter().map(|entry| entry.key().clone()).collect();
        for key in keys {
            if self.membership.ring().lookup(&key).as_deref() != Some(new_owner.as_str()) {
                continue;
            }
            let Some((_, value)) = self.table.remove(&key) else { continue };
            if let Err(err) = RpcClient::put(new_node, key.clone(), value.clone()).await {
                tracing::debug!(%new_node, %key, ?err, "hand-off put failed, re-keeping locally");
                self.table.insert(key, value);
            }
        }
    }
}

#[async_trait]
impl Service for StoreNode {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn service_type(&self) -> Result<String> {
        Ok(SERVICE_TYPE.to_string())
    }

    /// Join handler (spec.md §4.4 steps 1-3), run on the peer a new node
    /// contacted directly.
    async fn join(&self, location: Location) -> Result<()> {
        self.membership.add(location.clone(), vec![self.self_location().clone()]).await;
        self.hand_off_to(&location).await;
        Ok(())
    }

    async fn add(&self, location: Location, authorities: Vec<Location>) -> Result<()> {
        self.membership.add(location, authorities).await;
        Ok(())
    }

    async fn remove(&self, location: Location, authorities: Vec<Location>) -> Result<()> {
        self.membership.remove(location, authorities).await;
        Ok(())
    }

    async fn get_all(&self) -> Result<Vec<Location>> {
        Ok(self.membership.ring().nodes().into_iter().filter_map(|node| node.parse().ok()).collect())
    }

    async fn get_node(&self, key: String) -> Result<Location> {
        match self.membership.ring().lookup(&key) {
            Some(owner) => owner
                .parse()
                .map_err(|_| Error::Internal(format!("ring produced an unparsable node key: {owner}"))),
            None => Ok(Location::empty()),
        }
    }

    async fn debug(&self) -> Result<()> {
        tracing::debug!(
            self_location = %self.self_location(),
            nodes = ?self.membership.ring().nodes(),
            local_keys = self.table.len(),
            "store node debug dump"
        );
        Ok(())
    }

    async fn get(&self, key: String) -> Result<String> {
        match self.route(&key) {
            Owner::Local => Ok(self.table.get(&key).map(|value| value.clone()).unwrap_or_default()),
            Owner::None => Ok(String::new()),
            Owner::Remote(location) => match RpcClient::get(&location, key).await {
                Ok(value) => Ok(value),
                Err(Error::NodeNotFound(dead)) => {
                    self.membership.report_dead(dead).await;
                    Ok(String::new())
                }
                Err(err) => Err(err),
            },
        }
    }

    async fn put(&self, key: String, value: String) -> Result<()> {
        match self.route(&key) {
            Owner::Local => {
                self.table.insert(key, value);
                Ok(())
            }
            Owner::None => Ok(()),
            Owner::Remote(location) => match RpcClient::put(&location, key, value).await {
                Ok(()) => Ok(()),
                Err(Error::NodeNotFound(dead)) => {
                    self.membership.report_dead(dead).await;
                    Ok(())
                }
                Err(err) => Err(err),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn single_node_serves_every_key_locally() {
        let node = StoreNode::new(Location::new("127.0.0.1", 9900));
        node.local_join(None).await;

        node.put("a".into(), "1".into()).await.unwrap();
        assert_eq!(node.get("a".into()).await.unwrap(), "1");
        assert_eq!(node.get("missing".into()).await.unwrap(), "");
    }

    #[tokio::test]
    async fn get_node_returns_empty_sentinel_before_any_join() {
        let node = StoreNode::new(Location::new("127.0.0.1", 9900));
        assert_eq!(node.get_node("a".into()).await.unwrap(), Location::empty());
    }

    #[tokio::test]
    async fn cleanup_on_a_lone_node_is_a_silent_no_op() {
        let node = StoreNode::new(Location::new("127.0.0.1", 9900));
        node.local_join(None).await;
        node.put("a".into(), "1".into()).await.unwrap();
        node.cleanup().await;
        assert!(node.membership().ring().nodes().is_empty());
    }
}
