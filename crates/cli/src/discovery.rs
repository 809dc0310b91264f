//! Sequential localhost probing, grounded in `location.py`'s free functions
//! (`find_matching_service`, `ping_until_found`, `ping_until_not_found`):
//! used by the node binary to pick a free port and an initial peer when
//! neither is given on the command line.

use corelib::{Error, Location, Result};
use rpc::{RpcClient, SERVICE_TYPE};

/// Walks ports upward from `start`, returning the first one that does not
/// answer `ping` — i.e. the first free port for this node to bind to.
pub async fn ping_until_not_found(start: &Location, maximum: u16) -> Result<Location> {
    let mut candidate = start.clone();
    for _ in 0..maximum {
        if RpcClient::ping(&candidate).await.is_err() {
            return Ok(candidate);
        }
        candidate.port += 1;
    }
    Err(Error::NodeNotFound(candidate))
}

/// Walks ports upward from `start`, returning the first one that does
/// answer `ping`. Kept alongside `ping_until_not_found` for symmetry with
/// the original module and for any future thin client binary, though the
/// node binary itself only uses the two functions below.
#[allow(dead_code)]
pub async fn ping_until_found(start: &Location, maximum: u16) -> Result<Location> {
    let mut candidate = start.clone();
    for _ in 0..maximum {
        if RpcClient::ping(&candidate).await.is_ok() {
            return Ok(candidate);
        }
        candidate.port += 1;
    }
    Err(Error::NodeNotFound(candidate))
}

/// Walks ports upward from `start`, returning the first one whose
/// `service_type()` matches `service`. Used to auto-discover an initial
/// peer when none was given explicitly.
pub async fn find_matching_service(start: &Location, service: &str, maximum: u16) -> Option<Location> {
    let mut candidate = start.clone();
    for _ in 0..maximum {
        if let Ok(kind) = RpcClient::service_type(&candidate).await {
            if kind == service {
                return Some(candidate);
            }
        }
        candidate.port += 1;
    }
    tracing::debug!(%start, service, "no peer autodiscovered");
    None
}

/// Default starting point and cap for port auto-probing, matching
/// `storeserver.py`'s own `__main__` call site.
pub const PORT_PROBE_MAX: u16 = 25;

/// Default cap for peer auto-discovery, matching `location.py`'s default
/// (the store binary calls `find_matching_service` with no override).
pub const PEER_PROBE_MAX: u16 = 10;

/// The default port a node binds to absent any discovery.
pub const DEFAULT_PORT: u16 = 9900;

/// The leaf service name every node answers on `service_type()`.
pub const DEFAULT_SERVICE: &str = SERVICE_TYPE;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ping_until_not_found_returns_the_starting_port_when_nothing_is_listening() {
        let start = Location::new("127.0.0.1", 9900);
        let found = ping_until_not_found(&start, 1).await.unwrap();
        assert_eq!(found, start);
    }

    #[tokio::test]
    async fn find_matching_service_gives_up_after_the_cap_when_nothing_answers() {
        let start = Location::new("127.0.0.1", 9900);
        assert!(find_matching_service(&start, DEFAULT_SERVICE, 1).await.is_none());
    }
}
