//! Node identity (spec.md §3 "Location") and its canonical wire form.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A peer's address on the ring. This is the sole identity of a node —
/// there is no separate node id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    pub address: String,
    pub port: u16,
}

impl Location {
    /// The sentinel returned by `get_node` when the ring is empty.
    pub fn empty() -> Self {
        Location { address: String::new(), port: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.address.is_empty() && self.port == 0
    }

    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Location { address: address.into(), port }
    }

    /// Canonical `address:port` string, used as the ring's node key.
    pub fn canonical(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid location string: {0}")]
pub struct ParseLocationError(String);

impl FromStr for Location {
    type Err = ParseLocationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (address, port) = s
            .rsplit_once(':')
            .ok_or_else(|| ParseLocationError(s.to_string()))?;
        let port: u16 = port
            .parse()
            .map_err(|_| ParseLocationError(s.to_string()))?;
        Ok(Location { address: address.to_string(), port })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_canonical_string() {
        for port in [0u16, 1, 9900, 65535] {
            let loc = Location::new("127.0.0.1", port);
            let parsed: Location = loc.to_string().parse().unwrap();
            assert_eq!(loc, parsed);
        }
    }

    #[test]
    fn empty_sentinel_has_no_address_and_port_zero() {
        let empty = Location::empty();
        assert!(empty.is_empty());
        assert_eq!(empty.to_string(), ":0");
    }

    #[test]
    fn rejects_missing_port() {
        assert!("localhost".parse::<Location>().is_err());
    }
}
