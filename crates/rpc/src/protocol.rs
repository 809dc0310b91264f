//! The typed IDL (spec.md §6): one `Request`/`Response` variant per
//! operation, and the `Service` trait both the server dispatcher and every
//! handler implement. `Base -> Locator -> Store` is modeled as a single
//! flat capability trait (Design Notes §9) rather than literal interface
//! inheritance — a `StoreNode` simply implements every method.

use async_trait::async_trait;
use corelib::{Location, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Request {
    Ping,
    ServiceType,
    Join(Location),
    Add(Location, Vec<Location>),
    Remove(Location, Vec<Location>),
    GetAll,
    GetNode(String),
    Debug,
    Get(String),
    Put(String, String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Response {
    Pong,
    ServiceType(String),
    Unit,
    GetAll(Vec<Location>),
    GetNode(Location),
    Value(String),
    /// Reserved for protocol-level anomalies (spec.md §7 `ProtocolError`).
    /// Ordinary "not found"/"unreachable" outcomes never produce this —
    /// they are swallowed server-side per the no-exceptions-across-the-
    /// RPC-boundary policy and surface as `Unit`/an empty `Value` instead.
    Error(String),
}

/// The leaf service name returned by `service_type()` (spec.md §6).
pub const SERVICE_TYPE: &str = "diststore.Store";

#[async_trait]
pub trait Service: Send + Sync {
    async fn ping(&self) -> Result<()>;
    async fn service_type(&self) -> Result<String>;
    async fn join(&self, location: Location) -> Result<()>;
    async fn add(&self, location: Location, authorities: Vec<Location>) -> Result<()>;
    async fn remove(&self, location: Location, authorities: Vec<Location>) -> Result<()>;
    async fn get_all(&self) -> Result<Vec<Location>>;
    async fn get_node(&self, key: String) -> Result<Location>;
    async fn debug(&self) -> Result<()>;
    async fn get(&self, key: String) -> Result<String>;
    async fn put(&self, key: String, value: String) -> Result<()>;
}
