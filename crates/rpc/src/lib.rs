//! Framed binary RPC transport (spec.md §4.2, §6): the typed IDL surface,
//! the wire codec, and one-shot client/server implementations.

mod client;
mod frame;
mod protocol;
mod server;

pub use client::RpcClient;
pub use frame::{read_frame, write_frame, FrameError};
pub use protocol::{Request, Response, Service, SERVICE_TYPE};
pub use server::RpcServer;
