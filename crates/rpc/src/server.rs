//! The RPC endpoint: accepts one connection, reads one framed request,
//! dispatches, writes one framed response, closes.

use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};

use crate::frame::{read_frame, write_frame, FrameError};
use crate::protocol::{Request, Response, Service};

pub struct RpcServer {
    listener: TcpListener,
}

impl RpcServer {
    pub async fn bind(address: &str, port: u16) -> std::io::Result<Self> {
        let listener = TcpListener::bind((address, port)).await?;
        Ok(RpcServer { listener })
    }

    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs the accept loop until cancelled. Each connection is handled on
    /// its own task; the handler for a connection still serves exactly one
    /// request before closing, matching the "one-shot connect/call/close"
    /// client contract on the other side.
    pub async fn serve(self, service: Arc<dyn Service>) -> std::io::Result<()> {
        loop {
            let (stream, peer) = self.listener.accept().await?;
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                if let Err(err) = handle_connection(stream, service).await {
                    tracing::debug!(?peer, ?err, "rpc connection ended without a clean response");
                }
            });
        }
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    service: Arc<dyn Service>,
) -> Result<(), FrameError> {
    let request: Request = read_frame(&mut stream).await?;
    let response = dispatch(&service, request).await;
    write_frame(&mut stream, &response).await
}

/// Converts a handler's `Result` into a wire `Response`.
///
/// Per spec.md §7, no exception crosses the RPC boundary: the void-returning
/// operations (`join`/`add`/`remove`/`put`/`debug`/`ping`) log and swallow
/// any internal error rather than reporting it, deliberately sacrificing a
/// failed write over stalling the cluster. The read-returning operations
/// still carry a `Response::Error` arm for the (never taken, in this
/// implementation) case of a genuine internal fault, since unlike the void
/// ops they have no natural "empty" wire value to fall back to.
async fn dispatch(service: &Arc<dyn Service>, request: Request) -> Response {
    match request {
        Request::Ping => {
            if let Err(err) = service.ping().await {
                tracing::debug!(?err, "ping handler error");
            }
            Response::Pong
        }
        Request::ServiceType => match service.service_type().await {
            Ok(name) => Response::ServiceType(name),
            Err(err) => Response::Error(err.to_string()),
        },
        Request::Join(location) => {
            if let Err(err) = service.join(location).await {
                tracing::debug!(?err, "join handler error");
            }
            Response::Unit
        }
        Request::Add(location, authorities) => {
            if let Err(err) = service.add(location, authorities).await {
                tracing::debug!(?err, "add handler error");
            }
            Response::Unit
        }
        Request::Remove(location, authorities) => {
            if let Err(err) = service.remove(location, authorities).await {
                tracing::debug!(?err, "remove handler error");
            }
            Response::Unit
        }
        Request::GetAll => match service.get_all().await {
            Ok(locations) => Response::GetAll(locations),
            Err(err) => Response::Error(err.to_string()),
        },
        Request::GetNode(key) => match service.get_node(key).await {
            Ok(location) => Response::GetNode(location),
            Err(err) => Response::Error(err.to_string()),
        },
        Request::Debug => {
            if let Err(err) = service.debug().await {
                tracing::debug!(?err, "debug handler error");
            }
            Response::Unit
        }
        Request::Get(key) => match service.get(key).await {
            Ok(value) => Response::Value(value),
            Err(err) => Response::Error(err.to_string()),
        },
        Request::Put(key, value) => {
            if let Err(err) = service.put(key, value).await {
                tracing::debug!(?err, "put handler error");
            }
            Response::Unit
        }
    }
}
