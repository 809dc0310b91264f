//! One-shot RPC client: connect, call, close. Every connection-level
//! failure (connect refused, timeout, mid-call disconnect) is normalized to
//! `Error::NodeNotFound`; a successfully-read but malformed response
//! bubbles up as `Error::ProtocolError` instead, since that is the remote's
//! fault, not a reachability problem (spec.md §4.2, §7).

use corelib::{Error, Location, Result};
use tokio::net::TcpStream;

use crate::frame::{read_frame, write_frame, FrameError};
use crate::protocol::{Request, Response};

pub struct RpcClient;

impl RpcClient {
    /// Performs one request/response round trip against `location`.
    pub async fn call(location: &Location, request: Request) -> Result<Response> {
        let mut stream = TcpStream::connect((location.address.as_str(), location.port))
            .await
            .map_err(|_| Error::NodeNotFound(location.clone()))?;

        write_frame(&mut stream, &request)
            .await
            .map_err(|e| to_error(location, e))?;

        read_frame(&mut stream).await.map_err(|e| to_error(location, e))
        // `stream` is dropped here, closing the connection.
    }

    pub async fn ping(location: &Location) -> Result<()> {
        match Self::call(location, Request::Ping).await? {
            Response::Pong => Ok(()),
            other => Err(unexpected(location, "ping", other)),
        }
    }

    pub async fn service_type(location: &Location) -> Result<String> {
        match Self::call(location, Request::ServiceType).await? {
            Response::ServiceType(name) => Ok(name),
            Response::Error(msg) => Err(Error::ProtocolError(msg)),
            other => Err(unexpected(location, "service_type", other)),
        }
    }

    pub async fn join(location: &Location, new_location: Location) -> Result<()> {
        match Self::call(location, Request::Join(new_location)).await? {
            Response::Unit => Ok(()),
            other => Err(unexpected(location, "join", other)),
        }
    }

    pub async fn add(
        location: &Location,
        new_location: Location,
        authorities: Vec<Location>,
    ) -> Result<()> {
        match Self::call(location, Request::Add(new_location, authorities)).await? {
            Response::Unit => Ok(()),
            other => Err(unexpected(location, "add", other)),
        }
    }

    pub async fn remove(
        location: &Location,
        dead_location: Location,
        authorities: Vec<Location>,
    ) -> Result<()> {
        match Self::call(location, Request::Remove(dead_location, authorities)).await? {
            Response::Unit => Ok(()),
            other => Err(unexpected(location, "remove", other)),
        }
    }

    pub async fn get_all(location: &Location) -> Result<Vec<Location>> {
        match Self::call(location, Request::GetAll).await? {
            Response::GetAll(locations) => Ok(locations),
            Response::Error(msg) => Err(Error::ProtocolError(msg)),
            other => Err(unexpected(location, "get_all", other)),
        }
    }

    pub async fn get_node(location: &Location, key: String) -> Result<Location> {
        match Self::call(location, Request::GetNode(key)).await? {
            Response::GetNode(found) => Ok(found),
            Response::Error(msg) => Err(Error::ProtocolError(msg)),
            other => Err(unexpected(location, "get_node", other)),
        }
    }

    pub async fn debug(location: &Location) -> Result<()> {
        match Self::call(location, Request::Debug).await? {
            Response::Unit => Ok(()),
            other => Err(unexpected(location, "debug", other)),
        }
    }

    pub async fn get(location: &Location, key: String) -> Result<String> {
        match Self::call(location, Request::Get(key)).await? {
            Response::Value(value) => Ok(value),
            Response::Error(msg) => Err(Error::ProtocolError(msg)),
            other => Err(unexpected(location, "get", other)),
        }
    }

    pub async fn put(location: &Location, key: String, value: String) -> Result<()> {
        match Self::call(location, Request::Put(key, value)).await? {
            Response::Unit => Ok(()),
            other => Err(unexpected(location, "put", other)),
        }
    }
}

fn to_error(location: &Location, err: FrameError) -> Error {
    match err {
        FrameError::Io(_) => Error::NodeNotFound(location.clone()),
        FrameError::Codec(e) => Error::ProtocolError(e.to_string()),
    }
}

fn unexpected(location: &Location, op: &str, response: Response) -> Error {
    Error::ProtocolError(format!(
        "unexpected response to {op} from {location}: {response:?}"
    ))
}
