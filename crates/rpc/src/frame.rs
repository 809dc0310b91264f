//! The wire framing: a 4-byte little-endian length prefix followed by a
//! `bincode`-encoded payload. Functionally this is the same shape as
//! Thrift's buffered framed transport, just specified directly instead of
//! generated from an IDL file.

use bytes::BytesMut;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Frames larger than this are refused rather than trusted blindly off the
/// wire; nothing in this protocol legitimately needs more.
const MAX_FRAME_LEN: u32 = 16 * 1024 * 1024;

#[derive(Debug)]
pub enum FrameError {
    /// Connect/send/recv/close-level failure — the caller should treat the
    /// peer as unreachable.
    Io(std::io::Error),
    /// The bytes were read (or written) fine, but did not decode as the
    /// expected type — a protocol-level anomaly, not a connectivity one.
    Codec(bincode::Error),
}

impl From<std::io::Error> for FrameError {
    fn from(e: std::io::Error) -> Self {
        FrameError::Io(e)
    }
}

impl From<bincode::Error> for FrameError {
    fn from(e: bincode::Error) -> Self {
        FrameError::Codec(e)
    }
}

pub async fn write_frame<W, T>(writer: &mut W, value: &T) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let bytes = bincode::serialize(value)?;
    writer.write_u32_le(bytes.len() as u32).await?;
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn read_frame<R, T>(reader: &mut R) -> Result<T, FrameError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let len = reader.read_u32_le().await?;
    if len > MAX_FRAME_LEN {
        return Err(FrameError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "frame exceeds maximum length",
        )));
    }
    let mut buf = BytesMut::zeroed(len as usize);
    reader.read_exact(&mut buf).await?;
    Ok(bincode::deserialize(&buf)?)
}
