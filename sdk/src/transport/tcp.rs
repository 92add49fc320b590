//! # Framed TCP
//!
//! Wire format shared by the endorser, orderer and event transports:
//!
//! ```text
//! +----------------+---------------------------+
//! | length: u32 BE | bincode(message), length B |
//! +----------------+---------------------------+
//! ```
//!
//! A connection closed exactly on a frame boundary is a clean end of stream
//! (`Ok(None)`); closed anywhere else it is an error. Every exchange runs
//! under a caller-supplied deadline so one unresponsive node only costs its
//! own task that much time.

use std::future::Future;
use std::io;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use super::TransportError;
use crate::config::MAX_FRAME_LENGTH;
use crate::protos::Message;

/// Opens a TCP connection to `addr` (`host:port`).
pub async fn connect(addr: &str) -> Result<TcpStream, TransportError> {
    let stream = TcpStream::connect(addr).await?;
    stream.set_nodelay(true)?;
    Ok(stream)
}

/// Runs `fut`, failing with [`TransportError::Timeout`] after `limit`.
pub async fn with_timeout<T, F>(limit: Duration, fut: F) -> Result<T, TransportError>
where
    F: Future<Output = Result<T, TransportError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::Timeout(limit)),
    }
}

/// Writes one length-prefixed frame and flushes.
pub async fn write_frame<W, M>(writer: &mut W, message: &M) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
    M: Message,
{
    let body = message.to_bytes()?;
    if body.len() > MAX_FRAME_LENGTH {
        return Err(TransportError::FrameTooLarge(body.len()));
    }
    writer.write_all(&(body.len() as u32).to_be_bytes()).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one frame. `Ok(None)` when the peer closed between frames.
pub async fn read_frame<R, M>(reader: &mut R) -> Result<Option<M>, TransportError>
where
    R: AsyncRead + Unpin,
    M: Message,
{
    let mut len_buf = [0u8; 4];
    let mut filled = 0;
    while filled < len_buf.len() {
        let n = reader.read(&mut len_buf[filled..]).await?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
        }
        filled += n;
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_LENGTH {
        return Err(TransportError::FrameTooLarge(len));
    }
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(Some(M::from_bytes(&body)?))
}
