//! Event source seam and its TCP client.
//!
//! The TCP source sends a single `Event::Register` frame naming the
//! interests, then reads event frames until the peer closes the connection.

use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;

use crate::config::{PeerConfig, TimeoutConfig};
use crate::protos::{Event, Interest};
use crate::transport::tcp::{connect, read_frame, with_timeout, write_frame};
use crate::transport::TransportError;

/// An open event subscription.
#[async_trait]
pub trait EventStream: Send {
    /// Next event, or `None` once the source ended the stream.
    async fn recv(&mut self) -> Result<Option<Event>, TransportError>;
}

/// Something that can open an event subscription.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn connect(
        &self,
        interests: Vec<Interest>,
    ) -> Result<Box<dyn EventStream>, TransportError>;
}

/// Event endpoint of a peer, reached over framed TCP.
#[derive(Debug, Clone)]
pub struct TcpEventSource {
    addr: String,
    timeout: Duration,
}

impl TcpEventSource {
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
        }
    }

    pub fn from_config(peer: &PeerConfig, timeouts: &TimeoutConfig) -> Self {
        Self::new(peer.event_address(), timeouts.event())
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }
}

#[async_trait]
impl EventSource for TcpEventSource {
    async fn connect(
        &self,
        interests: Vec<Interest>,
    ) -> Result<Box<dyn EventStream>, TransportError> {
        let stream = with_timeout(self.timeout, async {
            let mut stream = connect(&self.addr).await?;
            write_frame(&mut stream, &Event::Register(interests)).await?;
            Ok(stream)
        })
        .await?;
        Ok(Box::new(TcpEventStream { stream }))
    }
}

struct TcpEventStream {
    stream: TcpStream,
}

#[async_trait]
impl EventStream for TcpEventStream {
    // No deadline: a quiet chain legitimately produces no blocks for a while.
    async fn recv(&mut self) -> Result<Option<Event>, TransportError> {
        read_frame(&mut self.stream).await
    }
}
