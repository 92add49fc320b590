//! Orderer seam and its TCP client.
//!
//! A broadcast is a small bidirectional stream: the client sends envelopes,
//! half-closes its side, and then reads acknowledgements until the orderer
//! closes the stream.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use super::tcp::{connect, read_frame, with_timeout, write_frame};
use super::TransportError;
use crate::config::{OrdererConfig, TimeoutConfig};
use crate::protos::{BroadcastResponse, Envelope};

/// Client half of an open broadcast stream.
#[async_trait]
pub trait BroadcastStream: Send {
    async fn send(&mut self, envelope: &Envelope) -> Result<(), TransportError>;

    /// Signals that no more envelopes follow.
    async fn close_send(&mut self) -> Result<(), TransportError>;

    /// Next acknowledgement, or `None` once the orderer closed the stream.
    async fn recv(&mut self) -> Result<Option<BroadcastResponse>, TransportError>;
}

#[async_trait]
pub trait Orderer: Send + Sync {
    fn url(&self) -> &str;

    async fn open_broadcast(&self) -> Result<Box<dyn BroadcastStream>, TransportError>;
}

/// Ordering node reached over framed TCP.
#[derive(Debug, Clone)]
pub struct OrdererClient {
    url: String,
    timeout: Duration,
}

impl OrdererClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }

    pub fn from_config(orderer: &OrdererConfig, timeouts: &TimeoutConfig) -> Self {
        Self::new(orderer.address(), timeouts.call())
    }
}

#[async_trait]
impl Orderer for OrdererClient {
    fn url(&self) -> &str {
        &self.url
    }

    async fn open_broadcast(&self) -> Result<Box<dyn BroadcastStream>, TransportError> {
        let stream = with_timeout(self.timeout, connect(&self.url)).await?;
        Ok(Box::new(TcpBroadcastStream {
            stream,
            timeout: self.timeout,
        }))
    }
}

struct TcpBroadcastStream {
    stream: TcpStream,
    timeout: Duration,
}

#[async_trait]
impl BroadcastStream for TcpBroadcastStream {
    async fn send(&mut self, envelope: &Envelope) -> Result<(), TransportError> {
        with_timeout(self.timeout, write_frame(&mut self.stream, envelope)).await
    }

    async fn close_send(&mut self) -> Result<(), TransportError> {
        // Shuts down the write half only; acks still arrive on the read half.
        self.stream.shutdown().await?;
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<BroadcastResponse>, TransportError> {
        with_timeout(self.timeout, read_frame(&mut self.stream)).await
    }
}
