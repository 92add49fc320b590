//! # Transports
//!
//! The traits the submission pipeline talks to, and the framed-TCP
//! implementations that the CLI wires up. The pipeline itself only sees
//! `Arc<dyn Endorser>` and `Arc<dyn Orderer>`, so tests and embedders swap in
//! their own transports without touching it.

pub mod endorser;
pub mod orderer;
pub mod tcp;

use std::time::Duration;

use thiserror::Error;

use crate::protos::CodecError;

pub use endorser::{Endorser, Peer};
pub use orderer::{BroadcastStream, Orderer, OrdererClient};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("call timed out after {0:?}")]
    Timeout(Duration),

    #[error("frame of {0} bytes exceeds the frame limit")]
    FrameTooLarge(usize),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("connection closed before a response arrived")]
    Closed,

    /// The remote side reported a failure of its own.
    #[error("remote error: {0}")]
    Remote(String),
}
