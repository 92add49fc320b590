//! Endorser seam and its TCP client.

use std::time::Duration;

use async_trait::async_trait;

use super::tcp::{connect, read_frame, with_timeout, write_frame};
use super::TransportError;
use crate::config::{PeerConfig, TimeoutConfig};
use crate::protos::{ProposalResponse, SignedProposal};

/// A peer that simulates chaincode and endorses the result.
#[async_trait]
pub trait Endorser: Send + Sync {
    /// Address the endorser identifies itself by. Used as the result-map key.
    fn url(&self) -> &str;

    async fn process_proposal(
        &self,
        signed: &SignedProposal,
    ) -> Result<ProposalResponse, TransportError>;
}

/// Endorsing peer reached over framed TCP: one request frame, one response
/// frame, one connection per call.
#[derive(Debug, Clone)]
pub struct Peer {
    url: String,
    timeout: Duration,
}

impl Peer {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }

    pub fn from_config(peer: &PeerConfig, timeouts: &TimeoutConfig) -> Self {
        Self::new(peer.address(), timeouts.call())
    }
}

#[async_trait]
impl Endorser for Peer {
    fn url(&self) -> &str {
        &self.url
    }

    async fn process_proposal(
        &self,
        signed: &SignedProposal,
    ) -> Result<ProposalResponse, TransportError> {
        with_timeout(self.timeout, async {
            let mut stream = connect(&self.url).await?;
            write_frame(&mut stream, signed).await?;
            read_frame(&mut stream).await?.ok_or(TransportError::Closed)
        })
        .await
    }
}
