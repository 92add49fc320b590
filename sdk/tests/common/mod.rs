//! In-memory network used by the integration tests.
//!
//! Endorsers answer with a `ProposalResponsePayload` bound to the proposal
//! bytes they received. Orderers cut one block per accepted envelope and
//! publish it on the shared event channel, where an [`EventHub`] can pick
//! it up through [`ChannelEventSource`].

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tokio::sync::mpsc;

use ledger_sdk::crypto::PrivateKey;
use ledger_sdk::events::{EventSource, EventStream};
use ledger_sdk::protos::{
    Block, BlockData, BlockHeader, BroadcastResponse, Endorsement, Envelope, Event, Interest,
    Message, ProposalResponse, ProposalResponsePayload, Response, SignedProposal, Status,
};
use ledger_sdk::transport::{BroadcastStream, Endorser, Orderer, TransportError};

// ---------------------------------------------------------------------------
// Endorsers
// ---------------------------------------------------------------------------

pub struct MemoryEndorser {
    url: String,
    key: PrivateKey,
    status: i32,
    /// Distinguishes simulation results between endorsers.
    result_tag: Vec<u8>,
    seen: Mutex<Vec<SignedProposal>>,
}

impl MemoryEndorser {
    pub fn new(url: &str) -> Arc<Self> {
        Self::with_result(url, b"rwset-v1")
    }

    pub fn with_result(url: &str, result_tag: &[u8]) -> Arc<Self> {
        Arc::new(Self {
            url: url.to_string(),
            key: PrivateKey::generate(),
            status: 200,
            result_tag: result_tag.to_vec(),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(url: &str, status: i32) -> Arc<Self> {
        Arc::new(Self {
            url: url.to_string(),
            key: PrivateKey::generate(),
            status,
            result_tag: Vec::new(),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn seen(&self) -> Vec<SignedProposal> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl Endorser for MemoryEndorser {
    fn url(&self) -> &str {
        &self.url
    }

    async fn process_proposal(
        &self,
        signed: &SignedProposal,
    ) -> Result<ProposalResponse, TransportError> {
        self.seen.lock().push(signed.clone());
        if self.status != 200 {
            return Ok(ProposalResponse {
                response: Response {
                    status: self.status,
                    message: "chaincode error".into(),
                    payload: Vec::new(),
                },
                ..Default::default()
            });
        }

        let payload = ProposalResponsePayload {
            proposal_hash: Sha256::digest(&signed.proposal_bytes).to_vec(),
            extension: self.result_tag.clone(),
        }
        .to_bytes()?;
        let signature = self.key.sign(&Sha256::digest(&payload));
        Ok(ProposalResponse {
            response: Response {
                status: 200,
                message: "OK".into(),
                payload: Vec::new(),
            },
            payload,
            endorsement: Some(Endorsement {
                endorser: self.key.public_key().as_bytes().to_vec(),
                signature,
            }),
            ..Default::default()
        })
    }
}

// ---------------------------------------------------------------------------
// Orderers
// ---------------------------------------------------------------------------

/// Orders envelopes into blocks and publishes them as events.
pub struct MemoryOrderer {
    url: String,
    status: Status,
    events: mpsc::UnboundedSender<Event>,
    height: Arc<Mutex<u64>>,
}

impl MemoryOrderer {
    pub fn new(url: &str, events: mpsc::UnboundedSender<Event>) -> Arc<Self> {
        Arc::new(Self {
            url: url.to_string(),
            status: Status::Success,
            events,
            height: Arc::new(Mutex::new(0)),
        })
    }

    /// Acknowledges every envelope with `status` and publishes nothing.
    pub fn rejecting(url: &str, status: Status) -> Arc<Self> {
        let (events, _) = mpsc::unbounded_channel();
        Arc::new(Self {
            url: url.to_string(),
            status,
            events,
            height: Arc::new(Mutex::new(0)),
        })
    }
}

#[async_trait]
impl Orderer for MemoryOrderer {
    fn url(&self) -> &str {
        &self.url
    }

    async fn open_broadcast(&self) -> Result<Box<dyn BroadcastStream>, TransportError> {
        Ok(Box::new(MemoryBroadcast {
            status: self.status,
            events: self.events.clone(),
            height: Arc::clone(&self.height),
            acks: Vec::new(),
        }))
    }
}

struct MemoryBroadcast {
    status: Status,
    events: mpsc::UnboundedSender<Event>,
    height: Arc<Mutex<u64>>,
    acks: Vec<BroadcastResponse>,
}

#[async_trait]
impl BroadcastStream for MemoryBroadcast {
    async fn send(&mut self, envelope: &Envelope) -> Result<(), TransportError> {
        if self.status == Status::Success {
            let number = {
                let mut height = self.height.lock();
                *height += 1;
                *height
            };
            let block = Block {
                header: BlockHeader {
                    number,
                    ..Default::default()
                },
                data: BlockData {
                    data: vec![envelope.to_bytes()?],
                },
                ..Default::default()
            };
            // Nobody listening is fine.
            let _ = self.events.send(Event::Block(block));
        }
        self.acks.push(BroadcastResponse {
            status: self.status,
        });
        Ok(())
    }

    async fn close_send(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<BroadcastResponse>, TransportError> {
        Ok(self.acks.pop())
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Event source handing out one pre-made channel.
pub struct ChannelEventSource {
    rx: Mutex<Option<mpsc::UnboundedReceiver<Event>>>,
}

impl ChannelEventSource {
    pub fn new(rx: mpsc::UnboundedReceiver<Event>) -> Arc<Self> {
        Arc::new(Self {
            rx: Mutex::new(Some(rx)),
        })
    }
}

struct ChannelEventStream {
    rx: mpsc::UnboundedReceiver<Event>,
}

#[async_trait]
impl EventStream for ChannelEventStream {
    async fn recv(&mut self) -> Result<Option<Event>, TransportError> {
        Ok(self.rx.recv().await)
    }
}

#[async_trait]
impl EventSource for ChannelEventSource {
    async fn connect(
        &self,
        _interests: Vec<Interest>,
    ) -> Result<Box<dyn EventStream>, TransportError> {
        let rx = self.rx.lock().take().ok_or(TransportError::Closed)?;
        Ok(Box::new(ChannelEventStream { rx }))
    }
}

pub fn strings(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}
