//! Event stream messages exchanged with a peer's event endpoint.

use serde::{Deserialize, Serialize};

use super::codec::impl_message;
use super::{Block, ChaincodeEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    Block,
    Rejection,
    Chaincode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaincodeInterest {
    pub chaincode_id: String,
    pub event_name: String,
}

/// One kind of event the client wants delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interest {
    pub event_type: EventType,
    pub chaincode: Option<ChaincodeInterest>,
}

impl Interest {
    pub fn of(event_type: EventType) -> Self {
        Self {
            event_type,
            chaincode: None,
        }
    }
}

/// A transaction the network refused before it reached a block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    /// Id of the rejected transaction; empty when the source did not say.
    pub tx_id: String,
    pub error_msg: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// Sent once by the client to open the subscription.
    Register(Vec<Interest>),
    Block(Block),
    Rejection(Rejection),
    Chaincode(ChaincodeEvent),
}

impl_message!(Event);
