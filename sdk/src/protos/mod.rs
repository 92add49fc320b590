//! # Wire Messages
//!
//! The message types exchanged with endorsers, orderers and event sources.
//! Nesting follows the network's layering: a `Proposal` carries serialized
//! headers and payloads, a `Transaction` carries serialized actions, and an
//! `Envelope` carries a serialized `Payload`. Inner messages are kept as
//! bytes so that what was signed is exactly what gets compared and
//! forwarded.
//!
//! ```text
//! Envelope { payload, signature }
//!   └─ Payload { header, data }
//!        └─ Transaction { actions: [TransactionAction { header, payload }] }
//!             └─ ChaincodeActionPayload { chaincode_proposal_payload, action }
//!                  └─ ChaincodeEndorsedAction { proposal_response_payload, endorsements }
//! ```

pub mod codec;
pub mod common;
pub mod events;
pub mod orderer;
pub mod peer;

pub use codec::{CodecError, Message};
pub use common::{
    Block, BlockData, BlockHeader, BlockMetadata, ChainHeader, Envelope, Header, HeaderType,
    Payload, SignatureHeader, Status, Timestamp,
};
pub use events::{ChaincodeInterest, Event, EventType, Interest, Rejection};
pub use orderer::BroadcastResponse;
pub use peer::{
    ChaincodeAction, ChaincodeActionPayload, ChaincodeEndorsedAction, ChaincodeEvent,
    ChaincodeHeaderExtension, ChaincodeId, ChaincodeInput, ChaincodeInvocationSpec,
    ChaincodeProposalPayload, ChaincodeSpec, ChaincodeType, Endorsement, Proposal,
    ProposalResponse, ProposalResponsePayload, Response, SerializedIdentity, SignedProposal,
    Transaction, TransactionAction,
};

/// Transaction id recorded in a serialized envelope's payload header.
pub fn envelope_tx_id(envelope_bytes: &[u8]) -> Result<String, CodecError> {
    let envelope = Envelope::from_bytes(envelope_bytes)?;
    let payload = Payload::from_bytes(&envelope.payload)?;
    Ok(payload.header.chain_header.tx_id)
}

/// Chaincode events emitted by the actions of a serialized envelope.
///
/// Envelopes that are not endorser transactions yield nothing.
pub fn envelope_chaincode_events(envelope_bytes: &[u8]) -> Result<Vec<ChaincodeEvent>, CodecError> {
    let envelope = Envelope::from_bytes(envelope_bytes)?;
    let payload = Payload::from_bytes(&envelope.payload)?;
    if payload.header.chain_header.header_type != HeaderType::EndorserTransaction {
        return Ok(Vec::new());
    }

    let tx = Transaction::from_bytes(&payload.data)?;
    let mut events = Vec::new();
    for action in &tx.actions {
        let action_payload = ChaincodeActionPayload::from_bytes(&action.payload)?;
        let response_payload =
            ProposalResponsePayload::from_bytes(&action_payload.action.proposal_response_payload)?;
        let chaincode_action = ChaincodeAction::from_bytes(&response_payload.extension)?;
        if !chaincode_action.events.is_empty() {
            events.push(ChaincodeEvent::from_bytes(&chaincode_action.events)?);
        }
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope_with_event(tx_id: &str, event: Option<ChaincodeEvent>) -> Vec<u8> {
        let action = ChaincodeAction {
            events: event.map(|e| e.to_bytes().unwrap()).unwrap_or_default(),
            ..Default::default()
        };
        let prp = ProposalResponsePayload {
            proposal_hash: vec![0; 32],
            extension: action.to_bytes().unwrap(),
        };
        let cap = ChaincodeActionPayload {
            chaincode_proposal_payload: vec![],
            action: ChaincodeEndorsedAction {
                proposal_response_payload: prp.to_bytes().unwrap(),
                endorsements: vec![],
            },
        };
        let tx = Transaction {
            actions: vec![TransactionAction {
                header: vec![],
                payload: cap.to_bytes().unwrap(),
            }],
        };
        let payload = Payload {
            header: Header {
                chain_header: ChainHeader {
                    header_type: HeaderType::EndorserTransaction,
                    version: 0,
                    timestamp: Timestamp::default(),
                    chain_id: "testchainid".into(),
                    tx_id: tx_id.into(),
                    epoch: 0,
                    extension: vec![],
                },
                signature_header: SignatureHeader {
                    creator: vec![],
                    nonce: vec![],
                },
            },
            data: tx.to_bytes().unwrap(),
        };
        Envelope {
            payload: payload.to_bytes().unwrap(),
            signature: vec![],
        }
        .to_bytes()
        .unwrap()
    }

    #[test]
    fn tx_id_is_read_from_payload_header() {
        let bytes = envelope_with_event("tx-42", None);
        assert_eq!(envelope_tx_id(&bytes).unwrap(), "tx-42");
    }

    #[test]
    fn chaincode_events_are_unwrapped_from_actions() {
        let event = ChaincodeEvent {
            chaincode_id: "mycc".into(),
            tx_id: "tx-1".into(),
            event_name: "moved".into(),
            payload: b"a->b".to_vec(),
        };
        let bytes = envelope_with_event("tx-1", Some(event.clone()));
        assert_eq!(envelope_chaincode_events(&bytes).unwrap(), vec![event]);

        let quiet = envelope_with_event("tx-2", None);
        assert!(envelope_chaincode_events(&quiet).unwrap().is_empty());
    }

    #[test]
    fn garbage_envelope_is_a_decode_error() {
        assert!(envelope_tx_id(&[1, 2, 3]).is_err());
    }
}
