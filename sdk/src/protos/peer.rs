//! Endorser-side messages: chaincode specs, proposals, proposal responses
//! and the transaction structure they are folded into.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::codec::impl_message;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// The creator identity embedded in every signature header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedIdentity {
    pub msp_id: String,
    /// Enrollment certificate bytes.
    pub id_bytes: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Chaincode
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChaincodeType {
    Undefined,
    #[default]
    Golang,
    Node,
    Car,
    Java,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaincodeId {
    pub path: String,
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaincodeInput {
    pub args: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaincodeSpec {
    pub chaincode_type: ChaincodeType,
    pub chaincode_id: ChaincodeId,
    pub input: ChaincodeInput,
    pub timeout: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaincodeInvocationSpec {
    pub chaincode_spec: ChaincodeSpec,
    pub id_generation_alg: String,
}

/// Stored in `ChainHeader::extension` of endorser transactions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaincodeHeaderExtension {
    /// `None` means the full proposal payload (minus transient data) is
    /// committed to the ledger.
    pub payload_visibility: Option<Vec<u8>>,
    pub chaincode_id: ChaincodeId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaincodeProposalPayload {
    /// Serialized `ChaincodeInvocationSpec`.
    pub input: Vec<u8>,
    /// Data that reaches the endorsers but never the ledger.
    pub transient_map: BTreeMap<String, Vec<u8>>,
}

/// Chaincode-emitted event, carried inside `ChaincodeAction::events`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaincodeEvent {
    pub chaincode_id: String,
    pub tx_id: String,
    pub event_name: String,
    pub payload: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Proposal
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    /// Serialized common `Header`.
    pub header: Vec<u8>,
    /// Serialized `ChaincodeProposalPayload`.
    pub payload: Vec<u8>,
    pub extension: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedProposal {
    pub proposal_bytes: Vec<u8>,
    pub signature: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Proposal Response
// ---------------------------------------------------------------------------

/// Application-level outcome of a chaincode call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: i32,
    pub message: String,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endorsement {
    /// Serialized identity of the endorsing peer.
    pub endorser: Vec<u8>,
    pub signature: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalResponse {
    pub version: i32,
    pub timestamp: super::Timestamp,
    pub response: Response,
    /// Serialized `ProposalResponsePayload`; what the endorser signed.
    pub payload: Vec<u8>,
    pub endorsement: Option<Endorsement>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalResponsePayload {
    pub proposal_hash: Vec<u8>,
    /// Serialized `ChaincodeAction`.
    pub extension: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaincodeAction {
    pub results: Vec<u8>,
    /// Serialized `ChaincodeEvent`, empty when none was emitted.
    pub events: Vec<u8>,
    pub response: Response,
}

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaincodeEndorsedAction {
    pub proposal_response_payload: Vec<u8>,
    pub endorsements: Vec<Endorsement>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaincodeActionPayload {
    pub chaincode_proposal_payload: Vec<u8>,
    pub action: ChaincodeEndorsedAction,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionAction {
    /// Serialized `SignatureHeader` of the proposal.
    pub header: Vec<u8>,
    /// Serialized `ChaincodeActionPayload`.
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub actions: Vec<TransactionAction>,
}

impl_message!(
    SerializedIdentity,
    ChaincodeId,
    ChaincodeInvocationSpec,
    ChaincodeHeaderExtension,
    ChaincodeProposalPayload,
    ChaincodeEvent,
    Proposal,
    SignedProposal,
    ProposalResponse,
    ProposalResponsePayload,
    ChaincodeAction,
    ChaincodeActionPayload,
    TransactionAction,
    Transaction,
);
