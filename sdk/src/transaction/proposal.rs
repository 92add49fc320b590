//! # Proposal Builder
//!
//! Turns a [`TransactionProposalRequest`] into a signed proposal:
//!
//! 1. Validate the request (fixed field order, first missing field wins).
//! 2. Build the invocation spec, function name first.
//! 3. Wrap it in a `Proposal` whose header names the chain, the transaction
//!    id and the creator identity.
//! 4. Sign `hash(proposal_bytes)` with the signer's key.
//!
//! The proposal bytes are produced once and then only ever shared; the
//! assembler later decodes the header back out of the same `Proposal`.

use rand::RngCore;

use super::TransactionProposalRequest;
use crate::config::NONCE_LENGTH;
use crate::crypto::{CryptoSuite, PrivateKey};
use crate::error::{SdkError, SdkResult};
use crate::identity::User;
use crate::protos::{
    ChainHeader, ChaincodeHeaderExtension, ChaincodeId, ChaincodeInput, ChaincodeInvocationSpec,
    ChaincodeProposalPayload, ChaincodeSpec, ChaincodeType, Header, HeaderType, Message,
    Proposal, SerializedIdentity, SignatureHeader, SignedProposal, Timestamp,
};

pub(crate) fn missing(field: &str) -> SdkError {
    SdkError::Validation(format!("Missing '{field}' parameter in the proposal request"))
}

/// Checks the required request fields in a fixed order.
pub fn check_proposal_request(request: &TransactionProposalRequest) -> SdkResult<()> {
    if request.chaincode_id.is_empty() {
        return Err(missing("ChaincodeId"));
    }
    if request.chain_id.is_empty() {
        return Err(missing("ChainId"));
    }
    if request.targets.is_empty() {
        return Err(missing("Targets"));
    }
    if request.tx_id.is_empty() {
        return Err(missing("TxId"));
    }
    if request.args.is_empty() {
        return Err(missing("Args"));
    }
    Ok(())
}

/// Invocation spec with `function_name` in slot 0 followed by `args`.
pub fn build_invocation_spec(
    chaincode_id: &str,
    function_name: &str,
    args: &[String],
) -> ChaincodeInvocationSpec {
    let mut all = Vec::with_capacity(args.len() + 1);
    all.push(function_name.to_string());
    all.extend_from_slice(args);
    invocation_spec_from_args(chaincode_id, &all)
}

/// Invocation spec using `args` verbatim.
pub fn invocation_spec_from_args(chaincode_id: &str, args: &[String]) -> ChaincodeInvocationSpec {
    ChaincodeInvocationSpec {
        chaincode_spec: ChaincodeSpec {
            chaincode_type: ChaincodeType::Golang,
            chaincode_id: ChaincodeId {
                name: chaincode_id.to_string(),
                ..Default::default()
            },
            input: ChaincodeInput {
                args: args.iter().map(|a| a.as_bytes().to_vec()).collect(),
            },
            timeout: 0,
        },
        id_generation_alg: String::new(),
    }
}

/// Fresh transaction id.
pub fn new_tx_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Wraps an invocation spec into an endorser-transaction proposal.
pub fn create_chaincode_proposal(
    tx_id: &str,
    chain_id: &str,
    spec: &ChaincodeInvocationSpec,
    creator: Vec<u8>,
) -> SdkResult<Proposal> {
    let mut nonce = vec![0u8; NONCE_LENGTH];
    rand::thread_rng().fill_bytes(&mut nonce);

    let extension = ChaincodeHeaderExtension {
        payload_visibility: None,
        chaincode_id: spec.chaincode_spec.chaincode_id.clone(),
    };
    let header = Header {
        chain_header: ChainHeader {
            header_type: HeaderType::EndorserTransaction,
            version: 0,
            timestamp: Timestamp::now(),
            chain_id: chain_id.to_string(),
            tx_id: tx_id.to_string(),
            epoch: 0,
            extension: extension.to_bytes()?,
        },
        signature_header: SignatureHeader { creator, nonce },
    };
    let payload = ChaincodeProposalPayload {
        input: spec.to_bytes()?,
        transient_map: Default::default(),
    };

    Ok(Proposal {
        header: header.to_bytes()?,
        payload: payload.to_bytes()?,
        extension: Vec::new(),
    })
}

/// Signs `hash(proposal_bytes)`.
pub fn sign_proposal(
    proposal: &Proposal,
    key: &PrivateKey,
    suite: &dyn CryptoSuite,
) -> SdkResult<SignedProposal> {
    let proposal_bytes = proposal.to_bytes()?;
    let digest = suite.hash(&proposal_bytes);
    let signature = suite.sign(key, &digest)?;
    Ok(SignedProposal {
        proposal_bytes,
        signature,
    })
}

/// Validates, builds and signs. Returns the signed proposal, the proposal it
/// was made from, and the transaction id.
pub fn build(
    request: &TransactionProposalRequest,
    signer: &User,
    suite: &dyn CryptoSuite,
    msp_id: &str,
) -> SdkResult<(SignedProposal, Proposal, String)> {
    check_proposal_request(request)?;

    let key = signer.private_key()?;
    let spec = build_invocation_spec(&request.chaincode_id, &request.function_name, &request.args);
    let creator = signer.serialized_identity(msp_id)?;
    let proposal = create_chaincode_proposal(&request.tx_id, &request.chain_id, &spec, creator)?;
    let signed = sign_proposal(&proposal, key, suite)?;

    tracing::debug!(
        tx_id = %request.tx_id,
        chain_id = %request.chain_id,
        chaincode_id = %request.chaincode_id,
        "built transaction proposal"
    );
    Ok((signed, proposal, request.tx_id.clone()))
}

// ---------------------------------------------------------------------------
// ProposalView
// ---------------------------------------------------------------------------

/// The interesting fields of a serialized proposal, decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalView {
    pub tx_id: String,
    pub chain_id: String,
    pub chaincode_id: String,
    pub args: Vec<Vec<u8>>,
    pub creator: SerializedIdentity,
    pub timestamp: Timestamp,
}

impl ProposalView {
    pub fn parse(proposal_bytes: &[u8]) -> SdkResult<Self> {
        let proposal = Proposal::from_bytes(proposal_bytes)?;
        let header = Header::from_bytes(&proposal.header)?;
        let payload = ChaincodeProposalPayload::from_bytes(&proposal.payload)?;
        let spec = ChaincodeInvocationSpec::from_bytes(&payload.input)?;
        let creator = SerializedIdentity::from_bytes(&header.signature_header.creator)?;

        Ok(Self {
            tx_id: header.chain_header.tx_id,
            chain_id: header.chain_header.chain_id,
            chaincode_id: spec.chaincode_spec.chaincode_id.name,
            args: spec.chaincode_spec.input.args,
            creator,
            timestamp: header.chain_header.timestamp,
        })
    }

    /// Arguments as UTF-8 strings, lossily.
    pub fn string_args(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| String::from_utf8_lossy(a).into_owned())
            .collect()
    }
}
