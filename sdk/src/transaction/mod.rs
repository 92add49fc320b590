//! # Transaction Submission
//!
//! The four stages of getting a chaincode invocation onto the ledger, each
//! in its own module:
//!
//! ```text
//! proposal.rs   : validate a request, build and sign the proposal
//! endorsement.rs: fan the signed proposal out to endorsers
//! assembler.rs  : fold successful endorsements into a transaction
//! broadcast.rs  : sign the envelope and hand it to the orderers
//! ```
//!
//! The caller stays in control between stages: nothing here decides on its
//! own that a failed endorsement means "retry" or "give up".

pub mod assembler;
pub mod broadcast;
pub mod endorsement;
pub mod proposal;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

use crate::error::SdkError;
use crate::protos::ProposalResponse;
use crate::transport::Endorser;

pub use assembler::{create_signed_transaction, create_transaction, transaction_payload_bytes};
pub use broadcast::{broadcast_envelope, sign_payload};
pub use endorsement::send_peers_proposal;
pub use proposal::{
    build, build_invocation_spec, check_proposal_request, create_chaincode_proposal,
    invocation_spec_from_args, new_tx_id, sign_proposal, ProposalView,
};

/// Everything needed to ask a set of endorsers to simulate one invocation.
#[derive(Clone, Default)]
pub struct TransactionProposalRequest {
    pub targets: Vec<Arc<dyn Endorser>>,
    pub chaincode_id: String,
    pub chain_id: String,
    /// Placed in argument slot 0 ahead of `args`.
    pub function_name: String,
    pub tx_id: String,
    pub args: Vec<String>,
}

impl fmt::Debug for TransactionProposalRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let targets: Vec<&str> = self.targets.iter().map(|t| t.url()).collect();
        f.debug_struct("TransactionProposalRequest")
            .field("targets", &targets)
            .field("chaincode_id", &self.chaincode_id)
            .field("chain_id", &self.chain_id)
            .field("function_name", &self.function_name)
            .field("tx_id", &self.tx_id)
            .field("args", &self.args)
            .finish()
    }
}

/// One endorser's answer, or why there is none.
#[derive(Debug)]
pub struct TransactionProposalResponse {
    pub endorser: String,
    pub outcome: Result<ProposalResponse, SdkError>,
}

impl TransactionProposalResponse {
    pub fn response(&self) -> Option<&ProposalResponse> {
        self.outcome.as_ref().ok()
    }

    /// `true` when a response arrived, whatever its status.
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Responses that actually arrived, ordered by endorser URL so that the
/// assembled endorsement list does not depend on map iteration order.
pub fn collect_responses(
    results: HashMap<String, TransactionProposalResponse>,
) -> Vec<ProposalResponse> {
    let mut arrived: Vec<(String, ProposalResponse)> = results
        .into_iter()
        .filter_map(|(url, r)| r.outcome.ok().map(|resp| (url, resp)))
        .collect();
    arrived.sort_by(|a, b| a.0.cmp(&b.0));
    arrived.into_iter().map(|(_, resp)| resp).collect()
}

/// One orderer's verdict on a broadcast.
#[derive(Debug)]
pub struct TransactionResponse {
    pub orderer: String,
    pub outcome: Result<(), SdkError>,
}

impl TransactionResponse {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Moves a fan-out result map out of its `Arc` once every task is done.
pub(crate) fn into_results<V>(results: Arc<DashMap<String, V>>) -> HashMap<String, V> {
    match Arc::try_unwrap(results) {
        Ok(map) => map.into_iter().collect(),
        // Still shared: drain what is there now.
        Err(shared) => {
            let keys: Vec<String> = shared.iter().map(|e| e.key().clone()).collect();
            keys.into_iter().filter_map(|k| shared.remove(&k)).collect()
        }
    }
}
