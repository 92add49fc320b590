//! # Chain
//!
//! A named channel view: the endorsing peers and orderers a client talks to
//! for one chain, plus the submission steps bound to the client's current
//! user context.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::client::ClientContext;
use crate::config::{PayloadAgreement, SUCCESS_STATUS};
use crate::crypto::CryptoSuite;
use crate::error::{SdkError, SdkResult};
use crate::protos::{Header, Message, Proposal, ProposalResponse, SignedProposal, Transaction};
use crate::transaction::proposal::missing;
use crate::transaction::{
    broadcast_envelope, create_chaincode_proposal, create_transaction, invocation_spec_from_args,
    new_tx_id, send_peers_proposal, sign_payload, sign_proposal, transaction_payload_bytes,
    TransactionProposalResponse, TransactionResponse,
};
use crate::transport::{Endorser, Orderer};

pub struct Chain {
    name: String,
    security_enabled: bool,
    tcert_batch_size: usize,
    peers: RwLock<HashMap<String, Arc<dyn Endorser>>>,
    orderers: RwLock<HashMap<String, Arc<dyn Orderer>>>,
    context: Arc<ClientContext>,
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("name", &self.name)
            .field("security_enabled", &self.security_enabled)
            .field("tcert_batch_size", &self.tcert_batch_size)
            .field("peers", &self.peers.read().keys().collect::<Vec<_>>())
            .field("orderers", &self.orderers.read().keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Chain {
    pub(crate) fn new(name: &str, context: Arc<ClientContext>) -> SdkResult<Self> {
        if name.is_empty() {
            return Err(SdkError::Configuration(
                "Failed to create Chain. Missing requirement 'name' parameter.".to_string(),
            ));
        }
        let config = context.config();
        let chain = Self {
            name: name.to_string(),
            security_enabled: config.security.enabled,
            tcert_batch_size: config.tcert.batch_size,
            peers: RwLock::new(HashMap::new()),
            orderers: RwLock::new(HashMap::new()),
            context,
        };
        tracing::info!(chain = %chain.name, "chain created");
        Ok(chain)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_security_enabled(&self) -> bool {
        self.security_enabled
    }

    pub fn tcert_batch_size(&self) -> usize {
        self.tcert_batch_size
    }

    pub(crate) fn crypto_suite(&self) -> Arc<dyn CryptoSuite> {
        Arc::clone(self.context.crypto_suite())
    }

    pub(crate) fn msp_id(&self) -> &str {
        &self.context.config().msp.id
    }

    pub(crate) fn agreement(&self) -> PayloadAgreement {
        self.context.config().endorsement.agreement
    }

    // -- Peers & orderers ---------------------------------------------------------

    /// Adds an endorsing peer. A peer with the same URL is replaced.
    pub fn add_peer(&self, peer: Arc<dyn Endorser>) {
        tracing::debug!(chain = %self.name, peer = peer.url(), "peer added");
        self.peers.write().insert(peer.url().to_string(), peer);
    }

    pub fn remove_peer(&self, url: &str) -> bool {
        self.peers.write().remove(url).is_some()
    }

    /// Peers ordered by URL.
    pub fn peers(&self) -> Vec<Arc<dyn Endorser>> {
        let peers = self.peers.read();
        let mut urls: Vec<&String> = peers.keys().collect();
        urls.sort();
        urls.into_iter().map(|u| Arc::clone(&peers[u])).collect()
    }

    /// Adds an orderer. An orderer with the same URL is replaced.
    pub fn add_orderer(&self, orderer: Arc<dyn Orderer>) {
        tracing::debug!(chain = %self.name, orderer = orderer.url(), "orderer added");
        self.orderers.write().insert(orderer.url().to_string(), orderer);
    }

    pub fn remove_orderer(&self, url: &str) -> bool {
        self.orderers.write().remove(url).is_some()
    }

    /// Orderers ordered by URL.
    pub fn orderers(&self) -> Vec<Arc<dyn Orderer>> {
        let orderers = self.orderers.read();
        let mut urls: Vec<&String> = orderers.keys().collect();
        urls.sort();
        urls.into_iter().map(|u| Arc::clone(&orderers[u])).collect()
    }

    // -- Submission -----------------------------------------------------------------

    /// Builds and signs a proposal with the current user context. `args` are
    /// used verbatim, function name included. Returns the signed proposal,
    /// the proposal, and the fresh transaction id.
    pub fn create_transaction_proposal(
        &self,
        chaincode_id: &str,
        chain_id: &str,
        args: &[String],
    ) -> SdkResult<(SignedProposal, Proposal, String)> {
        if chaincode_id.is_empty() {
            return Err(missing("ChaincodeId"));
        }
        if chain_id.is_empty() {
            return Err(missing("ChainId"));
        }
        if args.is_empty() {
            return Err(missing("Args"));
        }

        let user = self.context.user_context()?;
        let key = user.private_key()?;
        let tx_id = new_tx_id();
        let spec = invocation_spec_from_args(chaincode_id, args);
        let creator = user.serialized_identity(self.msp_id())?;
        let proposal = create_chaincode_proposal(&tx_id, chain_id, &spec, creator)?;
        let signed = sign_proposal(&proposal, key, self.context.crypto_suite().as_ref())?;

        tracing::debug!(chain = %self.name, %tx_id, chaincode_id, "transaction proposal created");
        Ok((signed, proposal, tx_id))
    }

    /// Sends `signed` to every peer of this chain.
    ///
    /// `retry` is accepted for call compatibility; failed peers are reported
    /// in the result map and never retried.
    pub async fn send_transaction_proposal(
        &self,
        signed: &SignedProposal,
        retry: u32,
    ) -> SdkResult<HashMap<String, TransactionProposalResponse>> {
        let peers = self.peers();
        tracing::debug!(chain = %self.name, peers = peers.len(), retry, "sending proposal");
        let results = send_peers_proposal(&peers, signed).await?;

        let metrics = self.context.metrics();
        metrics.proposals_sent_total.inc_by(peers.len() as u64);
        let failures = results
            .values()
            .filter(|r| {
                r.response()
                    .map_or(true, |resp| resp.response.status != SUCCESS_STATUS)
            })
            .count();
        metrics.endorsement_failures_total.inc_by(failures as u64);
        if failures > 0 {
            tracing::warn!(chain = %self.name, failures, "some endorsers did not endorse");
        }
        Ok(results)
    }

    /// Assembles the transaction under the configured payload agreement.
    pub fn create_transaction(
        &self,
        proposal: &Proposal,
        responses: &[ProposalResponse],
    ) -> SdkResult<Transaction> {
        create_transaction(proposal, responses, self.agreement())
    }

    /// Signs `tx` with the current user context and broadcasts it to every
    /// orderer of this chain. The user context must be the proposal's
    /// creator.
    pub async fn send_transaction(
        &self,
        proposal: &Proposal,
        tx: &Transaction,
    ) -> SdkResult<HashMap<String, TransactionResponse>> {
        let orderers = self.orderers();
        if orderers.is_empty() {
            return Err(SdkError::Configuration("orderers is nil".to_string()));
        }
        if proposal.header.is_empty() {
            return Err(SdkError::Validation("proposal is nil".to_string()));
        }
        if tx.actions.is_empty() {
            return Err(SdkError::Validation("Transaction is nil".to_string()));
        }

        let user = self.context.user_context()?;
        let header = Header::from_bytes(&proposal.header)?;
        if header.signature_header.creator != user.serialized_identity(self.msp_id())? {
            return Err(SdkError::Validation(format!(
                "user context '{}' did not create this proposal",
                user.name()
            )));
        }
        let payload = transaction_payload_bytes(proposal, tx)?;
        let suite = self.context.crypto_suite();
        let envelope = sign_payload(payload, user.private_key()?, suite.as_ref())?;
        let results = broadcast_envelope(&envelope, &orderers).await?;

        let metrics = self.context.metrics();
        metrics.transactions_broadcast_total.inc_by(orderers.len() as u64);
        let failures = results.values().filter(|r| !r.is_success()).count();
        metrics.ordering_failures_total.inc_by(failures as u64);
        tracing::info!(
            chain = %self.name,
            orderers = orderers.len(),
            failures,
            "transaction broadcast"
        );
        Ok(results)
    }
}
