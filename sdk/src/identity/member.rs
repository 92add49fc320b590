//! Legacy member API.
//!
//! A [`Member`] is a user bound to one chain. It copies what it needs from
//! the chain when created (name, security settings, suite, MSP id) rather
//! than holding the chain itself, and targets whatever peers and orderers
//! the caller passes in.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::chain::Chain;
use crate::config::PayloadAgreement;
use crate::crypto::CryptoSuite;
use crate::error::SdkResult;
use crate::identity::User;
use crate::protos::{Envelope, Proposal, ProposalResponse};
use crate::transaction::{
    broadcast_envelope, build, create_signed_transaction, send_peers_proposal,
    TransactionProposalRequest, TransactionProposalResponse, TransactionResponse,
};
use crate::transport::Orderer;

pub struct Member {
    user: Arc<User>,
    chain_name: String,
    security_enabled: bool,
    tcert_batch_size: usize,
    msp_id: String,
    agreement: PayloadAgreement,
    suite: Arc<dyn CryptoSuite>,
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Member")
            .field("name", &self.user.name())
            .field("chain", &self.chain_name)
            .field("security_enabled", &self.security_enabled)
            .field("tcert_batch_size", &self.tcert_batch_size)
            .finish()
    }
}

impl Member {
    pub fn new(user: Arc<User>, chain: &Chain) -> Self {
        Self {
            user,
            chain_name: chain.name().to_string(),
            security_enabled: chain.is_security_enabled(),
            tcert_batch_size: chain.tcert_batch_size(),
            msp_id: chain.msp_id().to_string(),
            agreement: chain.agreement(),
            suite: chain.crypto_suite(),
        }
    }

    pub fn name(&self) -> &str {
        self.user.name()
    }

    pub fn roles(&self) -> &[String] {
        self.user.roles()
    }

    pub fn user(&self) -> &Arc<User> {
        &self.user
    }

    pub fn chain_name(&self) -> &str {
        &self.chain_name
    }

    pub fn is_security_enabled(&self) -> bool {
        self.security_enabled
    }

    pub fn tcert_batch_size(&self) -> usize {
        self.tcert_batch_size
    }

    /// Validates and signs `request`, then sends it to `request.targets`.
    /// Returns the per-target results together with the proposal they
    /// endorse.
    pub async fn send_transaction_proposal(
        &self,
        request: &TransactionProposalRequest,
    ) -> SdkResult<(HashMap<String, TransactionProposalResponse>, Proposal)> {
        let (signed, proposal, tx_id) =
            build(request, &self.user, self.suite.as_ref(), &self.msp_id)?;
        tracing::debug!(member = self.name(), %tx_id, "sending proposal");
        let results = send_peers_proposal(&request.targets, &signed).await?;
        Ok((results, proposal))
    }

    /// Assembles the transaction and signs it into an envelope.
    pub fn create_transaction(
        &self,
        proposal: &Proposal,
        responses: &[ProposalResponse],
    ) -> SdkResult<Envelope> {
        create_signed_transaction(
            proposal,
            &self.user,
            self.suite.as_ref(),
            responses,
            self.agreement,
        )
    }

    pub async fn send_transaction(
        &self,
        envelope: &Envelope,
        orderers: &[Arc<dyn Orderer>],
    ) -> SdkResult<HashMap<String, TransactionResponse>> {
        broadcast_envelope(envelope, orderers).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Client;
    use crate::config::ClientConfig;
    use crate::crypto::PrivateKey;
    use crate::error::SdkError;
    use crate::protos::{Endorsement, Message, Response, SignedProposal};
    use crate::transaction::{collect_responses, ProposalView};
    use crate::transport::{Endorser, TransportError};
    use async_trait::async_trait;

    struct FixedEndorser(&'static str);

    #[async_trait]
    impl Endorser for FixedEndorser {
        fn url(&self) -> &str {
            self.0
        }

        async fn process_proposal(
            &self,
            signed: &SignedProposal,
        ) -> Result<ProposalResponse, TransportError> {
            let view = ProposalView::parse(&signed.proposal_bytes)
                .map_err(|e| TransportError::Remote(e.to_string()))?;
            Ok(ProposalResponse {
                response: Response {
                    status: 200,
                    message: "OK".into(),
                    payload: view.tx_id.into_bytes(),
                },
                payload: b"rwset".to_vec(),
                endorsement: Some(Endorsement {
                    endorser: self.0.as_bytes().to_vec(),
                    signature: vec![7],
                }),
                ..Default::default()
            })
        }
    }

    fn member() -> Member {
        let client = Client::from_config(ClientConfig::default()).unwrap();
        let chain = client.new_chain("testchainid").unwrap();
        let user = User::enrolled("bob", PrivateKey::generate(), b"cert".to_vec())
            .with_roles(vec!["client".into()]);
        Member::new(Arc::new(user), &chain)
    }

    fn request(targets: Vec<Arc<dyn Endorser>>) -> TransactionProposalRequest {
        TransactionProposalRequest {
            targets,
            chaincode_id: "mycc".into(),
            chain_id: "testchainid".into(),
            function_name: "invoke".into(),
            tx_id: "tx-member-1".into(),
            args: vec!["query".into(), "b".into()],
        }
    }

    #[test]
    fn member_copies_chain_settings() {
        let member = member();
        assert_eq!(member.name(), "bob");
        assert_eq!(member.roles(), ["client".to_string()]);
        assert_eq!(member.chain_name(), "testchainid");
        assert!(member.is_security_enabled());
    }

    #[tokio::test]
    async fn proposal_to_envelope() {
        let member = member();
        let targets: Vec<Arc<dyn Endorser>> =
            vec![Arc::new(FixedEndorser("peer0:7051")), Arc::new(FixedEndorser("peer1:7051"))];
        let (results, proposal) = member
            .send_transaction_proposal(&request(targets))
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(
            results["peer0:7051"].response().unwrap().response.payload,
            b"tx-member-1"
        );

        let envelope = member
            .create_transaction(&proposal, &collect_responses(results))
            .unwrap();
        assert_eq!(
            crate::protos::envelope_tx_id(&envelope.to_bytes().unwrap()).unwrap(),
            "tx-member-1"
        );
    }

    #[tokio::test]
    async fn missing_targets_fail_validation() {
        let err = member()
            .send_transaction_proposal(&request(Vec::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, SdkError::Validation(ref m) if m.contains("Targets")));
    }

    #[tokio::test]
    async fn broadcast_without_orderers_is_rejected() {
        let err = member()
            .send_transaction(&Envelope::default(), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, SdkError::Configuration(_)));
    }
}
