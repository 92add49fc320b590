//! # Transaction Assembler
//!
//! Folds a set of endorsements into one `Transaction` with exactly one
//! `TransactionAction`. The checks, in order:
//!
//! 1. At least one response.
//! 2. Every response reports status 200; the first failure (input order)
//!    is returned with its status and message.
//! 3. Under [`PayloadAgreement::Strict`] every response payload must be
//!    byte-identical to the first one. [`PayloadAgreement::FirstResponse`]
//!    skips this and trusts the first payload.
//!
//! The action commits the first response payload plus every endorsement, in
//! input order, so the order the caller passes responses in is the order the
//! validators will see.

use std::collections::BTreeMap;

use crate::config::{PayloadAgreement, SUCCESS_STATUS};
use crate::crypto::CryptoSuite;
use crate::error::{SdkError, SdkResult};
use crate::identity::User;
use crate::protos::{
    ChaincodeActionPayload, ChaincodeEndorsedAction, ChaincodeHeaderExtension,
    ChaincodeProposalPayload, Envelope, Header, Message, Payload, Proposal, ProposalResponse,
    Transaction, TransactionAction,
};

use super::broadcast::sign_payload;

/// Builds the transaction for `proposal` from its endorsements.
pub fn create_transaction(
    proposal: &Proposal,
    responses: &[ProposalResponse],
    agreement: PayloadAgreement,
) -> SdkResult<Transaction> {
    let Some(first) = responses.first() else {
        return Err(SdkError::EmptyEndorsementSet);
    };
    if let Some(failed) = responses
        .iter()
        .find(|r| r.response.status != SUCCESS_STATUS)
    {
        return Err(SdkError::EndorsementStatus {
            status: failed.response.status,
            message: failed.response.message.clone(),
        });
    }

    let header = Header::from_bytes(&proposal.header)?;
    let proposal_payload = ChaincodeProposalPayload::from_bytes(&proposal.payload)?;
    let extension = ChaincodeHeaderExtension::from_bytes(&header.chain_header.extension)?;

    if agreement == PayloadAgreement::Strict
        && responses[1..].iter().any(|r| r.payload != first.payload)
    {
        return Err(SdkError::Assembly(
            "ProposalResponsePayloads do not match".to_string(),
        ));
    }

    let mut endorsements = Vec::with_capacity(responses.len());
    for response in responses {
        let endorsement = response.endorsement.clone().ok_or_else(|| {
            SdkError::Assembly("proposal response carries no endorsement".to_string())
        })?;
        endorsements.push(endorsement);
    }

    let action_payload = ChaincodeActionPayload {
        chaincode_proposal_payload: payload_for_ledger(
            &proposal_payload,
            &extension.payload_visibility,
        )?,
        action: ChaincodeEndorsedAction {
            proposal_response_payload: first.payload.clone(),
            endorsements,
        },
    };

    tracing::debug!(
        tx_id = %header.chain_header.tx_id,
        endorsements = responses.len(),
        "assembled transaction"
    );
    Ok(Transaction {
        actions: vec![TransactionAction {
            header: header.signature_header.to_bytes()?,
            payload: action_payload.to_bytes()?,
        }],
    })
}

/// The part of the proposal payload that is committed to the ledger.
/// Transient data never is.
fn payload_for_ledger(
    payload: &ChaincodeProposalPayload,
    visibility: &Option<Vec<u8>>,
) -> SdkResult<Vec<u8>> {
    match visibility {
        None => Ok(ChaincodeProposalPayload {
            input: payload.input.clone(),
            transient_map: BTreeMap::new(),
        }
        .to_bytes()?),
        Some(_) => Err(SdkError::Assembly(
            "unsupported payload visibility".to_string(),
        )),
    }
}

/// `Payload` bytes for `tx`, under the proposal's own header. This is what
/// the submitter signs into the envelope.
pub fn transaction_payload_bytes(proposal: &Proposal, tx: &Transaction) -> SdkResult<Vec<u8>> {
    let header = Header::from_bytes(&proposal.header)?;
    Ok(Payload {
        header,
        data: tx.to_bytes()?,
    }
    .to_bytes()?)
}

/// Assembles and signs in one step, yielding a ready-to-broadcast envelope.
pub fn create_signed_transaction(
    proposal: &Proposal,
    signer: &User,
    suite: &dyn CryptoSuite,
    responses: &[ProposalResponse],
    agreement: PayloadAgreement,
) -> SdkResult<Envelope> {
    let tx = create_transaction(proposal, responses, agreement)?;
    let payload = transaction_payload_bytes(proposal, &tx)?;
    sign_payload(payload, signer.private_key()?, suite)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SecurityConfig;
    use crate::crypto::{Ed25519Sha2Suite, PrivateKey};
    use crate::protos::{Endorsement, Response};
    use crate::transaction::proposal::{build_invocation_spec, create_chaincode_proposal};

    fn proposal() -> Proposal {
        let spec = build_invocation_spec("mycc", "invoke", &["a".into()]);
        create_chaincode_proposal("tx-1", "testchainid", &spec, b"creator".to_vec()).unwrap()
    }

    fn response(status: i32, payload: &[u8], endorser: &[u8]) -> ProposalResponse {
        ProposalResponse {
            response: Response {
                status,
                message: format!("status {status}"),
                payload: vec![],
            },
            payload: payload.to_vec(),
            endorsement: Some(Endorsement {
                endorser: endorser.to_vec(),
                signature: b"sig".to_vec(),
            }),
            ..Default::default()
        }
    }

    fn action_payload(tx: &Transaction) -> ChaincodeActionPayload {
        assert_eq!(tx.actions.len(), 1);
        ChaincodeActionPayload::from_bytes(&tx.actions[0].payload).unwrap()
    }

    #[test]
    fn no_responses_is_empty_endorsement_set() {
        let err = create_transaction(&proposal(), &[], PayloadAgreement::Strict).unwrap_err();
        assert!(matches!(err, SdkError::EmptyEndorsementSet));
    }

    #[test]
    fn first_failing_status_is_reported() {
        let responses = vec![
            response(200, b"p", b"e0"),
            response(500, b"p", b"e1"),
            response(403, b"p", b"e2"),
        ];
        let err = create_transaction(&proposal(), &responses, PayloadAgreement::Strict).unwrap_err();
        match err {
            SdkError::EndorsementStatus { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "status 500");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn strict_agreement_rejects_divergent_payloads() {
        let responses = vec![response(200, b"one", b"e0"), response(200, b"two", b"e1")];
        let err = create_transaction(&proposal(), &responses, PayloadAgreement::Strict).unwrap_err();
        assert_eq!(err.to_string(), "ProposalResponsePayloads do not match");
    }

    #[test]
    fn first_response_agreement_uses_first_payload() {
        let responses = vec![response(200, b"one", b"e0"), response(200, b"two", b"e1")];
        let tx =
            create_transaction(&proposal(), &responses, PayloadAgreement::FirstResponse).unwrap();
        let cap = action_payload(&tx);
        assert_eq!(cap.action.proposal_response_payload, b"one");
        assert_eq!(cap.action.endorsements.len(), 2);
    }

    #[test]
    fn endorsements_keep_input_order() {
        let responses = vec![
            response(200, b"same", b"e2"),
            response(200, b"same", b"e0"),
            response(200, b"same", b"e1"),
        ];
        let tx = create_transaction(&proposal(), &responses, PayloadAgreement::Strict).unwrap();
        let endorsers: Vec<Vec<u8>> = action_payload(&tx)
            .action
            .endorsements
            .into_iter()
            .map(|e| e.endorser)
            .collect();
        assert_eq!(endorsers, vec![b"e2".to_vec(), b"e0".to_vec(), b"e1".to_vec()]);
    }

    #[test]
    fn action_header_is_proposal_signature_header() {
        let proposal = proposal();
        let tx = create_transaction(
            &proposal,
            &[response(200, b"p", b"e0")],
            PayloadAgreement::Strict,
        )
        .unwrap();
        let header = Header::from_bytes(&proposal.header).unwrap();
        assert_eq!(tx.actions[0].header, header.signature_header.to_bytes().unwrap());
    }

    #[test]
    fn transient_data_is_not_committed() {
        let mut proposal = proposal();
        let mut payload = ChaincodeProposalPayload::from_bytes(&proposal.payload).unwrap();
        payload
            .transient_map
            .insert("secret".into(), b"do not commit".to_vec());
        proposal.payload = payload.to_bytes().unwrap();

        let tx = create_transaction(
            &proposal,
            &[response(200, b"p", b"e0")],
            PayloadAgreement::Strict,
        )
        .unwrap();
        let committed =
            ChaincodeProposalPayload::from_bytes(&action_payload(&tx).chaincode_proposal_payload)
                .unwrap();
        assert!(committed.transient_map.is_empty());
        assert_eq!(committed.input, payload.input);
    }

    #[test]
    fn explicit_visibility_is_unsupported() {
        let mut proposal = proposal();
        let mut header = Header::from_bytes(&proposal.header).unwrap();
        let mut ext = ChaincodeHeaderExtension::from_bytes(&header.chain_header.extension).unwrap();
        ext.payload_visibility = Some(vec![1]);
        header.chain_header.extension = ext.to_bytes().unwrap();
        proposal.header = header.to_bytes().unwrap();

        let err = create_transaction(
            &proposal,
            &[response(200, b"p", b"e0")],
            PayloadAgreement::Strict,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "unsupported payload visibility");
    }

    #[test]
    fn signed_transaction_verifies_over_payload_hash() {
        let suite = Ed25519Sha2Suite::new(&SecurityConfig::default()).unwrap();
        let user = User::enrolled("alice", PrivateKey::generate(), b"CERT".to_vec());
        let proposal = proposal();

        let envelope = create_signed_transaction(
            &proposal,
            &user,
            &suite,
            &[response(200, b"p", b"e0")],
            PayloadAgreement::Strict,
        )
        .unwrap();

        let public = user.private_key().unwrap().public_key();
        let digest = suite.hash(&envelope.payload);
        assert!(suite.verify(&public, &envelope.signature, &digest).unwrap());

        let payload = Payload::from_bytes(&envelope.payload).unwrap();
        assert_eq!(payload.header, Header::from_bytes(&proposal.header).unwrap());
        let tx = Transaction::from_bytes(&payload.data).unwrap();
        assert_eq!(tx.actions.len(), 1);
    }
}
