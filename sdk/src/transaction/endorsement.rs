//! # Endorsement Collector
//!
//! Sends one signed proposal to every target at once and waits for all of
//! them. Each target gets its own tokio task and writes its outcome into a
//! shared `DashMap` under its own URL, so tasks never contend on a key.
//!
//! The collector does not judge responses. A well-formed response with a
//! failing status is still `Ok` here; deciding whether the endorsements are
//! good enough is the assembler's job.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use futures::future::join_all;

use super::{into_results, TransactionProposalResponse};
use crate::error::{SdkError, SdkResult};
use crate::protos::SignedProposal;
use crate::transport::{Endorser, TransportError};

/// Fans `signed` out to `targets`, returning one entry per target URL.
pub async fn send_peers_proposal(
    targets: &[Arc<dyn Endorser>],
    signed: &SignedProposal,
) -> SdkResult<HashMap<String, TransactionProposalResponse>> {
    if targets.is_empty() {
        return Err(SdkError::Configuration(
            "Missing peer objects for sending transaction proposal".to_string(),
        ));
    }
    if signed.proposal_bytes.is_empty() {
        return Err(SdkError::Configuration(
            "signed proposal has no proposal bytes".to_string(),
        ));
    }

    let signed = Arc::new(signed.clone());
    let results: Arc<DashMap<String, TransactionProposalResponse>> = Arc::new(DashMap::new());

    let handles = targets.iter().map(|target| {
        let target = Arc::clone(target);
        let signed = Arc::clone(&signed);
        let results = Arc::clone(&results);
        tokio::spawn(async move {
            let url = target.url().to_string();
            tracing::debug!(endorser = %url, "sending transaction proposal");

            let outcome = target
                .process_proposal(&signed)
                .await
                .map_err(|source| SdkError::Transport {
                    target: url.clone(),
                    source,
                });
            match &outcome {
                Ok(resp) => tracing::debug!(
                    endorser = %url,
                    status = resp.response.status,
                    "received proposal response"
                ),
                Err(e) => tracing::warn!(endorser = %url, error = %e, "endorser call failed"),
            }

            results.insert(
                url.clone(),
                TransactionProposalResponse {
                    endorser: url,
                    outcome,
                },
            );
        })
    });

    let joined = join_all(handles).await;

    // A task that died before writing its entry still owes the caller one.
    for (target, join) in targets.iter().zip(joined) {
        if let Err(e) = join {
            let url = target.url().to_string();
            tracing::error!(endorser = %url, error = %e, "endorser task failed");
            results
                .entry(url.clone())
                .or_insert_with(|| TransactionProposalResponse {
                    endorser: url.clone(),
                    outcome: Err(SdkError::Transport {
                        target: url,
                        source: TransportError::Remote(format!("endorser task failed: {e}")),
                    }),
                });
        }
    }

    Ok(into_results(results))
}
