//! # Broadcast Coordinator
//!
//! Hands one signed envelope to every orderer at once. Per orderer:
//!
//! ```text
//! open stream ─► send envelope ─► close send side ─► drain acks until EOS
//! ```
//!
//! A non-success ack is remembered and draining carries on, so the orderer
//! gets to close the stream on its own terms. A stream error ends draining
//! immediately. The orderer counts as successful only if the stream ended
//! cleanly with nothing remembered.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use futures::future::join_all;

use super::{into_results, TransactionResponse};
use crate::crypto::{CryptoSuite, PrivateKey};
use crate::error::{SdkError, SdkResult};
use crate::protos::{Envelope, Status};
use crate::transport::Orderer;

/// Signs `hash(payload)` and wraps both into an envelope.
pub fn sign_payload(
    payload: Vec<u8>,
    key: &PrivateKey,
    suite: &dyn CryptoSuite,
) -> SdkResult<Envelope> {
    let digest = suite.hash(&payload);
    let signature = suite.sign(key, &digest)?;
    Ok(Envelope { payload, signature })
}

/// Sends `envelope` to all `orderers`, one entry per orderer URL.
pub async fn broadcast_envelope(
    envelope: &Envelope,
    orderers: &[Arc<dyn Orderer>],
) -> SdkResult<HashMap<String, TransactionResponse>> {
    if orderers.is_empty() {
        return Err(SdkError::Configuration(
            "no orderers configured for broadcast".to_string(),
        ));
    }
    if envelope.payload.is_empty() {
        return Err(SdkError::Validation("envelope payload is empty".to_string()));
    }

    let envelope = Arc::new(envelope.clone());
    let results: Arc<DashMap<String, TransactionResponse>> = Arc::new(DashMap::new());

    let handles = orderers.iter().map(|orderer| {
        let orderer = Arc::clone(orderer);
        let envelope = Arc::clone(&envelope);
        let results = Arc::clone(&results);
        tokio::spawn(async move {
            let url = orderer.url().to_string();
            tracing::debug!(orderer = %url, "broadcasting envelope");

            let outcome = send_broadcast(orderer.as_ref(), &envelope)
                .await
                .map_err(|reason| {
                    tracing::warn!(orderer = %url, reason = %reason, "broadcast failed");
                    SdkError::Ordering {
                        orderer: url.clone(),
                        reason,
                    }
                });
            results.insert(
                url.clone(),
                TransactionResponse {
                    orderer: url,
                    outcome,
                },
            );
        })
    });

    let joined = join_all(handles).await;
    for (orderer, join) in orderers.iter().zip(joined) {
        if let Err(e) = join {
            let url = orderer.url().to_string();
            tracing::error!(orderer = %url, error = %e, "broadcast task failed");
            results
                .entry(url.clone())
                .or_insert_with(|| TransactionResponse {
                    orderer: url.clone(),
                    outcome: Err(SdkError::Ordering {
                        orderer: url,
                        reason: format!("broadcast task failed: {e}"),
                    }),
                });
        }
    }

    Ok(into_results(results))
}

/// One orderer's broadcast exchange. `Err` carries the failure reason.
async fn send_broadcast(orderer: &dyn Orderer, envelope: &Envelope) -> Result<(), String> {
    let mut stream = orderer
        .open_broadcast()
        .await
        .map_err(|e| format!("failed to open broadcast stream: {e}"))?;
    stream
        .send(envelope)
        .await
        .map_err(|e| format!("failed to send envelope: {e}"))?;
    stream
        .close_send()
        .await
        .map_err(|e| format!("failed to close send side: {e}"))?;

    let mut failure: Option<String> = None;
    loop {
        match stream.recv().await {
            Ok(Some(ack)) if ack.status == Status::Success => {}
            Ok(Some(ack)) => {
                tracing::debug!(orderer = orderer.url(), status = ?ack.status, "non-success ack");
                failure.get_or_insert_with(|| {
                    format!("got unexpected status: {:?} ({})", ack.status, ack.status.code())
                });
            }
            Ok(None) => break,
            Err(e) => {
                failure.get_or_insert_with(|| format!("broadcast stream error: {e}"));
                break;
            }
        }
    }

    match failure {
        Some(reason) => Err(reason),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protos::BroadcastResponse;
    use crate::transport::{BroadcastStream, TransportError};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// Scripted orderer: replays a fixed list of acks / errors.
    struct ScriptedOrderer {
        url: String,
        script: Vec<Result<Status, String>>,
        refuse_open: bool,
        sent: Arc<Mutex<Vec<Envelope>>>,
    }

    struct ScriptedStream {
        script: VecDeque<Result<Status, String>>,
        sent: Arc<Mutex<Vec<Envelope>>>,
        closed: bool,
    }

    #[async_trait]
    impl BroadcastStream for ScriptedStream {
        async fn send(&mut self, envelope: &Envelope) -> Result<(), TransportError> {
            assert!(!self.closed, "send after close_send");
            self.sent.lock().push(envelope.clone());
            Ok(())
        }

        async fn close_send(&mut self) -> Result<(), TransportError> {
            self.closed = true;
            Ok(())
        }

        async fn recv(&mut self) -> Result<Option<BroadcastResponse>, TransportError> {
            match self.script.pop_front() {
                Some(Ok(status)) => Ok(Some(BroadcastResponse { status })),
                Some(Err(e)) => Err(TransportError::Remote(e)),
                None => Ok(None),
            }
        }
    }

    #[async_trait]
    impl Orderer for ScriptedOrderer {
        fn url(&self) -> &str {
            &self.url
        }

        async fn open_broadcast(&self) -> Result<Box<dyn BroadcastStream>, TransportError> {
            if self.refuse_open {
                return Err(TransportError::Closed);
            }
            Ok(Box::new(ScriptedStream {
                script: self.script.clone().into(),
                sent: self.sent.clone(),
                closed: false,
            }))
        }
    }

    fn orderer(
        url: &str,
        script: Vec<Result<Status, String>>,
    ) -> (Arc<dyn Orderer>, Arc<Mutex<Vec<Envelope>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let o = ScriptedOrderer {
            url: url.into(),
            script,
            refuse_open: false,
            sent: sent.clone(),
        };
        (Arc::new(o), sent)
    }

    fn envelope() -> Envelope {
        Envelope {
            payload: b"payload".to_vec(),
            signature: b"sig".to_vec(),
        }
    }

    #[tokio::test]
    async fn empty_orderers_is_configuration_error() {
        let err = broadcast_envelope(&envelope(), &[]).await.unwrap_err();
        assert!(matches!(err, SdkError::Configuration(_)));
    }

    #[tokio::test]
    async fn empty_payload_is_validation_error() {
        let (o, _) = orderer("o0", vec![Ok(Status::Success)]);
        let err = broadcast_envelope(&Envelope::default(), &[o])
            .await
            .unwrap_err();
        assert!(matches!(err, SdkError::Validation(_)));
    }

    #[tokio::test]
    async fn exactly_one_envelope_is_sent_per_orderer() {
        let (o, sent) = orderer("o0", vec![Ok(Status::Success)]);
        let results = broadcast_envelope(&envelope(), &[o]).await.unwrap();
        assert!(results["o0"].is_success());
        assert_eq!(*sent.lock(), vec![envelope()]);
    }

    #[tokio::test]
    async fn non_success_ack_is_recorded_and_draining_continues() {
        let (o, _) = orderer(
            "o0",
            vec![Ok(Status::BadRequest), Ok(Status::Success), Ok(Status::Success)],
        );
        let results = broadcast_envelope(&envelope(), &[o]).await.unwrap();
        match &results["o0"].outcome {
            Err(SdkError::Ordering { orderer, reason }) => {
                assert_eq!(orderer, "o0");
                assert!(reason.contains("BadRequest"));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn stream_error_fails_the_orderer() {
        let (o, _) = orderer("o0", vec![Ok(Status::Success), Err("reset".into())]);
        let results = broadcast_envelope(&envelope(), &[o]).await.unwrap();
        assert!(!results["o0"].is_success());
    }

    #[tokio::test]
    async fn clean_end_without_acks_is_success() {
        let (o, _) = orderer("o0", vec![]);
        let results = broadcast_envelope(&envelope(), &[o]).await.unwrap();
        assert!(results["o0"].is_success());
    }

    #[tokio::test]
    async fn mixed_orderers_report_independently() {
        let (good, _) = orderer("good", vec![Ok(Status::Success)]);
        let refused: Arc<dyn Orderer> = Arc::new(ScriptedOrderer {
            url: "down".into(),
            script: vec![],
            refuse_open: true,
            sent: Arc::new(Mutex::new(Vec::new())),
        });

        let results = broadcast_envelope(&envelope(), &[good, refused]).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results["good"].is_success());
        assert!(!results["down"].is_success());
    }
}
