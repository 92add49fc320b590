//! # Prometheus Metrics
//!
//! Counters for the work a client pushes through the network. They live in
//! a dedicated [`prometheus::Registry`] with the `ledger_sdk` prefix so an
//! embedding process can expose them next to its own metrics without name
//! clashes.

use prometheus::{Encoder, IntCounter, Registry, TextEncoder};

/// Metric handles. Cheap to clone; all clones share the same counters.
#[derive(Clone)]
pub struct SdkMetrics {
    registry: Registry,
    /// Proposals sent, counted once per target.
    pub proposals_sent_total: IntCounter,
    /// Targets that returned a transport error or a non-200 status.
    pub endorsement_failures_total: IntCounter,
    /// Envelopes broadcast, counted once per orderer.
    pub transactions_broadcast_total: IntCounter,
    /// Orderers that did not accept a broadcast.
    pub ordering_failures_total: IntCounter,
    /// Transaction commit or rejection notifications delivered to callbacks.
    pub tx_events_delivered_total: IntCounter,
}

impl SdkMetrics {
    /// Creates and registers all counters.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("ledger_sdk".into()), None)?;

        let counter = |name: &str, help: &str| -> Result<IntCounter, prometheus::Error> {
            let c = IntCounter::new(name, help)?;
            registry.register(Box::new(c.clone()))?;
            Ok(c)
        };

        let proposals_sent_total = counter(
            "proposals_sent_total",
            "Transaction proposals sent, one per endorsing target",
        )?;
        let endorsement_failures_total = counter(
            "endorsement_failures_total",
            "Endorsing targets that failed or returned a non-success status",
        )?;
        let transactions_broadcast_total = counter(
            "transactions_broadcast_total",
            "Transaction envelopes broadcast, one per orderer",
        )?;
        let ordering_failures_total = counter(
            "ordering_failures_total",
            "Orderers that did not accept a broadcast envelope",
        )?;
        let tx_events_delivered_total = counter(
            "tx_events_delivered_total",
            "Transaction events delivered to registered callbacks",
        )?;

        Ok(Self {
            registry,
            proposals_sent_total,
            endorsement_failures_total,
            transactions_broadcast_total,
            ordering_failures_total,
            tx_events_delivered_total,
        })
    }

    /// Renders every registered metric in the Prometheus text format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
