// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Ledger SDK, Transaction Submission Client
//!
//! Client-side plumbing for a permissioned ledger network made of endorsing
//! peers and ordering nodes. The SDK does not execute chaincode or order
//! anything itself; it builds signed requests, talks to the nodes that do,
//! and stitches their answers together.
//!
//! ## Submission Flow
//!
//! ```text
//! build proposal ──► collect endorsements (one task per peer)
//!                          │
//!                  caller inspects results
//!                          │
//!                          ▼
//!            assemble transaction ──► broadcast (one task per orderer)
//!                                            │
//!                                            ▼
//!                             event hub reports the commit
//! ```
//!
//! ## Architecture
//!
//! - **protos**: Wire messages and their canonical bincode encoding.
//! - **crypto**: The `CryptoSuite` seam (hashing, signing, key store).
//! - **identity**: Users, enrollment, and the legacy `Member` path.
//! - **store**: Key-value state stores (file-per-key and sled).
//! - **transport**: Endorser/orderer traits and the framed TCP implementation.
//! - **transaction**: Proposal builder, endorsement collector, assembler,
//!   broadcast coordinator.
//! - **events**: The event hub that correlates commits with transaction ids.
//! - **chain** / **client**: Session objects tying it all together.
//! - **config**: Constants and the TOML client configuration.
//! - **metrics**: Prometheus counters for submitted work.

pub mod chain;
pub mod client;
pub mod config;
pub mod crypto;
pub mod error;
pub mod events;
pub mod identity;
pub mod metrics;
pub mod protos;
pub mod store;
pub mod transaction;
pub mod transport;

pub use chain::Chain;
pub use client::Client;
pub use config::ClientConfig;
pub use error::{SdkError, SdkResult};
