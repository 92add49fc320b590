//! # SDK Errors
//!
//! One error type for the whole submission pipeline. Module-level errors
//! (crypto, store, codec, enrollment, transport) keep their own `thiserror`
//! enums and are wrapped here, so callers match on a single type while the
//! lower layers stay independent of each other.
//!
//! Only precondition failures come back as `Err` from the fan-out
//! operations. A peer that is down or an orderer that refuses a transaction
//! is recorded as an entry in the per-target result map instead, because the
//! caller usually wants to see every target's outcome side by side.

use thiserror::Error;

use crate::config::ConfigError;
use crate::crypto::CryptoError;
use crate::identity::EnrollmentError;
use crate::protos::CodecError;
use crate::store::StoreError;
use crate::transport::TransportError;

#[derive(Debug, Error)]
pub enum SdkError {
    /// Missing or contradictory setup: no targets, no orderers, no user
    /// context, duplicate chain, etc.
    #[error("{0}")]
    Configuration(String),

    /// A request or message failed a structural check before anything was
    /// sent over the wire.
    #[error("{0}")]
    Validation(String),

    /// A remote call failed at the transport level.
    #[error("Error calling '{target}': {source}")]
    Transport {
        target: String,
        #[source]
        source: TransportError,
    },

    /// An endorser answered, but with a non-success status.
    #[error("Proposal response was not successful, error code {status}, msg {message}")]
    EndorsementStatus { status: i32, message: String },

    #[error("At least one proposal response is necessary")]
    EmptyEndorsementSet,

    /// The endorsements could not be turned into a transaction.
    #[error("{0}")]
    Assembly(String),

    /// An orderer did not accept the broadcast envelope.
    #[error("orderer '{orderer}' rejected broadcast: {reason}")]
    Ordering { orderer: String, reason: String },

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("state store error: {0}")]
    Store(#[from] StoreError),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("enrollment error: {0}")]
    Enrollment(#[from] EnrollmentError),
}

impl From<ConfigError> for SdkError {
    fn from(err: ConfigError) -> Self {
        SdkError::Configuration(err.to_string())
    }
}

pub type SdkResult<T> = Result<T, SdkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endorsement_status_message_carries_code_and_text() {
        let err = SdkError::EndorsementStatus {
            status: 500,
            message: "chaincode panicked".into(),
        };
        assert_eq!(
            err.to_string(),
            "Proposal response was not successful, error code 500, msg chaincode panicked"
        );
    }

    #[test]
    fn config_errors_become_configuration_errors() {
        let err: SdkError = ConfigError::Invalid("bad".into()).into();
        assert!(matches!(err, SdkError::Configuration(ref m) if m.contains("bad")));
    }

    #[test]
    fn transport_error_names_the_target() {
        let err = SdkError::Transport {
            target: "peer0:7051".into(),
            source: TransportError::Closed,
        };
        assert!(err.to_string().contains("peer0:7051"));
    }
}
