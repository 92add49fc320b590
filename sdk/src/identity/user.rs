//! # Users
//!
//! A [`User`] is the principal that signs proposals and envelopes: a name,
//! some roles, an enrollment certificate, and (once enrolled) a private key.
//!
//! Persistence goes through [`UserRecord`], which carries the key's SKI and
//! never the key itself. Restoring a user resolves the SKI against the crypto
//! suite's key store.

use serde::{Deserialize, Serialize};

use crate::crypto::{CryptoSuite, PrivateKey};
use crate::error::{SdkError, SdkResult};
use crate::protos::{CodecError, Message, SerializedIdentity};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    name: String,
    roles: Vec<String>,
    private_key: Option<PrivateKey>,
    enrollment_certificate: Vec<u8>,
}

/// What the state store keeps for a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub name: String,
    pub roles: Vec<String>,
    /// Hex-encoded certificate bytes.
    pub enrollment_certificate: String,
    /// Hex-encoded SKI of the private key, absent when not enrolled.
    pub ski: Option<String>,
}

impl User {
    /// An unenrolled user.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            roles: Vec::new(),
            private_key: None,
            enrollment_certificate: Vec::new(),
        }
    }

    /// A user holding an enrollment from the membership service.
    pub fn enrolled(
        name: impl Into<String>,
        private_key: PrivateKey,
        enrollment_certificate: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            roles: Vec::new(),
            private_key: Some(private_key),
            enrollment_certificate,
        }
    }

    pub fn with_roles(mut self, roles: Vec<String>) -> Self {
        self.roles = roles;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    pub fn enrollment_certificate(&self) -> &[u8] {
        &self.enrollment_certificate
    }

    pub fn is_enrolled(&self) -> bool {
        self.private_key.is_some()
    }

    /// The signing key, or a configuration error for unenrolled users.
    pub fn private_key(&self) -> SdkResult<&PrivateKey> {
        self.private_key.as_ref().ok_or_else(|| {
            SdkError::Configuration(format!("user '{}' is not enrolled", self.name))
        })
    }

    /// The creator bytes placed in signature headers.
    pub fn serialized_identity(&self, msp_id: &str) -> Result<Vec<u8>, CodecError> {
        SerializedIdentity {
            msp_id: msp_id.to_string(),
            id_bytes: self.enrollment_certificate.clone(),
        }
        .to_bytes()
    }

    pub fn to_record(&self) -> UserRecord {
        UserRecord {
            name: self.name.clone(),
            roles: self.roles.clone(),
            enrollment_certificate: hex::encode(&self.enrollment_certificate),
            ski: self.private_key.as_ref().map(|k| hex::encode(k.ski())),
        }
    }

    /// Rebuilds a user, fetching its key from `suite` by SKI.
    pub fn from_record(record: UserRecord, suite: &dyn CryptoSuite) -> SdkResult<Self> {
        let enrollment_certificate = hex::decode(&record.enrollment_certificate).map_err(|e| {
            SdkError::Validation(format!("user '{}': bad certificate encoding: {e}", record.name))
        })?;
        let private_key = match &record.ski {
            Some(ski_hex) => {
                let ski = hex::decode(ski_hex).map_err(|e| {
                    SdkError::Validation(format!("user '{}': bad ski encoding: {e}", record.name))
                })?;
                Some(suite.get_key(&ski)?)
            }
            None => None,
        };
        Ok(Self {
            name: record.name,
            roles: record.roles,
            private_key,
            enrollment_certificate,
        })
    }
}
