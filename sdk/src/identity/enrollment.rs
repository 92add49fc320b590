//! # Enrollment
//!
//! Exchanging an enrollment id and secret for a signing key and certificate.
//! [`HttpEnrollmentClient`] speaks a small JSON API:
//!
//! ```text
//! POST {url}/api/v1/enroll   {"name": "...", "secret": "..."}
//! 200 OK                     {"private_key": "<hex>", "certificate": "<text>"}
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{MspConfig, DEFAULT_CALL_TIMEOUT};
use crate::crypto::PrivateKey;

#[derive(Debug, Error)]
pub enum EnrollmentError {
    #[error("{0} is empty")]
    MissingField(&'static str),

    #[error("http error: {0}")]
    Http(String),

    #[error("bad response: {0}")]
    BadResponse(String),
}

/// Credentials issued by the membership service.
#[derive(Debug, Clone)]
pub struct Enrollment {
    pub private_key: PrivateKey,
    pub certificate: Vec<u8>,
}

#[async_trait]
pub trait EnrollmentService: Send + Sync {
    async fn enroll(
        &self,
        enrollment_id: &str,
        enrollment_secret: &str,
    ) -> Result<Enrollment, EnrollmentError>;
}

/// Rejects blank credentials before anything leaves the process.
pub fn check_credentials(
    enrollment_id: &str,
    enrollment_secret: &str,
) -> Result<(), EnrollmentError> {
    if enrollment_id.is_empty() {
        return Err(EnrollmentError::MissingField("enrollmentID"));
    }
    if enrollment_secret.is_empty() {
        return Err(EnrollmentError::MissingField("enrollmentSecret"));
    }
    Ok(())
}

#[derive(Serialize)]
struct EnrollRequest<'a> {
    name: &'a str,
    secret: &'a str,
}

#[derive(Deserialize)]
struct EnrollResponse {
    private_key: String,
    certificate: String,
}

#[derive(Clone)]
pub struct HttpEnrollmentClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpEnrollmentClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, EnrollmentError> {
        Self::with_timeout(base_url, DEFAULT_CALL_TIMEOUT)
    }

    /// Bounds every request, connect included, by `timeout`.
    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, EnrollmentError> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .build()
            .map_err(|e| EnrollmentError::Http(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn from_config(msp: &MspConfig) -> Result<Self, EnrollmentError> {
        if msp.url.is_empty() {
            return Err(EnrollmentError::MissingField("msp.url"));
        }
        Self::new(msp.url.clone())
    }

    fn enroll_url(&self) -> String {
        format!("{}/api/v1/enroll", self.base_url)
    }
}

#[async_trait]
impl EnrollmentService for HttpEnrollmentClient {
    async fn enroll(
        &self,
        enrollment_id: &str,
        enrollment_secret: &str,
    ) -> Result<Enrollment, EnrollmentError> {
        check_credentials(enrollment_id, enrollment_secret)?;

        let resp = self
            .client
            .post(self.enroll_url())
            .json(&EnrollRequest {
                name: enrollment_id,
                secret: enrollment_secret,
            })
            .send()
            .await
            .map_err(|e| EnrollmentError::Http(e.to_string()))?;

        if resp.status() != StatusCode::OK {
            return Err(EnrollmentError::BadResponse(format!(
                "status={} body={:?}",
                resp.status(),
                resp.text().await.ok()
            )));
        }

        let body: EnrollResponse = resp
            .json()
            .await
            .map_err(|e| EnrollmentError::BadResponse(e.to_string()))?;
        let private_key = PrivateKey::from_hex(&body.private_key)
            .map_err(|_| EnrollmentError::BadResponse("private_key is not a valid key".into()))?;

        tracing::info!(enrollment_id, "enrolled with membership service");
        Ok(Enrollment {
            private_key,
            certificate: body.certificate.into_bytes(),
        })
    }
}
