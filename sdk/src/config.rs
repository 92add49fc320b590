//! # Client Configuration & Constants
//!
//! Every protocol constant the SDK relies on lives here, next to the
//! [`ClientConfig`] structure that a process loads exactly once and then hands
//! to the [`Client`](crate::client::Client), its chains, the crypto suite and
//! the transports by reference. Nothing in the crate reads configuration from
//! ambient global state.
//!
//! The file format is TOML:
//!
//! ```toml
//! [logging]
//! level = "info"
//!
//! [security]
//! enabled = true
//! hash_algorithm = "SHA2"
//! level = 256
//!
//! [msp]
//! id = "Org1MSP"
//! url = "http://localhost:7054"
//!
//! [orderer]
//! host = "localhost"
//! port = 7050
//!
//! [[peers]]
//! host = "localhost"
//! port = 7051
//! event_host = "localhost"
//! event_port = 7053
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Response Status
// ---------------------------------------------------------------------------

/// Application status an endorser reports when chaincode simulation succeeded.
/// Anything else is an endorsement failure, however well-formed the response.
pub const SUCCESS_STATUS: i32 = 200;

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// Signature scheme used for proposals and envelopes.
pub const SIGNING_ALGORITHM: &str = "Ed25519";

/// Hash family used to digest proposal and payload bytes before signing.
pub const DEFAULT_HASH_ALGORITHM: &str = "SHA2";

/// Digest size in bits. 256 selects SHA-256, 384 selects SHA-384.
pub const DEFAULT_SECURITY_LEVEL: u16 = 256;

/// Length of the random nonce placed in every signature header.
pub const NONCE_LENGTH: usize = 24;

// ---------------------------------------------------------------------------
// Timing Constants
// ---------------------------------------------------------------------------

/// Per-call budget for a single endorser or orderer exchange. A slow target
/// burns its own budget and never delays its siblings.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(3);

/// Budget for establishing the event stream with the event source peer.
pub const DEFAULT_EVENT_TIMEOUT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Wire Limits
// ---------------------------------------------------------------------------

/// Largest frame accepted on the TCP transports (16 MiB). A peer announcing
/// more than this is treated as a protocol error, not an allocation request.
pub const MAX_FRAME_LENGTH: usize = 16 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Membership
// ---------------------------------------------------------------------------

/// Number of transaction certificates requested per batch.
pub const DEFAULT_TCERT_BATCH_SIZE: usize = 200;

/// File extension used by the file-backed state store (one file per key).
pub const STATE_STORE_FILE_EXTENSION: &str = "json";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures while loading or validating a [`ClientConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Log filter settings consumed by the binary's subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Signing parameters. These are fixed per process, never negotiated per call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub enabled: bool,
    pub hash_algorithm: String,
    pub level: u16,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            hash_algorithm: DEFAULT_HASH_ALGORITHM.to_string(),
            level: DEFAULT_SECURITY_LEVEL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TcertConfig {
    pub batch_size: usize,
}

impl Default for TcertConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_TCERT_BATCH_SIZE,
        }
    }
}

/// Membership service provider settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MspConfig {
    /// Enrollment endpoint, e.g. `http://localhost:7054`.
    pub url: String,
    /// Organization identifier stamped into every serialized creator identity.
    pub id: String,
    /// Home directory handed to the enrollment client.
    pub client_path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeystoreConfig {
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrdererConfig {
    pub host: String,
    pub port: u16,
}

impl OrdererConfig {
    /// `host:port` address of the ordering node.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// One endorsing peer together with its event endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerConfig {
    pub host: String,
    pub port: u16,
    pub event_host: String,
    pub event_port: u16,
}

impl PeerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn event_address(&self) -> String {
        format!("{}:{}", self.event_host, self.event_port)
    }
}

/// Transport timeouts in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub call_ms: u64,
    pub event_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            call_ms: DEFAULT_CALL_TIMEOUT.as_millis() as u64,
            event_ms: DEFAULT_EVENT_TIMEOUT.as_millis() as u64,
        }
    }
}

impl TimeoutConfig {
    pub fn call(&self) -> Duration {
        Duration::from_millis(self.call_ms)
    }

    pub fn event(&self) -> Duration {
        Duration::from_millis(self.event_ms)
    }
}

/// How endorsements that all report success are reconciled with each other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadAgreement {
    /// Every response payload must be byte-identical to the first one.
    #[default]
    Strict,
    /// The first response payload is used as-is; the others only contribute
    /// their endorsement signatures.
    FirstResponse,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndorsementConfig {
    pub agreement: PayloadAgreement,
}

// ---------------------------------------------------------------------------
// ClientConfig
// ---------------------------------------------------------------------------

/// The parsed, immutable configuration shared by every SDK component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub logging: LoggingConfig,
    pub security: SecurityConfig,
    pub tcert: TcertConfig,
    pub msp: MspConfig,
    pub keystore: KeystoreConfig,
    pub orderer: OrdererConfig,
    pub peers: Vec<PeerConfig>,
    pub timeouts: TimeoutConfig,
    pub endorsement: EndorsementConfig,
}

impl ClientConfig {
    /// Reads and validates a TOML config file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&raw)?;
        tracing::info!(path = %path.display(), "using config file");
        Ok(config)
    }

    /// Parses and validates TOML text.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the settings that every component relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.security.level {
            256 | 384 => {}
            other => {
                return Err(ConfigError::Invalid(format!(
                    "unsupported security level {other}"
                )))
            }
        }
        if self.security.hash_algorithm.is_empty() {
            return Err(ConfigError::Invalid(
                "security.hash_algorithm is empty".to_string(),
            ));
        }
        if self.timeouts.call_ms == 0 {
            return Err(ConfigError::Invalid("timeouts.call_ms must be > 0".to_string()));
        }
        if self.timeouts.event_ms == 0 {
            return Err(ConfigError::Invalid("timeouts.event_ms must be > 0".to_string()));
        }
        Ok(())
    }

    /// Returns the configured peers, rejecting entries with missing endpoints.
    pub fn peers(&self) -> Result<Vec<PeerConfig>, ConfigError> {
        self.peers
            .iter()
            .enumerate()
            .map(|(i, p)| {
                if p.host.is_empty() {
                    return Err(ConfigError::Invalid(format!("peers[{i}]: host is empty")));
                }
                if p.port == 0 {
                    return Err(ConfigError::Invalid(format!("peers[{i}]: port is empty")));
                }
                if p.event_host.is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "peers[{i}]: event_host is empty"
                    )));
                }
                if p.event_port == 0 {
                    return Err(ConfigError::Invalid(format!(
                        "peers[{i}]: event_port is empty"
                    )));
                }
                Ok(p.clone())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [logging]
        level = "debug"

        [security]
        enabled = true
        hash_algorithm = "SHA2"
        level = 384

        [msp]
        id = "Org1MSP"
        url = "http://localhost:7054"

        [orderer]
        host = "localhost"
        port = 7050

        [[peers]]
        host = "localhost"
        port = 7051
        event_host = "localhost"
        event_port = 7053

        [endorsement]
        agreement = "first_response"
    "#;

    #[test]
    fn parses_all_sections() {
        let config = ClientConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.security.level, 384);
        assert_eq!(config.msp.id, "Org1MSP");
        assert_eq!(config.orderer.address(), "localhost:7050");
        assert_eq!(config.endorsement.agreement, PayloadAgreement::FirstResponse);

        let peers = config.peers().unwrap();
        assert_eq!(peers.len(), 1);
        assert_eq!(peers[0].address(), "localhost:7051");
        assert_eq!(peers[0].event_address(), "localhost:7053");
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let config = ClientConfig::from_toml_str("").unwrap();
        assert_eq!(config.security.level, DEFAULT_SECURITY_LEVEL);
        assert_eq!(config.tcert.batch_size, DEFAULT_TCERT_BATCH_SIZE);
        assert_eq!(config.timeouts.call(), DEFAULT_CALL_TIMEOUT);
        assert_eq!(config.endorsement.agreement, PayloadAgreement::Strict);
        assert!(config.peers().unwrap().is_empty());
    }

    #[test]
    fn rejects_unsupported_security_level() {
        let err = ClientConfig::from_toml_str("[security]\nlevel = 512\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn zero_timeouts_are_rejected() {
        for (toml, field) in [
            ("[timeouts]\ncall_ms = 0\n", "call_ms"),
            ("[timeouts]\nevent_ms = 0\n", "event_ms"),
        ] {
            let err = ClientConfig::from_toml_str(toml).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(ref m) if m.contains(field)), "{toml}");
        }
    }

    #[test]
    fn peer_without_event_host_is_rejected() {
        let config = ClientConfig::from_toml_str(
            "[[peers]]\nhost = \"localhost\"\nport = 7051\nevent_port = 7053\n",
        )
        .unwrap();
        let err = config.peers().unwrap_err();
        assert!(err.to_string().contains("event_host"));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = ClientConfig::from_file("/definitely/not/here.toml").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.toml"));
    }

    #[test]
    fn timing_constants_sanity() {
        assert!(DEFAULT_CALL_TIMEOUT < DEFAULT_EVENT_TIMEOUT);
        assert_eq!(SUCCESS_STATUS, 200);
    }
}
