//! # Client
//!
//! The session object. A [`Client`] owns the configuration, the crypto
//! suite, the optional state store and the current user context, and hands
//! all of that to the chains it creates through one shared
//! [`ClientContext`]. Chains keep an `Arc` to the context, never to the
//! client, so nothing here forms a reference cycle.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::chain::Chain;
use crate::config::ClientConfig;
use crate::crypto::{CryptoSuite, Ed25519Sha2Suite};
use crate::error::{SdkError, SdkResult};
use crate::identity::{EnrollmentService, User, UserRecord};
use crate::metrics::SdkMetrics;
use crate::protos::CodecError;
use crate::store::{FileKeyValueStore, KeyValueStore, StoreError};

/// State shared between a client and its chains.
pub struct ClientContext {
    config: ClientConfig,
    suite: Arc<dyn CryptoSuite>,
    metrics: SdkMetrics,
    state_store: RwLock<Option<Arc<dyn KeyValueStore>>>,
    user: RwLock<Option<Arc<User>>>,
}

impl ClientContext {
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn crypto_suite(&self) -> &Arc<dyn CryptoSuite> {
        &self.suite
    }

    pub fn metrics(&self) -> &SdkMetrics {
        &self.metrics
    }

    /// The current signer, or a configuration error when none is set.
    pub fn user_context(&self) -> SdkResult<Arc<User>> {
        self.user
            .read()
            .clone()
            .ok_or_else(|| SdkError::Configuration("user context is not set".to_string()))
    }
}

pub struct Client {
    context: Arc<ClientContext>,
    chains: RwLock<HashMap<String, Arc<Chain>>>,
}

impl Client {
    pub fn new(config: ClientConfig, suite: Arc<dyn CryptoSuite>) -> SdkResult<Self> {
        let metrics = SdkMetrics::new()
            .map_err(|e| SdkError::Configuration(format!("metrics registry: {e}")))?;
        tracing::info!(msp_id = %config.msp.id, "client created");
        Ok(Self {
            context: Arc::new(ClientContext {
                config,
                suite,
                metrics,
                state_store: RwLock::new(None),
                user: RwLock::new(None),
            }),
            chains: RwLock::new(HashMap::new()),
        })
    }

    /// Builds the stock suite from `config.security`, backing its key store
    /// with `keystore.path` when one is configured.
    pub fn from_config(config: ClientConfig) -> SdkResult<Self> {
        config.validate()?;
        let mut suite = Ed25519Sha2Suite::new(&config.security)?;
        if !config.keystore.path.is_empty() {
            let keystore = FileKeyValueStore::new(&config.keystore.path)?;
            suite = suite.with_key_store(Arc::new(keystore));
        }
        Self::new(config, Arc::new(suite))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.context.config
    }

    pub fn crypto_suite(&self) -> Arc<dyn CryptoSuite> {
        Arc::clone(&self.context.suite)
    }

    pub fn metrics(&self) -> &SdkMetrics {
        &self.context.metrics
    }

    // -- Chains -----------------------------------------------------------------

    /// Creates and registers a chain. Names are unique per client.
    pub fn new_chain(&self, name: &str) -> SdkResult<Arc<Chain>> {
        let mut chains = self.chains.write();
        if chains.contains_key(name) {
            return Err(SdkError::Configuration(format!("Chain {name} already exists")));
        }
        let chain = Arc::new(Chain::new(name, Arc::clone(&self.context))?);
        chains.insert(name.to_string(), Arc::clone(&chain));
        Ok(chain)
    }

    pub fn get_chain(&self, name: &str) -> Option<Arc<Chain>> {
        self.chains.read().get(name).cloned()
    }

    // -- State store & user context -----------------------------------------------

    pub fn set_state_store(&self, store: Arc<dyn KeyValueStore>) {
        *self.context.state_store.write() = Some(store);
    }

    pub fn state_store(&self) -> Option<Arc<dyn KeyValueStore>> {
        self.context.state_store.read().clone()
    }

    /// Makes `user` the signer for every chain of this client, persisting
    /// its record to the state store unless `skip_persistence` is set.
    pub fn set_user_context(&self, user: Arc<User>, skip_persistence: bool) -> SdkResult<()> {
        if user.name().is_empty() {
            return Err(SdkError::Validation("user name is empty".to_string()));
        }
        if !skip_persistence {
            let store = self
                .state_store()
                .ok_or_else(|| SdkError::Configuration("stateStore is nil".to_string()))?;
            let record = serde_json::to_vec(&user.to_record()).map_err(|e| CodecError::Encode {
                kind: "UserRecord",
                reason: e.to_string(),
            })?;
            store.set_value(user.name(), &record)?;
        }
        tracing::info!(user = user.name(), persisted = !skip_persistence, "user context set");
        *self.context.user.write() = Some(user);
        Ok(())
    }

    pub fn user_context(&self) -> Option<Arc<User>> {
        self.context.user.read().clone()
    }

    /// Returns the user named `name`, from memory or from the state store.
    /// A user restored from the store becomes the current user context.
    pub fn load_user_context(&self, name: &str) -> SdkResult<Option<Arc<User>>> {
        if name.is_empty() {
            return Err(SdkError::Validation("user name is empty".to_string()));
        }
        if let Some(user) = self.user_context().filter(|u| u.name() == name) {
            return Ok(Some(user));
        }

        let store = self
            .state_store()
            .ok_or_else(|| SdkError::Configuration("stateStore is nil".to_string()))?;
        let raw = match store.get_value(name) {
            Ok(raw) => raw,
            Err(StoreError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let record: UserRecord = serde_json::from_slice(&raw).map_err(|e| CodecError::Decode {
            kind: "UserRecord",
            reason: e.to_string(),
        })?;
        let user = Arc::new(User::from_record(record, self.context.suite.as_ref())?);

        *self.context.user.write() = Some(Arc::clone(&user));
        tracing::info!(user = name, "user context loaded from state store");
        Ok(Some(user))
    }

    /// Enrolls with the membership service, keeps the issued key in the
    /// crypto suite, and makes the result the current user context.
    pub async fn enroll_user(
        &self,
        service: &dyn EnrollmentService,
        enrollment_id: &str,
        enrollment_secret: &str,
    ) -> SdkResult<Arc<User>> {
        let enrollment = service.enroll(enrollment_id, enrollment_secret).await?;
        let key = self
            .context
            .suite
            .import_key(&enrollment.private_key.to_bytes(), false)?;
        let user = Arc::new(User::enrolled(enrollment_id, key, enrollment.certificate));

        let skip_persistence = self.state_store().is_none();
        self.set_user_context(Arc::clone(&user), skip_persistence)?;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::PrivateKey;
    use crate::identity::{Enrollment, EnrollmentError};
    use crate::store::SledKeyValueStore;
    use async_trait::async_trait;

    fn client() -> Client {
        Client::from_config(ClientConfig::default()).unwrap()
    }

    struct StaticEnrollment;

    #[async_trait]
    impl EnrollmentService for StaticEnrollment {
        async fn enroll(&self, id: &str, secret: &str) -> Result<Enrollment, EnrollmentError> {
            crate::identity::enrollment::check_credentials(id, secret)?;
            Ok(Enrollment {
                private_key: PrivateKey::generate(),
                certificate: format!("CERT-{id}").into_bytes(),
            })
        }
    }

    #[test]
    fn duplicate_chain_is_rejected() {
        let client = client();
        client.new_chain("mychannel").unwrap();
        let err = client.new_chain("mychannel").unwrap_err();
        assert_eq!(err.to_string(), "Chain mychannel already exists");
        assert!(client.get_chain("mychannel").is_some());
        assert!(client.get_chain("other").is_none());
    }

    #[test]
    fn chain_needs_a_name() {
        let err = client().new_chain("").unwrap_err();
        assert!(err.to_string().contains("Missing requirement 'name' parameter"));
    }

    #[test]
    fn persisting_user_requires_state_store() {
        let client = client();
        let user = Arc::new(User::new("alice"));
        let err = client.set_user_context(Arc::clone(&user), false).unwrap_err();
        assert_eq!(err.to_string(), "stateStore is nil");

        client.set_user_context(user, true).unwrap();
        assert_eq!(client.user_context().unwrap().name(), "alice");
    }

    #[tokio::test]
    async fn enrolled_user_survives_a_new_client() {
        let store: Arc<dyn KeyValueStore> = Arc::new(SledKeyValueStore::open_temporary().unwrap());
        let suite: Arc<dyn CryptoSuite> = Arc::new(
            Ed25519Sha2Suite::new(&Default::default())
                .unwrap()
                .with_key_store(Arc::clone(&store)),
        );

        let first = Client::new(ClientConfig::default(), Arc::clone(&suite)).unwrap();
        first.set_state_store(Arc::clone(&store));
        let enrolled = first
            .enroll_user(&StaticEnrollment, "admin", "adminpw")
            .await
            .unwrap();

        let second = Client::new(ClientConfig::default(), suite).unwrap();
        second.set_state_store(store);
        let loaded = second.load_user_context("admin").unwrap().unwrap();
        assert_eq!(*loaded, *enrolled);
        assert_eq!(loaded.enrollment_certificate(), b"CERT-admin");
        assert!(second.user_context().is_some());
    }

    #[test]
    fn unknown_user_loads_as_none() {
        let client = client();
        client.set_state_store(Arc::new(SledKeyValueStore::open_temporary().unwrap()));
        assert!(client.load_user_context("ghost").unwrap().is_none());
    }

    #[tokio::test]
    async fn enrollment_rejects_blank_secret() {
        let err = client()
            .enroll_user(&StaticEnrollment, "admin", "")
            .await
            .unwrap_err();
        assert!(matches!(err, SdkError::Enrollment(EnrollmentError::MissingField(_))));
    }
}
