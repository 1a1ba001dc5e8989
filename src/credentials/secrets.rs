use async_trait::async_trait;
use aws_sdk_secretsmanager::error::DisplayErrorContext;
use aws_sdk_secretsmanager::operation::get_secret_value::{
    GetSecretValueError, GetSecretValueOutput,
};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::cache::{ACCOUNT_DATA_KEY, SecretCache};
use super::env::{Environment, SECRET_ID_VAR};
use super::error::MissingCredentials;
use super::record::ConfigRecord;
use super::{Attempt, CredentialSource};

/// Failure to read a secret from a [`SecretStore`].
#[derive(Debug, Error)]
pub enum SecretStoreError {
    #[error("secret '{secret_id}' not found")]
    NotFound { secret_id: String },

    #[error("secret '{secret_id}' could not be read: {message}")]
    Access { secret_id: String, message: String },

    #[error("secret '{secret_id}' exists but has no string value")]
    Empty { secret_id: String },
}

/// Resolves a secret identifier into its plaintext (JSON) value.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn fetch(&self, secret_id: &str) -> Result<String, SecretStoreError>;
}

/// Resolves secrets from AWS Secrets Manager.
///
/// The SDK client is built on first use from the ambient AWS configuration
/// (env vars, profile, instance metadata), so constructing the store costs
/// nothing when no secret id is configured.
#[derive(Default)]
pub struct SecretsManagerStore {
    client: OnceCell<aws_sdk_secretsmanager::Client>,
}

impl SecretsManagerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store from an already loaded AWS configuration.
    pub fn from_config(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: OnceCell::new_with(Some(aws_sdk_secretsmanager::Client::new(config))),
        }
    }

    async fn client(&self) -> &aws_sdk_secretsmanager::Client {
        self.client
            .get_or_init(|| async {
                let config = aws_config::load_from_env().await;
                aws_sdk_secretsmanager::Client::new(&config)
            })
            .await
    }
}

#[async_trait]
impl SecretStore for SecretsManagerStore {
    async fn fetch(&self, secret_id: &str) -> Result<String, SecretStoreError> {
        let resp = self
            .client()
            .await
            .get_secret_value()
            .secret_id(secret_id)
            .send()
            .await
            .map_err(|e| {
                let message = DisplayErrorContext(&e).to_string();
                classify_error(secret_id, e.into_service_error(), message)
            })?;

        secret_string(secret_id, &resp)
    }
}

fn classify_error(
    secret_id: &str,
    err: GetSecretValueError,
    message: String,
) -> SecretStoreError {
    if err.is_resource_not_found_exception() {
        SecretStoreError::NotFound {
            secret_id: secret_id.to_string(),
        }
    } else {
        SecretStoreError::Access {
            secret_id: secret_id.to_string(),
            message,
        }
    }
}

fn secret_string(
    secret_id: &str,
    output: &GetSecretValueOutput,
) -> Result<String, SecretStoreError> {
    output
        .secret_string()
        .map(str::to_owned)
        .ok_or_else(|| SecretStoreError::Empty {
            secret_id: secret_id.to_string(),
        })
}

/// Shape of the JSON document stored in the remote secret.
#[derive(Debug, Deserialize)]
struct SecretPayload {
    #[serde(rename = "SP_API_REFRESH_TOKEN")]
    refresh_token: Option<String>,
    #[serde(rename = "LWA_APP_ID")]
    lwa_app_id: Option<String>,
    #[serde(rename = "LWA_CLIENT_SECRET")]
    lwa_client_secret: Option<String>,
    #[serde(rename = "SP_API_ACCESS_KEY")]
    aws_access_key: Option<String>,
    #[serde(rename = "SP_API_SECRET_KEY")]
    aws_secret_key: Option<String>,
    #[serde(rename = "SP_API_ROLE_ARN")]
    role_arn: Option<String>,
}

impl From<SecretPayload> for ConfigRecord {
    fn from(p: SecretPayload) -> Self {
        Self {
            refresh_token: p.refresh_token,
            lwa_app_id: p.lwa_app_id,
            lwa_client_secret: p.lwa_client_secret,
            aws_access_key: p.aws_access_key,
            aws_secret_key: p.aws_secret_key,
            role_arn: p.role_arn,
            use_instance_profile: None,
        }
    }
}

/// Fetches credentials from a [`SecretStore`] when [`SECRET_ID_VAR`] is set.
///
/// The decoded record is cached under [`ACCOUNT_DATA_KEY`] so later
/// environment lookups in the same process reuse it. Store failures and
/// undecodable payloads are skips, never errors.
pub struct RemoteSecretSource {
    env: Arc<dyn Environment>,
    store: Arc<dyn SecretStore>,
    cache: Arc<dyn SecretCache>,
}

impl RemoteSecretSource {
    pub fn new(
        env: Arc<dyn Environment>,
        store: Arc<dyn SecretStore>,
        cache: Arc<dyn SecretCache>,
    ) -> Self {
        Self { env, store, cache }
    }
}

#[async_trait]
impl CredentialSource for RemoteSecretSource {
    fn name(&self) -> &'static str {
        "remote-secret"
    }

    async fn attempt(&self, account: &str) -> Result<Attempt, MissingCredentials> {
        let Some(secret_id) = self.env.var(SECRET_ID_VAR).filter(|id| !id.is_empty()) else {
            debug!("{SECRET_ID_VAR} not set, skipping remote secret");
            return Ok(Attempt::Skipped);
        };

        let raw = match self.store.fetch(&secret_id).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(account, error = %e, "Remote secret unavailable");
                return Ok(Attempt::Skipped);
            }
        };

        let record: ConfigRecord = match serde_json::from_str::<SecretPayload>(&raw) {
            Ok(payload) => payload.into(),
            Err(e) => {
                warn!(
                    account,
                    secret_id = %secret_id,
                    error = %e,
                    "Remote secret is not valid JSON"
                );
                return Ok(Attempt::Skipped);
            }
        };

        match serde_json::to_string(&record) {
            Ok(json) => self.cache.put(ACCOUNT_DATA_KEY, json),
            Err(e) => warn!(error = %e, "Could not cache remote secret payload"),
        }

        match record.validate() {
            Ok(credentials) => {
                info!(account, secret_id = %secret_id, "Loaded credentials from remote secret");
                Ok(Attempt::Resolved(credentials))
            }
            Err(e) => {
                debug!(account, reason = %e, "Remote secret incomplete");
                Ok(Attempt::Skipped)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::cache::LruSecretCache;
    use aws_sdk_secretsmanager::types::error::{DecryptionFailure, ResourceNotFoundException};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeStore {
        result: Result<String, ()>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SecretStore for FakeStore {
        async fn fetch(&self, secret_id: &str) -> Result<String, SecretStoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone().map_err(|_| SecretStoreError::Access {
                secret_id: secret_id.to_string(),
                message: "AccessDeniedException".to_string(),
            })
        }
    }

    const PAYLOAD: &str = r#"{
        "SP_API_REFRESH_TOKEN": "Atzr|refresh",
        "LWA_APP_ID": "remote-app",
        "LWA_CLIENT_SECRET": "remote-client-secret",
        "SP_API_ACCESS_KEY": "AKIAREMOTE",
        "SP_API_SECRET_KEY": "remote-secret",
        "SP_API_ROLE_ARN": "arn:aws:iam::123456789012:role/sp"
    }"#;

    fn with_secret_id() -> Arc<dyn Environment> {
        Arc::new(HashMap::from([(
            SECRET_ID_VAR.to_string(),
            "prod/sp-api".to_string(),
        )]))
    }

    fn store(result: Result<&str, ()>) -> Arc<FakeStore> {
        Arc::new(FakeStore {
            result: result.map(str::to_string),
            calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_skips_without_secret_id() {
        let store = store(Ok(PAYLOAD));
        let source = RemoteSecretSource::new(
            Arc::new(HashMap::new()),
            store.clone(),
            Arc::new(LruSecretCache::default()),
        );

        assert!(matches!(source.attempt("default").await.unwrap(), Attempt::Skipped));
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_resolves_and_caches_payload() {
        let cache = Arc::new(LruSecretCache::default());
        let source = RemoteSecretSource::new(with_secret_id(), store(Ok(PAYLOAD)), cache.clone());

        match source.attempt("default").await.unwrap() {
            Attempt::Resolved(creds) => {
                assert_eq!(creds.lwa_app_id, "remote-app");
                assert_eq!(creds.aws_access_key, "AKIAREMOTE");
                assert_eq!(creds.refresh_token.as_deref(), Some("Atzr|refresh"));
            }
            Attempt::Skipped => panic!("expected credentials"),
        }

        let cached: ConfigRecord =
            serde_json::from_str(&cache.get(ACCOUNT_DATA_KEY).unwrap()).unwrap();
        assert_eq!(cached.lwa_app_id.as_deref(), Some("remote-app"));
    }

    #[tokio::test]
    async fn test_store_error_is_a_skip() {
        let cache = Arc::new(LruSecretCache::default());
        let source = RemoteSecretSource::new(with_secret_id(), store(Err(())), cache.clone());

        assert!(matches!(source.attempt("default").await.unwrap(), Attempt::Skipped));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_json_is_a_skip() {
        let source = RemoteSecretSource::new(
            with_secret_id(),
            store(Ok("not-json")),
            Arc::new(LruSecretCache::default()),
        );
        assert!(matches!(source.attempt("default").await.unwrap(), Attempt::Skipped));
    }

    #[tokio::test]
    async fn test_incomplete_payload_is_cached_but_skipped() {
        let cache = Arc::new(LruSecretCache::default());
        let source = RemoteSecretSource::new(
            with_secret_id(),
            store(Ok(r#"{"LWA_APP_ID": "only-app"}"#)),
            cache.clone(),
        );

        assert!(matches!(source.attempt("default").await.unwrap(), Attempt::Skipped));
        assert!(cache.get(ACCOUNT_DATA_KEY).is_some());
    }

    #[test]
    fn test_missing_secret_is_not_found() {
        let err = GetSecretValueError::ResourceNotFoundException(
            ResourceNotFoundException::builder()
                .message("Secrets Manager can't find the specified secret.")
                .build(),
        );
        assert!(matches!(
            classify_error("prod/sp-api", err, "not found".to_string()),
            SecretStoreError::NotFound { secret_id } if secret_id == "prod/sp-api"
        ));
    }

    #[test]
    fn test_other_service_errors_are_access_failures() {
        let err = GetSecretValueError::DecryptionFailure(
            DecryptionFailure::builder().message("KMS key disabled").build(),
        );
        let message = "DecryptionFailure: KMS key disabled".to_string();
        match classify_error("prod/sp-api", err, message) {
            SecretStoreError::Access { secret_id, message } => {
                assert_eq!(secret_id, "prod/sp-api");
                assert!(message.contains("KMS key disabled"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_secret_without_string_is_empty() {
        let output = GetSecretValueOutput::builder().name("prod/sp-api").build();
        assert!(matches!(
            secret_string("prod/sp-api", &output),
            Err(SecretStoreError::Empty { .. })
        ));

        let output = GetSecretValueOutput::builder().secret_string(PAYLOAD).build();
        assert_eq!(secret_string("prod/sp-api", &output).unwrap(), PAYLOAD);
    }
}
