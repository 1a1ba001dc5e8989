use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use super::cache::{SecretCache, shared_cache};
use super::env::{Environment, EnvironmentSource, ProcessEnv};
use super::error::MissingCredentials;
use super::file::{APP_NAME, ConfigFile, ConfigFileSource};
use super::record::{ConfigRecord, Credentials};
use super::secrets::{RemoteSecretSource, SecretStore, SecretsManagerStore};
use super::{Attempt, CredentialSource};

pub const DEFAULT_ACCOUNT: &str = "default";

/// Validated credentials for one account, resolved once at construction.
#[derive(Debug, Clone)]
pub struct CredentialResolver {
    account: String,
    credentials: Credentials,
}

impl CredentialResolver {
    pub fn builder(account: impl Into<String>) -> ResolverBuilder {
        ResolverBuilder {
            account: account.into(),
            explicit: None,
            sources: Vec::new(),
        }
    }

    /// Resolves `account` through the default chain: process environment,
    /// AWS Secrets Manager, then `credentials.yml`, sharing the process-wide
    /// cache.
    pub async fn from_environment(account: impl Into<String>) -> Result<Self, MissingCredentials> {
        let env: Arc<dyn Environment> = Arc::new(ProcessEnv);
        let config_path = ConfigFile::named_path(APP_NAME, env.as_ref());
        Self::builder(account)
            .default_sources(
                env,
                Arc::new(SecretsManagerStore::new()),
                shared_cache(),
                config_path,
            )
            .resolve()
            .await
    }

    /// Validates explicitly supplied credentials without consulting any source.
    pub fn from_explicit(
        account: impl Into<String>,
        record: ConfigRecord,
    ) -> Result<Self, MissingCredentials> {
        Ok(Self {
            account: account.into(),
            credentials: record.validate()?,
        })
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn into_credentials(self) -> Credentials {
        self.credentials
    }
}

/// Assembles the source chain for a [`CredentialResolver`].
pub struct ResolverBuilder {
    account: String,
    explicit: Option<ConfigRecord>,
    sources: Vec<Box<dyn CredentialSource>>,
}

impl ResolverBuilder {
    /// Supplies credentials directly; when set, no source is consulted.
    pub fn explicit(mut self, record: ConfigRecord) -> Self {
        self.explicit = Some(record);
        self
    }

    /// Appends a source to the end of the chain.
    pub fn source(mut self, source: impl CredentialSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Appends the standard environment, remote secret and config file sources.
    pub fn default_sources(
        self,
        env: Arc<dyn Environment>,
        store: Arc<dyn SecretStore>,
        cache: Arc<dyn SecretCache>,
        config_path: impl Into<PathBuf>,
    ) -> Self {
        self.source(EnvironmentSource::new(env.clone(), cache.clone()))
            .source(RemoteSecretSource::new(env, store, cache))
            .source(ConfigFileSource::new(config_path))
    }

    /// Runs the chain and returns the first complete credential set.
    pub async fn resolve(self) -> Result<CredentialResolver, MissingCredentials> {
        let account = self.account;

        if let Some(record) = self.explicit {
            debug!(account = %account, "Using explicitly supplied credentials");
            return CredentialResolver::from_explicit(account, record);
        }

        for source in &self.sources {
            match source.attempt(&account).await? {
                Attempt::Resolved(credentials) => {
                    info!(account = %account, source = source.name(), "Resolved credentials");
                    return Ok(CredentialResolver {
                        account,
                        credentials,
                    });
                }
                Attempt::Skipped => {
                    debug!(
                        account = %account,
                        source = source.name(),
                        "Credential source skipped"
                    );
                }
            }
        }

        Err(MissingCredentials::Unresolved)
    }
}
