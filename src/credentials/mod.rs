//! Credential resolution for the Selling Partner API.
//!
//! [`ConfigRecord`] is the raw field set a source produces; validating it
//! yields [`Credentials`]. [`CredentialSource`] is the trait every lookup
//! strategy implements, and [`CredentialResolver`] walks an ordered list of
//! sources until one produces a complete record:
//!
//! 1. [`EnvironmentSource`]: cached remote payload, else `<VAR>_<account>` / `<VAR>`.
//! 2. [`RemoteSecretSource`]: AWS Secrets Manager via [`SecretsManagerStore`].
//! 3. [`ConfigFileSource`]: the account's section of `credentials.yml`.

mod cache;
mod env;
mod error;
mod file;
mod record;
mod resolver;
mod secrets;

pub use cache::{ACCOUNT_DATA_KEY, DEFAULT_CAPACITY, LruSecretCache, SecretCache, shared_cache};
pub use env::{
    ACCESS_KEY_VAR, Environment, EnvironmentSource, LWA_APP_ID_VAR, LWA_CLIENT_SECRET_VAR,
    ProcessEnv, REFRESH_TOKEN_VAR, ROLE_ARN_VAR, SECRET_ID_VAR, SECRET_KEY_VAR,
};
pub use error::MissingCredentials;
pub use file::{APP_NAME, CONFIG_DIR_VAR, ConfigFile, ConfigFileError, ConfigFileSource, FILE_NAME};
pub use record::{ConfigRecord, Credentials};
pub use resolver::{CredentialResolver, DEFAULT_ACCOUNT, ResolverBuilder};
pub use secrets::{RemoteSecretSource, SecretStore, SecretStoreError, SecretsManagerStore};

use async_trait::async_trait;

/// Outcome of a single source attempt that did not fail outright.
#[derive(Debug)]
pub enum Attempt {
    /// The source produced a complete credential set.
    Resolved(Credentials),
    /// The source had nothing usable; the next source should be tried.
    Skipped,
}

/// One way of looking up credentials for an account.
///
/// Returning `Err` stops the chain; [`Attempt::Skipped`] lets it continue.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &'static str;

    async fn attempt(&self, account: &str) -> Result<Attempt, MissingCredentials>;
}
