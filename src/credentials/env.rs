use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use super::cache::{ACCOUNT_DATA_KEY, SecretCache};
use super::error::MissingCredentials;
use super::record::ConfigRecord;
use super::{Attempt, CredentialSource};

pub const REFRESH_TOKEN_VAR: &str = "SP_API_REFRESH_TOKEN";
pub const LWA_APP_ID_VAR: &str = "LWA_APP_ID";
pub const LWA_CLIENT_SECRET_VAR: &str = "LWA_CLIENT_SECRET";
pub const ACCESS_KEY_VAR: &str = "SP_API_ACCESS_KEY";
pub const SECRET_KEY_VAR: &str = "SP_API_SECRET_KEY";
pub const ROLE_ARN_VAR: &str = "SP_API_ROLE_ARN";

/// Names the remote secret holding the credential payload.
pub const SECRET_ID_VAR: &str = "SP_API_AWS_SECRET_ID";

/// Read-only view of environment variables.
pub trait Environment: Send + Sync {
    fn var(&self, name: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl Environment for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl Environment for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Reads credentials from `<VAR>_<account>`, falling back to `<VAR>`.
///
/// A remote payload previously stored in the cache under
/// [`ACCOUNT_DATA_KEY`] takes precedence over the environment entirely.
pub struct EnvironmentSource {
    env: Arc<dyn Environment>,
    cache: Arc<dyn SecretCache>,
}

impl EnvironmentSource {
    pub fn new(env: Arc<dyn Environment>, cache: Arc<dyn SecretCache>) -> Self {
        Self { env, cache }
    }

    fn scoped(&self, key: &str, account: &str) -> Option<String> {
        self.env
            .var(&format!("{key}_{account}"))
            .or_else(|| self.env.var(key))
    }

    fn from_cache(&self) -> Option<ConfigRecord> {
        let payload = self.cache.get(ACCOUNT_DATA_KEY)?;
        match serde_json::from_str(&payload) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(error = %e, "Ignoring undecodable cached secret payload");
                None
            }
        }
    }

    fn from_env(&self, account: &str) -> ConfigRecord {
        ConfigRecord {
            refresh_token: self.scoped(REFRESH_TOKEN_VAR, account),
            lwa_app_id: self.scoped(LWA_APP_ID_VAR, account),
            lwa_client_secret: self.scoped(LWA_CLIENT_SECRET_VAR, account),
            aws_access_key: self.scoped(ACCESS_KEY_VAR, account),
            aws_secret_key: self.scoped(SECRET_KEY_VAR, account),
            role_arn: self.scoped(ROLE_ARN_VAR, account),
            use_instance_profile: None,
        }
    }
}

#[async_trait]
impl CredentialSource for EnvironmentSource {
    fn name(&self) -> &'static str {
        "environment"
    }

    async fn attempt(&self, account: &str) -> Result<Attempt, MissingCredentials> {
        let record = match self.from_cache() {
            Some(record) => {
                debug!(account, "Using cached remote secret payload");
                record
            }
            None => self.from_env(account),
        };

        match record.validate() {
            Ok(credentials) => Ok(Attempt::Resolved(credentials)),
            Err(e) => {
                debug!(account, reason = %e, "Environment credentials incomplete");
                Ok(Attempt::Skipped)
            }
        }
    }
}
