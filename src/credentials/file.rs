use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, warn};

use super::env::Environment;
use super::error::MissingCredentials;
use super::record::ConfigRecord;
use super::{Attempt, CredentialSource};

/// Directory name looked up under the platform config directory.
pub const APP_NAME: &str = "python-sp-api";

/// File name of the credentials document inside the app directory.
pub const FILE_NAME: &str = "credentials.yml";

/// Overrides the platform config directory when set.
pub const CONFIG_DIR_VAR: &str = "SP_API_CONFIG_DIR";

const XDG_CONFIG_HOME_VAR: &str = "XDG_CONFIG_HOME";

#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("config file {} not found", .0.display())]
    NotPresent(PathBuf),

    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

/// Per-account credential sections, stored as YAML (JSON also parses):
///
/// ```yaml
/// version: '1.0'
/// default:
///   refresh_token: Atzr|...
///   lwa_app_id: amzn1.application-oa2-client...
///   lwa_client_secret: ...
///   aws_access_key: AKIA...
///   aws_secret_key: ...
///   role_arn: arn:aws:iam::123456789012:role/sp-api
/// ```
///
/// Top-level entries that are not mappings (such as `version`) are ignored.
#[derive(Debug)]
pub struct ConfigFile {
    path: PathBuf,
    accounts: BTreeMap<String, serde_yaml::Value>,
}

impl ConfigFile {
    /// Path of `credentials.yml` for `app_name`.
    ///
    /// [`CONFIG_DIR_VAR`] wins outright. Otherwise the candidates are
    /// `$XDG_CONFIG_HOME`, `~/.config` and the platform config directory, in
    /// that order; the first one holding the file is used, else the first
    /// candidate.
    pub fn named_path(app_name: &str, env: &dyn Environment) -> PathBuf {
        if let Some(dir) = env.var(CONFIG_DIR_VAR).filter(|dir| !dir.is_empty()) {
            return PathBuf::from(dir).join(app_name).join(FILE_NAME);
        }

        let mut candidates: Vec<PathBuf> = Vec::new();
        let bases = [
            env.var(XDG_CONFIG_HOME_VAR)
                .filter(|dir| !dir.is_empty())
                .map(PathBuf::from),
            dirs::home_dir().map(|home| home.join(".config")),
            dirs::config_dir(),
        ];
        for base in bases.into_iter().flatten() {
            let path = base.join(app_name).join(FILE_NAME);
            if !candidates.contains(&path) {
                candidates.push(path);
            }
        }

        match candidates.iter().find(|path| path.is_file()) {
            Some(found) => found.clone(),
            None => candidates
                .into_iter()
                .next()
                .unwrap_or_else(|| PathBuf::from(".").join(app_name).join(FILE_NAME)),
        }
    }

    /// Loads the named config file from its default location.
    pub fn open_named(app_name: &str, env: &dyn Environment) -> Result<Self, ConfigFileError> {
        Self::load(Self::named_path(app_name, env))
    }

    /// Loads the document at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigFileError> {
        let path = path.as_ref().to_path_buf();
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ConfigFileError::NotPresent(path));
            }
            Err(source) => return Err(ConfigFileError::Read { path, source }),
        };

        let parse_error = |source| ConfigFileError::Parse {
            path: path.clone(),
            source,
        };
        let accounts: BTreeMap<String, serde_yaml::Value> =
            match serde_yaml::from_str::<serde_yaml::Value>(&content).map_err(parse_error)? {
                serde_yaml::Value::Null => BTreeMap::new(),
                document => serde_yaml::from_value(document).map_err(parse_error)?,
            };

        Ok(Self { path, accounts })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the credential section for `account`, if one is configured.
    pub fn section(&self, account: &str) -> Result<Option<ConfigRecord>, ConfigFileError> {
        match self.accounts.get(account) {
            Some(value @ serde_yaml::Value::Mapping(_)) => serde_yaml::from_value(value.clone())
                .map(Some)
                .map_err(|source| ConfigFileError::Parse {
                    path: self.path.clone(),
                    source,
                }),
            _ => Ok(None),
        }
    }

    /// Iterates over the names of all account sections.
    pub fn accounts(&self) -> impl Iterator<Item = &str> {
        self.accounts
            .iter()
            .filter(|(_, v)| v.is_mapping())
            .map(|(k, _)| k.as_str())
    }
}

/// Reads the account's section from a [`ConfigFile`].
///
/// As the last source of the default chain this never skips: every failure is
/// reported as [`MissingCredentials`].
pub struct ConfigFileSource {
    path: PathBuf,
}

impl ConfigFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CredentialSource for ConfigFileSource {
    fn name(&self) -> &'static str {
        "config-file"
    }

    async fn attempt(&self, account: &str) -> Result<Attempt, MissingCredentials> {
        let no_source = || MissingCredentials::NoSource {
            path: self.path.clone(),
        };

        let file = match ConfigFile::load(&self.path) {
            Ok(file) => file,
            Err(e @ ConfigFileError::NotPresent(_)) => {
                debug!(error = %e, "No config file");
                return Err(no_source());
            }
            Err(e) => {
                warn!(error = %e, "Config file unusable");
                return Err(no_source());
            }
        };

        let section = match file.section(account) {
            Ok(section) => section,
            Err(e) => {
                error!(account, error = %e, "Account section is malformed");
                let reason = match e {
                    ConfigFileError::Parse { source, .. } => source.to_string(),
                    other => other.to_string(),
                };
                return Err(MissingCredentials::MalformedAccount {
                    account: account.to_string(),
                    reason,
                });
            }
        };

        let Some(record) = section else {
            return Err(MissingCredentials::AccountNotConfigured {
                account: account.to_string(),
            });
        };

        record.validate().map(Attempt::Resolved)
    }
}
