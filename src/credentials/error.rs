use std::path::PathBuf;
use thiserror::Error;

/// Credentials could not be resolved for an account.
///
/// Every failure of the resolution chain surfaces as this one error kind; the
/// variant only decides which message the caller sees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MissingCredentials {
    /// A source produced a record, but required fields were empty or absent.
    #[error("The following configuration parameters are missing: {}", .0.join(", "))]
    Fields(Vec<&'static str>),

    /// The config file exists but has no section for the account.
    #[error("The account {account} was not setup in your configuration file.")]
    AccountNotConfigured { account: String },

    /// The config file has a section for the account that cannot be read.
    #[error("The account {account} in your configuration file is malformed: {reason}")]
    MalformedAccount { account: String, reason: String },

    /// No environment variables, no remote secret and no readable config file.
    #[error(
        "Neither environment variables, a remote secret nor a config file were found. \
         Please set the correct variables, or use a config file ({}).",
        .path.display()
    )]
    NoSource { path: PathBuf },

    /// Every source skipped without reporting anything specific.
    #[error("Credentials are missing")]
    Unresolved,
}
