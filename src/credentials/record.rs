use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value;
use std::fmt;

use super::error::MissingCredentials;

/// Raw credential fields as read from a single source.
///
/// Every field is optional here; [`ConfigRecord::validate`] decides whether the
/// record is usable. The serde names are the ones used in `credentials.yml`
/// and in the cached remote payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigRecord {
    #[serde(default, deserialize_with = "scalar_string")]
    pub refresh_token: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub lwa_app_id: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub lwa_client_secret: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub aws_access_key: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub aws_secret_key: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub role_arn: Option<String>,
    #[serde(default, deserialize_with = "scalar_bool")]
    pub use_instance_profile: Option<bool>,
}

/// Accepts any scalar and keeps its text: YAML reads unquoted values such as
/// `1234567` or `9e40` as numbers.
fn scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(_) => Err(D::Error::custom("expected a scalar value")),
    }
}

/// Accepts booleans plus their usual spellings (`yes`, `off`, `1`, ...).
fn scalar_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(b)),
        Some(Value::Number(n)) => Ok(Some(n.as_f64().is_some_and(|v| v != 0.0))),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(Some(true)),
            "false" | "no" | "off" | "0" | "" => Ok(Some(false)),
            _ => Err(D::Error::custom(format!("expected a boolean, found '{s}'"))),
        },
        Some(_) => Err(D::Error::custom("expected a boolean")),
    }
}

impl ConfigRecord {
    /// Names of the required fields that are absent or empty, in declaration order.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("lwa_app_id", &self.lwa_app_id),
            ("lwa_client_secret", &self.lwa_client_secret),
            ("aws_access_key", &self.aws_access_key),
            ("aws_secret_key", &self.aws_secret_key),
        ]
        .into_iter()
        .filter(|(_, value)| value.as_deref().is_none_or(str::is_empty))
        .map(|(name, _)| name)
        .collect()
    }

    /// Converts the record into [`Credentials`], failing with the missing field names.
    pub fn validate(self) -> Result<Credentials, MissingCredentials> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(MissingCredentials::Fields(missing));
        }

        Ok(Credentials {
            refresh_token: self.refresh_token.filter(|v| !v.is_empty()),
            lwa_app_id: self.lwa_app_id.unwrap_or_default(),
            lwa_client_secret: self.lwa_client_secret.unwrap_or_default(),
            aws_access_key: self.aws_access_key.unwrap_or_default(),
            aws_secret_key: self.aws_secret_key.unwrap_or_default(),
            role_arn: self.role_arn.filter(|v| !v.is_empty()),
            use_instance_profile: self.use_instance_profile,
        })
    }
}

/// A validated credential set: every required field is non-empty.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub refresh_token: Option<String>,
    pub lwa_app_id: String,
    pub lwa_client_secret: String,
    pub aws_access_key: String,
    pub aws_secret_key: String,
    pub role_arn: Option<String>,
    pub use_instance_profile: Option<bool>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "***"))
            .field("lwa_app_id", &self.lwa_app_id)
            .field("lwa_client_secret", &"***")
            .field("aws_access_key", &self.aws_access_key)
            .field("aws_secret_key", &"***")
            .field("role_arn", &self.role_arn)
            .field("use_instance_profile", &self.use_instance_profile)
            .finish()
    }
}
