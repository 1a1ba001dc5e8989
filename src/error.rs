use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::credentials::MissingCredentials;

/// One entry of the `errors` array the API returns on failure.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub details: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorList {
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

fn describe(errors: &[ErrorDetail]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.code, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Credentials(#[from] MissingCredentials),

    #[error("a refresh token is required to call the Selling Partner API")]
    RefreshTokenRequired,

    #[error("access token exchange failed with status {status}: {body}")]
    TokenExchange { status: StatusCode, body: String },

    #[error("invalid resource identifier '{0}'")]
    InvalidIdentifier(String),

    #[error("bad request: {}", describe(.0))]
    BadRequest(Vec<ErrorDetail>),

    #[error("forbidden: {}", describe(.0))]
    Forbidden(Vec<ErrorDetail>),

    #[error("not found: {}", describe(.0))]
    NotFound(Vec<ErrorDetail>),

    #[error("request throttled: {}", describe(.0))]
    Throttled(Vec<ErrorDetail>),

    #[error("server error {status}: {}", describe(.errors))]
    Server {
        status: StatusCode,
        errors: Vec<ErrorDetail>,
    },

    #[error("unexpected status {status}: {}", describe(.errors))]
    Unexpected {
        status: StatusCode,
        errors: Vec<ErrorDetail>,
    },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("invalid header value: {0}")]
    Header(#[from] reqwest::header::InvalidHeaderValue),

    #[error("failed to decompress document: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// Maps a non-success response to an error, keeping the API's error list.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let errors = match serde_json::from_str::<ErrorList>(body) {
            Ok(list) if !list.errors.is_empty() => list.errors,
            _ => vec![ErrorDetail {
                code: status.as_str().to_string(),
                message: body.to_string(),
                details: None,
            }],
        };

        match status {
            StatusCode::BAD_REQUEST => ApiError::BadRequest(errors),
            StatusCode::FORBIDDEN => ApiError::Forbidden(errors),
            StatusCode::NOT_FOUND => ApiError::NotFound(errors),
            StatusCode::TOO_MANY_REQUESTS => ApiError::Throttled(errors),
            s if s.is_server_error() => ApiError::Server { status, errors },
            _ => ApiError::Unexpected { status, errors },
        }
    }

    pub fn is_throttled(&self) -> bool {
        matches!(self, ApiError::Throttled(_))
    }

    /// Error entries returned by the API, if the failure came from a response.
    pub fn errors(&self) -> &[ErrorDetail] {
        match self {
            ApiError::BadRequest(errors)
            | ApiError::Forbidden(errors)
            | ApiError::NotFound(errors)
            | ApiError::Throttled(errors)
            | ApiError::Server { errors, .. }
            | ApiError::Unexpected { errors, .. } => errors,
            _ => &[],
        }
    }
}
