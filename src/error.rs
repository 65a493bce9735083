// taskdesk/src/error.rs

use reqwest::StatusCode;
use serde::Deserialize;

/// Coarse classification of an [`ApiError`], used by front ends that only care
/// about which bucket a failure falls into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind { NetworkFailure, AuthorizationFailure, ValidationFailure, UnknownServerError, LocalFailure }

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("not authorized ({status}){}", fmt_message(.message))]
    Authorization { status: u16, message: Option<String> },
    #[error("{0}")]
    Validation(String),
    #[error("server error ({status}){}", fmt_message(.message))]
    Server { status: u16, message: Option<String> },
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
    /// The local session slot could not be written.
    #[error("session storage: {0:#}")]
    Storage(anyhow::Error),
}

fn fmt_message(message: &Option<String>) -> String {
    message.as_deref().map(|m| format!(": {m}")).unwrap_or_default()
}

#[derive(Deserialize)]
struct ErrorBody { message: Option<String> }

impl ApiError {
    /// Builds the error for a non-2xx response, pulling `message` out of a
    /// `{ "message": "..." }` body when there is one.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorBody>(body).ok()
            .and_then(|b| b.message)
            .filter(|m| !m.trim().is_empty());
        let status = status.as_u16();
        match status {
            401 | 403 => Self::Authorization { status, message },
            _ => Self::Server { status, message },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network(_) => ErrorKind::NetworkFailure,
            Self::Authorization { .. } => ErrorKind::AuthorizationFailure,
            Self::Validation(_) => ErrorKind::ValidationFailure,
            Self::Server { .. } | Self::Decode(_) => ErrorKind::UnknownServerError,
            Self::Storage(_) => ErrorKind::LocalFailure,
        }
    }

    /// Message meant for the user, if the failure carried one. Validation
    /// errors always do; server errors only when the body had a `message`.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Authorization { message, .. } | Self::Server { message, .. } => message.as_deref(),
            Self::Validation(m) => Some(m),
            Self::Network(_) | Self::Decode(_) | Self::Storage(_) => None,
        }
    }

    /// The message to show, falling back to `default` for the operation.
    pub fn user_message(&self, default: &str) -> String {
        self.message().unwrap_or(default).to_string()
    }
}
