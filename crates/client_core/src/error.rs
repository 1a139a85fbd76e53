use std::collections::BTreeMap;

use shared::error::{ApiError, ErrorCode};
use thiserror::Error;

/// Failure reported by the remote booking API or the transport in front of it.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("invalid response body: {0}")]
    Decode(String),
    #[error("unauthorized{}", describe(.0))]
    Unauthorized(ApiError),
    #[error("forbidden{}", describe(.0))]
    Forbidden(ApiError),
    #[error("not found{}", describe(.0))]
    NotFound(ApiError),
    #[error("validation failed{}", describe(.0))]
    Validation(ApiError),
    #[error("server returned status {status}{}", describe(.body))]
    Status { status: u16, body: ApiError },
}

fn describe(body: &ApiError) -> String {
    body.message
        .as_deref()
        .map(|message| format!(": {message}"))
        .unwrap_or_default()
}

impl GatewayError {
    pub fn from_status(status: u16, body: ApiError) -> Self {
        match ErrorCode::from_status(status) {
            ErrorCode::Unauthorized => Self::Unauthorized(body),
            ErrorCode::Forbidden => Self::Forbidden(body),
            ErrorCode::NotFound => Self::NotFound(body),
            ErrorCode::Validation => Self::Validation(body),
            ErrorCode::RateLimited | ErrorCode::Internal => Self::Status { status, body },
        }
    }

    /// Human-readable message supplied by the server, if any.
    ///
    /// Transport and decode failures never carry one; callers fall back to
    /// their own default text.
    pub fn user_message(&self) -> Option<&str> {
        self.body()
            .and_then(|body| body.message.as_deref())
            .filter(|message| !message.trim().is_empty())
    }

    pub fn field_errors(&self) -> Option<&BTreeMap<String, Vec<String>>> {
        match self {
            Self::Validation(body) => Some(&body.errors),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Transport(_) | Self::Decode(_) => None,
            Self::Unauthorized(_) => Some(ErrorCode::Unauthorized),
            Self::Forbidden(_) => Some(ErrorCode::Forbidden),
            Self::NotFound(_) => Some(ErrorCode::NotFound),
            Self::Validation(_) => Some(ErrorCode::Validation),
            Self::Status { status, .. } => Some(ErrorCode::from_status(*status)),
        }
    }

    fn body(&self) -> Option<&ApiError> {
        match self {
            Self::Transport(_) | Self::Decode(_) => None,
            Self::Unauthorized(body)
            | Self::Forbidden(body)
            | Self::NotFound(body)
            | Self::Validation(body)
            | Self::Status { body, .. } => Some(body),
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
