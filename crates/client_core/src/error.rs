use shared::error::{ErrorCode, Notice};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("invalid image selection: {0}")]
    Validation(String),
    #[error("request refused: {0}")]
    Precondition(String),
    #[error("{message}")]
    Request {
        status: Option<u16>,
        message: String,
    },
    #[error("malformed generation response: {0}")]
    Decode(String),
    #[error("request cancelled")]
    Cancelled,
}

impl ClientError {
    pub(crate) fn http_status(status: u16, detail: Option<String>) -> Self {
        let message = match detail {
            Some(detail) if !detail.is_empty() => format!("HTTP error! status: {status} ({detail})"),
            _ => format!("HTTP error! status: {status}"),
        };
        Self::Request {
            status: Some(status),
            message,
        }
    }

    pub(crate) fn transport(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "generation request timed out".to_string()
        } else if err.is_connect() {
            format!("generation service unreachable: {err}")
        } else {
            format!("generation request failed: {err}")
        };
        Self::Request {
            status: err.status().map(|status| status.as_u16()),
            message,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(_) => ErrorCode::Validation,
            Self::Precondition(_) => ErrorCode::Precondition,
            Self::Request { .. } => ErrorCode::Request,
            Self::Decode(_) => ErrorCode::Decode,
            Self::Cancelled => ErrorCode::Cancelled,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Request { status, .. } => *status,
            _ => None,
        }
    }

    pub fn is_user_visible(&self) -> bool {
        self.code().is_user_visible()
    }

    pub fn to_notice(&self) -> Notice {
        Notice::new(self.code(), self.to_string())
    }
}
