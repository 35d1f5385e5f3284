use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Validation,
    Precondition,
    Request,
    Decode,
    Cancelled,
}

impl ErrorCode {
    /// Failures that reach the user as a dismissible notice rather than
    /// being refused quietly.
    pub fn is_user_visible(self) -> bool {
        matches!(self, Self::Request | Self::Decode | Self::Cancelled)
    }
}

/// A failure notice handed to the presentation surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub code: ErrorCode,
    pub message: String,
    pub dismissible: bool,
}

impl Notice {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            dismissible: code.is_user_visible(),
        }
    }
}
