use serde::{Deserialize, Serialize};

pub const LIVENESS_PATH: &str = "/";
pub const GENERATE_PATH: &str = "/generate-adversarial/";
pub const IMAGE_FIELD: &str = "image";
pub const EPSILON_FIELD: &str = "epsilon";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LivenessResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateAdversarialResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adversarial_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predictions: Option<Predictions>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Predictions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original: Option<Label>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adversarial: Option<Label>,
}

/// Class label as reported by the service; some backends send the digit as a
/// JSON number instead of a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Label {
    Text(String),
    Number(serde_json::Number),
}

impl Label {
    /// Returns `None` for an empty label so callers fall back to the sentinel.
    pub fn into_text(self) -> Option<String> {
        let text = match self {
            Self::Text(text) => text,
            Self::Number(number) => number.to_string(),
        };
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// Error body shape used by the service framework on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceErrorBody {
    pub detail: serde_json::Value,
}

impl ServiceErrorBody {
    pub fn detail_text(&self) -> String {
        match &self.detail {
            serde_json::Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
