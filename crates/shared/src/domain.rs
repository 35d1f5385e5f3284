use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sentinel label used when the service omits a classification.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Acknowledgement reported when the liveness body carries no `message`.
pub const DEFAULT_LIVENESS_MESSAGE: &str = "Backend OK";

const STRENGTH_MAX_HUNDREDTHS: u8 = 50;
const STRENGTH_DEFAULT_HUNDREDTHS: u8 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("perturbation strength must be a finite number")]
pub struct NonFiniteStrength;

/// Attack strength (epsilon), bounded to `[0, 0.5]` in steps of `0.01`.
///
/// Stored as whole hundredths so the decimal form sent to the service is exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "f64", try_from = "f64")]
pub struct PerturbationStrength {
    hundredths: u8,
}

impl PerturbationStrength {
    pub const MIN: f64 = 0.0;
    pub const MAX: f64 = 0.5;
    pub const STEP: f64 = 0.01;

    /// Clamps `value` into range and rounds it to the nearest step.
    pub fn from_f64(value: f64) -> Result<Self, NonFiniteStrength> {
        if value.is_nan() {
            return Err(NonFiniteStrength);
        }
        let clamped = value.clamp(Self::MIN, Self::MAX);
        let hundredths = (clamped * 100.0).round() as u8;
        Ok(Self {
            hundredths: hundredths.min(STRENGTH_MAX_HUNDREDTHS),
        })
    }

    pub fn value(self) -> f64 {
        f64::from(self.hundredths) / 100.0
    }

    pub fn hundredths(self) -> u8 {
        self.hundredths
    }

    /// Shortest decimal string, as submitted in the `epsilon` form field.
    pub fn to_wire_string(self) -> String {
        self.value().to_string()
    }
}

impl Default for PerturbationStrength {
    fn default() -> Self {
        Self {
            hundredths: STRENGTH_DEFAULT_HUNDREDTHS,
        }
    }
}

impl fmt::Display for PerturbationStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.value())
    }
}

impl From<PerturbationStrength> for f64 {
    fn from(value: PerturbationStrength) -> Self {
        value.value()
    }
}

impl TryFrom<f64> for PerturbationStrength {
    type Error = NonFiniteStrength;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::from_f64(value)
    }
}

/// A user-selected image held for preview and submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    file_name: String,
    mime_type: String,
    raw_bytes: Vec<u8>,
    preview_encoding: String,
}

impl UploadedImage {
    /// `preview_encoding` must be a lossless text form of `raw_bytes`; callers
    /// build it with the same bytes they hand over here.
    pub fn new(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        raw_bytes: Vec<u8>,
        preview_encoding: String,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            raw_bytes,
            preview_encoding,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn raw_bytes(&self) -> &[u8] {
        &self.raw_bytes
    }

    pub fn size_bytes(&self) -> usize {
        self.raw_bytes.len()
    }

    pub fn preview_encoding(&self) -> &str {
        &self.preview_encoding
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum ConnectivityStatus {
    #[default]
    Unknown,
    Connected(String),
    Disconnected,
}

impl ConnectivityStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected(_))
    }
}

impl fmt::Display for ConnectivityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => f.write_str("Checking..."),
            Self::Connected(message) => write!(f, "Connected: {message}"),
            Self::Disconnected => f.write_str("Disconnected - start the generation service"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Base64 image data exactly as returned by the service.
    pub adversarial_image_encoding: Option<String>,
    pub original_label: String,
    pub adversarial_label: String,
}

impl GenerationResult {
    pub fn adversarial_image_data_url(&self) -> Option<String> {
        self.adversarial_image_encoding
            .as_ref()
            .map(|encoded| format!("data:image/png;base64,{encoded}"))
    }

    /// True when the perturbation changed the predicted class.
    pub fn label_flipped(&self) -> bool {
        self.original_label != UNKNOWN_LABEL
            && self.adversarial_label != UNKNOWN_LABEL
            && self.original_label != self.adversarial_label
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum RequestLifecycleState {
    #[default]
    Idle,
    InFlight,
    Succeeded,
    Failed(String),
}

impl RequestLifecycleState {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::InFlight)
    }
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
