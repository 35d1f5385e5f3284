//! Text rendering of session state for the terminal.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use shared::{
    domain::{ConnectivityStatus, GenerationResult, PerturbationStrength},
    error::Notice,
};

#[derive(Debug, Serialize)]
pub struct GenerationReport<'a> {
    pub service_status: &'a ConnectivityStatus,
    pub file_name: &'a str,
    pub epsilon: PerturbationStrength,
    pub result: &'a GenerationResult,
    pub prediction_changed: bool,
}

pub fn status_line(status: &ConnectivityStatus) -> String {
    format!("Backend status: {status}")
}

pub fn report_text(report: &GenerationReport<'_>) -> String {
    let changed = if report.prediction_changed { "yes" } else { "no" };
    let image = if report.result.adversarial_image_encoding.is_some() {
        "received"
    } else {
        "not generated"
    };
    format!(
        "Image: {}\nAttack strength (epsilon): {}\nOriginal prediction: {}\nAdversarial prediction: {}\nPrediction changed: {changed}\nAdversarial image: {image}",
        report.file_name,
        report.epsilon,
        report.result.original_label,
        report.result.adversarial_label,
    )
}

pub fn notice_text(notice: &Notice) -> String {
    if notice.dismissible {
        format!("Error: {}", notice.message)
    } else {
        format!("Note: {}", notice.message)
    }
}

/// Writes the decoded adversarial image, refusing payloads that are not an
/// image format we recognise.
pub async fn write_adversarial_image(result: &GenerationResult, path: &Path) -> Result<()> {
    let encoded = result
        .adversarial_image_encoding
        .as_deref()
        .ok_or_else(|| anyhow!("the service did not return an adversarial image"))?;
    let bytes = STANDARD
        .decode(encoded)
        .context("adversarial image is not valid base64")?;
    image::guess_format(&bytes).context("adversarial image payload is not a known image format")?;
    tokio::fs::write(path, &bytes)
        .await
        .with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
