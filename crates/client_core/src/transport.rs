//! Boundary to the external generation service.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client,
};
use shared::{
    domain::{PerturbationStrength, UploadedImage},
    protocol::{
        GenerateAdversarialResponse, LivenessResponse, ServiceErrorBody, EPSILON_FIELD,
        GENERATE_PATH, IMAGE_FIELD, LIVENESS_PATH,
    },
};
use tracing::debug;
use url::Url;

use crate::error::ClientError;

pub const DEFAULT_SERVICE_URL: &str = "http://localhost:8000";

/// Everything the service needs for one generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub file_name: String,
    pub mime_type: String,
    pub image_bytes: Vec<u8>,
    pub epsilon: String,
}

impl GenerationRequest {
    pub fn new(image: &UploadedImage, strength: PerturbationStrength) -> Self {
        Self {
            file_name: image.file_name().to_string(),
            mime_type: image.mime_type().to_string(),
            image_bytes: image.raw_bytes().to_vec(),
            epsilon: strength.to_wire_string(),
        }
    }
}

#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn liveness(&self) -> Result<LivenessResponse>;
    async fn generate_adversarial(
        &self,
        request: GenerationRequest,
    ) -> std::result::Result<GenerateAdversarialResponse, ClientError>;
}

pub struct HttpGenerationService {
    http: Client,
    base_url: Url,
}

impl HttpGenerationService {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, None)
    }

    /// `timeout` bounds each whole request; `None` leaves it to the transport.
    pub fn with_timeout(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let base_url = normalize_base_url(base_url)?;
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .context("failed to build generation service http client")?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .with_context(|| format!("invalid endpoint path '{path}'"))
    }
}

fn normalize_base_url(raw: &str) -> Result<Url> {
    let mut url =
        Url::parse(raw.trim()).with_context(|| format!("invalid service url '{raw}'"))?;
    match url.scheme() {
        "http" | "https" => {}
        other => bail!("unsupported service url scheme '{other}' in '{raw}'"),
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[async_trait]
impl GenerationService for HttpGenerationService {
    async fn liveness(&self) -> Result<LivenessResponse> {
        let url = self.endpoint(LIVENESS_PATH)?;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .context("liveness request failed")?
            .error_for_status()?;
        response
            .json()
            .await
            .context("liveness response is not the expected JSON object")
    }

    async fn generate_adversarial(
        &self,
        request: GenerationRequest,
    ) -> std::result::Result<GenerateAdversarialResponse, ClientError> {
        let url = self
            .endpoint(GENERATE_PATH)
            .map_err(|err| ClientError::Request {
                status: None,
                message: err.to_string(),
            })?;
        let part = Part::bytes(request.image_bytes)
            .file_name(request.file_name)
            .mime_str(&request.mime_type)
            .map_err(|err| {
                ClientError::Validation(format!("invalid mime '{}': {err}", request.mime_type))
            })?;
        let form = Form::new()
            .part(IMAGE_FIELD, part)
            .text(EPSILON_FIELD, request.epsilon);

        let response = self
            .http
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(ClientError::transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ServiceErrorBody>(&body)
                .ok()
                .map(|body| body.detail_text());
            debug!(status = status.as_u16(), ?detail, "generation service returned an error status");
            return Err(ClientError::http_status(status.as_u16(), detail));
        }

        let body = response.bytes().await.map_err(ClientError::transport)?;
        serde_json::from_slice(&body).map_err(|err| ClientError::Decode(err.to_string()))
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
