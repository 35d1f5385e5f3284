//! Scripted `GenerationService` and image fixtures shared by the unit tests.

use std::{
    collections::VecDeque,
    io::Cursor,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use shared::{
    domain::UploadedImage,
    protocol::{GenerateAdversarialResponse, Label, LivenessResponse, Predictions},
};
use tokio::sync::oneshot;

use crate::{
    error::ClientError,
    ingest::preview_data_url,
    transport::{GenerationRequest, GenerationService},
};

/// Recovers the bytes behind a preview produced by `preview_data_url`.
pub(crate) fn decode_preview(preview: &str) -> Option<Vec<u8>> {
    let (_, payload) = preview.strip_prefix("data:")?.split_once(";base64,")?;
    STANDARD.decode(payload).ok()
}

/// Stands in where no service is wired; every call fails.
pub(crate) struct MissingGenerationService;

#[async_trait]
impl GenerationService for MissingGenerationService {
    async fn liveness(&self) -> Result<LivenessResponse> {
        Err(anyhow!("generation service is not configured"))
    }

    async fn generate_adversarial(
        &self,
        _request: GenerationRequest,
    ) -> std::result::Result<GenerateAdversarialResponse, ClientError> {
        Err(ClientError::Request {
            status: None,
            message: "generation service is not configured".to_string(),
        })
    }
}

type LivenessReply = Result<LivenessResponse>;
type GenerateReply = std::result::Result<GenerateAdversarialResponse, ClientError>;

enum Scripted<T> {
    Ready(T),
    Gated(oneshot::Receiver<T>),
}

impl<T> Scripted<T> {
    async fn resolve(self) -> T {
        match self {
            Self::Ready(value) => value,
            Self::Gated(rx) => rx.await.expect("scripted reply gate dropped"),
        }
    }
}

#[derive(Default)]
pub(crate) struct ScriptedService {
    liveness_replies: Mutex<VecDeque<Scripted<LivenessReply>>>,
    generate_replies: Mutex<VecDeque<Scripted<GenerateReply>>>,
    liveness_calls: AtomicUsize,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedService {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_liveness(&self, reply: LivenessReply) {
        self.liveness_replies
            .lock()
            .expect("liveness script")
            .push_back(Scripted::Ready(reply));
    }

    pub(crate) fn gate_liveness(&self) -> oneshot::Sender<LivenessReply> {
        let (tx, rx) = oneshot::channel();
        self.liveness_replies
            .lock()
            .expect("liveness script")
            .push_back(Scripted::Gated(rx));
        tx
    }

    pub(crate) fn push_generate(&self, reply: GenerateReply) {
        self.generate_replies
            .lock()
            .expect("generate script")
            .push_back(Scripted::Ready(reply));
    }

    pub(crate) fn gate_generate(&self) -> oneshot::Sender<GenerateReply> {
        let (tx, rx) = oneshot::channel();
        self.generate_replies
            .lock()
            .expect("generate script")
            .push_back(Scripted::Gated(rx));
        tx
    }

    pub(crate) fn liveness_calls(&self) -> usize {
        self.liveness_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn generate_calls(&self) -> usize {
        self.requests.lock().expect("requests").len()
    }

    pub(crate) fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().expect("requests").clone()
    }
}

#[async_trait]
impl GenerationService for ScriptedService {
    async fn liveness(&self) -> Result<LivenessResponse> {
        self.liveness_calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .liveness_replies
            .lock()
            .expect("liveness script")
            .pop_front();
        match next {
            Some(reply) => reply.resolve().await,
            None => Err(anyhow!("no scripted liveness reply")),
        }
    }

    async fn generate_adversarial(&self, request: GenerationRequest) -> GenerateReply {
        self.requests.lock().expect("requests").push(request);
        let next = self
            .generate_replies
            .lock()
            .expect("generate script")
            .pop_front();
        match next {
            Some(reply) => reply.resolve().await,
            None => Err(ClientError::http_status(503, None)),
        }
    }
}

pub(crate) fn adversarial_response(
    image: Option<&str>,
    original: Option<&str>,
    adversarial: Option<&str>,
) -> GenerateAdversarialResponse {
    GenerateAdversarialResponse {
        adversarial_image: image.map(str::to_string),
        predictions: Some(Predictions {
            original: original.map(|label| Label::Text(label.to_string())),
            adversarial: adversarial.map(|label| Label::Text(label.to_string())),
        }),
    }
}

pub(crate) fn sample_png() -> Vec<u8> {
    let digit = image::GrayImage::from_fn(28, 28, |x, y| image::Luma([((x + y) * 4) as u8]));
    let mut bytes = Vec::new();
    digit
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("encode png");
    bytes
}

pub(crate) fn sample_image() -> UploadedImage {
    let bytes = sample_png();
    let preview = preview_data_url("image/png", &bytes);
    UploadedImage::new("seven.png", "image/png", bytes, preview)
}

pub(crate) async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..10_000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}
