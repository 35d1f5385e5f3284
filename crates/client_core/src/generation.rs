use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use shared::{
    domain::{
        GenerationResult, PerturbationStrength, RequestLifecycleState, UploadedImage,
        UNKNOWN_LABEL,
    },
    protocol::{GenerateAdversarialResponse, Label},
};
use tokio::sync::{broadcast, Notify};
use tracing::{info, warn};

use crate::{
    error::ClientError,
    transport::{GenerationRequest, GenerationService},
    ClientEvent,
};

#[derive(Default)]
struct GenerationState {
    lifecycle: RequestLifecycleState,
    result: Option<GenerationResult>,
    cancel_requested: bool,
}

/// Single-flight driver for generation requests.
///
/// A call made while another is in flight is refused, never queued. Only a
/// successful call writes the published result. The state lock is never held
/// across an await.
pub struct GenerationOrchestrator {
    service: Arc<dyn GenerationService>,
    state: Mutex<GenerationState>,
    cancel: Notify,
    events: broadcast::Sender<ClientEvent>,
}

/// Settles an `InFlight` lifecycle as cancelled if the `generate` future is
/// dropped before it finishes.
struct InFlightGuard<'a> {
    orchestrator: &'a GenerationOrchestrator,
    armed: bool,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.orchestrator.abandon();
        }
    }
}

impl GenerationOrchestrator {
    pub fn new(service: Arc<dyn GenerationService>, events: broadcast::Sender<ClientEvent>) -> Self {
        Self {
            service,
            state: Mutex::new(GenerationState::default()),
            cancel: Notify::new(),
            events,
        }
    }

    pub async fn generate(
        &self,
        image: Option<&UploadedImage>,
        strength: PerturbationStrength,
    ) -> Result<GenerationResult, ClientError> {
        let Some(image) = image else {
            return Err(ClientError::Precondition(
                "upload an image before generating".to_string(),
            ));
        };

        let cancelled = {
            let mut state = self.lock_state();
            if state.lifecycle.is_in_flight() {
                return Err(ClientError::Precondition(
                    "a generation request is already in flight".to_string(),
                ));
            }
            state.lifecycle = RequestLifecycleState::InFlight;
            state.cancel_requested = false;
            // Registered under the lock so `cancel` cannot slip in between.
            self.cancel.notified()
        };
        let mut guard = InFlightGuard {
            orchestrator: self,
            armed: true,
        };
        tokio::pin!(cancelled);

        info!(
            file_name = image.file_name(),
            size_bytes = image.size_bytes(),
            epsilon = %strength,
            "generation request started"
        );
        let _ = self.events.send(ClientEvent::GenerationStarted { strength });

        let request = GenerationRequest::new(image, strength);
        let outcome = tokio::select! {
            response = self.service.generate_adversarial(request) => response,
            _ = &mut cancelled => Err(ClientError::Cancelled),
        };
        guard.armed = false;
        self.finish(outcome)
    }

    /// Cancels the in-flight request, if any. Once this returns `true` the
    /// request settles as cancelled even if its reply has already arrived.
    pub fn cancel(&self) -> bool {
        let mut state = self.lock_state();
        if !state.lifecycle.is_in_flight() {
            return false;
        }
        state.cancel_requested = true;
        self.cancel.notify_waiters();
        true
    }

    pub fn lifecycle(&self) -> RequestLifecycleState {
        self.lock_state().lifecycle.clone()
    }

    pub fn result(&self) -> Option<GenerationResult> {
        self.lock_state().result.clone()
    }

    pub fn is_in_flight(&self) -> bool {
        self.lock_state().lifecycle.is_in_flight()
    }

    fn lock_state(&self) -> MutexGuard<'_, GenerationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn finish(
        &self,
        outcome: Result<GenerateAdversarialResponse, ClientError>,
    ) -> Result<GenerationResult, ClientError> {
        let mut state = self.lock_state();
        let merged = if std::mem::take(&mut state.cancel_requested) {
            Err(ClientError::Cancelled)
        } else {
            outcome.and_then(|response| merge_response(state.result.as_ref(), response))
        };
        match merged {
            Ok(result) => {
                state.lifecycle = RequestLifecycleState::Succeeded;
                state.result = Some(result.clone());
                drop(state);
                info!(
                    original = %result.original_label,
                    adversarial = %result.adversarial_label,
                    flipped = result.label_flipped(),
                    "generation request succeeded"
                );
                let _ = self
                    .events
                    .send(ClientEvent::GenerationSucceeded(result.clone()));
                Ok(result)
            }
            Err(err) => {
                state.lifecycle = RequestLifecycleState::Failed(err.to_string());
                drop(state);
                warn!(error = %err, status = ?err.status(), "generation request failed");
                let _ = self
                    .events
                    .send(ClientEvent::GenerationFailed(err.to_notice()));
                Err(err)
            }
        }
    }

    fn abandon(&self) {
        let mut state = self.lock_state();
        if !state.lifecycle.is_in_flight() {
            return;
        }
        let err = ClientError::Cancelled;
        state.lifecycle = RequestLifecycleState::Failed(err.to_string());
        state.cancel_requested = false;
        drop(state);
        warn!("generation request dropped before completion");
        let _ = self
            .events
            .send(ClientEvent::GenerationFailed(err.to_notice()));
    }
}

/// Builds the next result from a successful body. A missing image keeps the
/// prior one, a missing label becomes `Unknown`, and a missing `predictions`
/// object keeps the prior labels.
fn merge_response(
    prior: Option<&GenerationResult>,
    response: GenerateAdversarialResponse,
) -> Result<GenerationResult, ClientError> {
    let adversarial_image_encoding = match response.adversarial_image {
        Some(encoded) if !encoded.is_empty() => {
            STANDARD.decode(encoded.as_bytes()).map_err(|err| {
                ClientError::Decode(format!("adversarial_image is not valid base64: {err}"))
            })?;
            Some(encoded)
        }
        _ => prior.and_then(|result| result.adversarial_image_encoding.clone()),
    };

    let (original_label, adversarial_label) = match response.predictions {
        Some(predictions) => (
            label_or_unknown(predictions.original),
            label_or_unknown(predictions.adversarial),
        ),
        None => prior
            .map(|result| {
                (
                    result.original_label.clone(),
                    result.adversarial_label.clone(),
                )
            })
            .unwrap_or_else(|| (UNKNOWN_LABEL.to_string(), UNKNOWN_LABEL.to_string())),
    };

    Ok(GenerationResult {
        adversarial_image_encoding,
        original_label,
        adversarial_label,
    })
}

fn label_or_unknown(label: Option<Label>) -> String {
    label
        .and_then(Label::into_text)
        .unwrap_or_else(|| UNKNOWN_LABEL.to_string())
}

#[cfg(test)]
#[path = "tests/generation_tests.rs"]
mod tests;
