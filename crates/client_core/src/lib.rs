use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::Result;
use shared::{
    domain::{ConnectivityStatus, GenerationResult, PerturbationStrength},
    error::Notice,
};
use tokio::sync::broadcast;
use tracing::info;

pub mod connectivity;
pub mod error;
pub mod generation;
pub mod ingest;
pub mod params;
pub mod transport;

pub use connectivity::ConnectivityMonitor;
pub use error::ClientError;
pub use generation::GenerationOrchestrator;
pub use ingest::{FileSelection, ImageIngestor};
pub use params::ParameterController;
pub use transport::{
    GenerationRequest, GenerationService, HttpGenerationService, DEFAULT_SERVICE_URL,
};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// State changes pushed to whatever renders the session.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    ConnectivityChanged(ConnectivityStatus),
    GenerationStarted { strength: PerturbationStrength },
    GenerationSucceeded(GenerationResult),
    GenerationFailed(Notice),
}

/// Composition root owning one of each component. The connectivity monitor
/// and the generation orchestrator share a service but never each other's
/// state: a `Disconnected` status does not gate `generate`.
pub struct AdversarialSession {
    ingestor: ImageIngestor,
    parameters: ParameterController,
    connectivity: ConnectivityMonitor,
    generation: GenerationOrchestrator,
    initialized: AtomicBool,
    events: broadcast::Sender<ClientEvent>,
}

impl AdversarialSession {
    pub fn new(service: Arc<dyn GenerationService>) -> Arc<Self> {
        Self::new_with_strength(service, PerturbationStrength::default())
    }

    pub fn new_with_strength(
        service: Arc<dyn GenerationService>,
        strength: PerturbationStrength,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            ingestor: ImageIngestor::new(),
            parameters: ParameterController::new(strength),
            connectivity: ConnectivityMonitor::new(Arc::clone(&service), events.clone()),
            generation: GenerationOrchestrator::new(service, events.clone()),
            initialized: AtomicBool::new(false),
            events,
        })
    }

    /// Session backed by the HTTP service at `base_url`.
    pub fn connect(base_url: &str, timeout: Option<Duration>) -> Result<Arc<Self>> {
        let service = HttpGenerationService::with_timeout(base_url, timeout)?;
        info!(service_url = %service.base_url(), ?timeout, "generation service configured");
        Ok(Self::new(Arc::new(service)))
    }

    /// Startup hook: runs the first liveness probe. Later calls return the
    /// current status without probing again.
    pub async fn initialize(&self) -> ConnectivityStatus {
        if self.initialized.swap(true, Ordering::AcqRel) {
            return self.connectivity.status().await;
        }
        self.connectivity.probe().await
    }

    /// Submits the held image with the current strength.
    pub async fn generate(&self) -> Result<GenerationResult, ClientError> {
        let image = self.ingestor.current().await;
        let strength = self.parameters.strength().await;
        self.generation.generate(image.as_ref(), strength).await
    }

    pub async fn check_connectivity(&self) -> ConnectivityStatus {
        self.connectivity.probe().await
    }

    pub fn ingestor(&self) -> &ImageIngestor {
        &self.ingestor
    }

    pub fn parameters(&self) -> &ParameterController {
        &self.parameters
    }

    pub fn connectivity(&self) -> &ConnectivityMonitor {
        &self.connectivity
    }

    pub fn generation(&self) -> &GenerationOrchestrator {
        &self.generation
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
