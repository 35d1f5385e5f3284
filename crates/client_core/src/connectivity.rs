use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use shared::domain::{ConnectivityStatus, DEFAULT_LIVENESS_MESSAGE};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use crate::{transport::GenerationService, ClientEvent};

struct ProbeState {
    applied_seq: u64,
    status: ConnectivityStatus,
}

/// Tracks whether the generation service answers its liveness endpoint.
///
/// Probes never take part in the generation single-flight gate. Each probe is
/// numbered when it starts; a reply that lands after a newer one has been
/// applied is dropped.
pub struct ConnectivityMonitor {
    service: Arc<dyn GenerationService>,
    state: RwLock<ProbeState>,
    next_seq: AtomicU64,
    events: broadcast::Sender<ClientEvent>,
}

impl ConnectivityMonitor {
    pub fn new(service: Arc<dyn GenerationService>, events: broadcast::Sender<ClientEvent>) -> Self {
        Self {
            service,
            state: RwLock::new(ProbeState {
                applied_seq: 0,
                status: ConnectivityStatus::Unknown,
            }),
            next_seq: AtomicU64::new(0),
            events,
        }
    }

    /// Calls the liveness endpoint and returns the status now in effect.
    /// Failures of any kind are folded into `Disconnected`.
    pub async fn probe(&self) -> ConnectivityStatus {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let observed = match self.service.liveness().await {
            Ok(body) => ConnectivityStatus::Connected(
                body.message
                    .filter(|message| !message.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_LIVENESS_MESSAGE.to_string()),
            ),
            Err(err) => {
                let reason = format!("{err:#}");
                warn!(seq, error = %reason, "liveness probe failed");
                ConnectivityStatus::Disconnected
            }
        };

        let mut state = self.state.write().await;
        if seq < state.applied_seq {
            debug!(seq, applied_seq = state.applied_seq, "discarding stale liveness probe");
            return state.status.clone();
        }
        state.applied_seq = seq;
        let changed = state.status != observed;
        state.status = observed.clone();
        drop(state);

        if changed {
            info!(seq, status = %observed, "connectivity changed");
            let _ = self
                .events
                .send(ClientEvent::ConnectivityChanged(observed.clone()));
        }
        observed
    }

    pub async fn status(&self) -> ConnectivityStatus {
        self.state.read().await.status.clone()
    }
}

#[cfg(test)]
#[path = "tests/connectivity_tests.rs"]
mod tests;
