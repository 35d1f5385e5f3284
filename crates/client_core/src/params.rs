use shared::domain::PerturbationStrength;
use tokio::sync::RwLock;
use tracing::{debug, warn};

#[derive(Default)]
pub struct ParameterController {
    strength: RwLock<PerturbationStrength>,
}

impl ParameterController {
    pub fn new(initial: PerturbationStrength) -> Self {
        Self {
            strength: RwLock::new(initial),
        }
    }

    /// Stores `value` clamped to `[0, 0.5]` and rounded to the nearest `0.01`.
    /// NaN is ignored and the previous value returned.
    pub async fn set_strength(&self, value: f64) -> PerturbationStrength {
        let mut guard = self.strength.write().await;
        match PerturbationStrength::from_f64(value) {
            Ok(accepted) => {
                debug!(requested = value, accepted = %accepted, "perturbation strength updated");
                *guard = accepted;
                accepted
            }
            Err(err) => {
                warn!(requested = value, error = %err, "ignoring perturbation strength");
                *guard
            }
        }
    }

    pub async fn strength(&self) -> PerturbationStrength {
        *self.strength.read().await
    }
}

#[cfg(test)]
#[path = "tests/params_tests.rs"]
mod tests;
