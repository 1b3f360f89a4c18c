//! Synthetic event creation for `POST /api/simulate-neurofeedback`.

use std::sync::atomic::{AtomicI64, Ordering};

use neurofeed_core::{NeurofeedbackEvent, SimulateRequest};
use rand::Rng;
use serde_json::Value;

use crate::errors::ServerError;

/// Highest accepted intensity.
pub const MAX_INTENSITY: f64 = 100.0;

/// Reject requests the server cannot turn into an event.
pub fn validate(request: &SimulateRequest) -> Result<(), ServerError> {
    if request.user_id <= 0 {
        return Err(ServerError::BadRequest("userId must be positive".into()));
    }
    if request.brain_region_id.trim().is_empty() {
        return Err(ServerError::BadRequest("brainRegionId is required".into()));
    }
    if request
        .intensity
        .is_some_and(|i| !(0.0..=MAX_INTENSITY).contains(&i))
    {
        return Err(ServerError::BadRequest(format!(
            "intensity must be between 0 and {MAX_INTENSITY}"
        )));
    }
    Ok(())
}

/// Assigns ids and fills in the fields a request leaves open.
pub struct EventFactory {
    next_id: AtomicI64,
}

impl EventFactory {
    /// Factory whose first event gets id 1.
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
        }
    }

    /// Build an event for a validated request.
    pub fn create(&self, request: &SimulateRequest) -> NeurofeedbackEvent {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let intensity = request.intensity.unwrap_or_else(random_intensity);

        let mut event = NeurofeedbackEvent::new(id, request.brain_region_id.clone());
        event.user_id = Some(request.user_id);
        event.intensity = Some(intensity);
        let _ = event
            .metadata
            .insert("source".into(), Value::String("simulation".into()));
        event
    }
}

impl Default for EventFactory {
    fn default() -> Self {
        Self::new()
    }
}

/// Uniform intensity, rounded to one decimal place.
fn random_intensity() -> f64 {
    let raw: f64 = rand::rng().random_range(0.0..=MAX_INTENSITY);
    (raw * 10.0).round() / 10.0
}
