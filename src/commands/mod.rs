// commands/mod.rs - Callable entry points (§6).

mod experience;
mod streak;

pub use experience::{calculate_experience_points, CalculateExperiencePointsRequest};
pub use streak::{calculate_streak, CalculateStreakRequest};

use crate::repository::{ExperienceRepository, StreakRepository};
use serde::Serialize;
use std::sync::Arc;

/// Application state handed to every command: just the two repository handles. A host
/// application wires its concrete store adapters in here at startup.
pub struct AppState {
    pub streak_repository: Arc<dyn StreakRepository>,
    pub experience_repository: Arc<dyn ExperienceRepository>,
}

/// The shape every command returns on success (§6: `{ success: true }`).
#[derive(Debug, Clone, Serialize)]
pub struct Ack {
    pub success: bool,
}

impl Ack {
    pub fn ok() -> Self {
        Ack { success: true }
    }
}
