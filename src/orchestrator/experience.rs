// orchestrator/experience.rs - The experience-points orchestrator (§4.5).

use crate::experience;
use crate::model::{ExperienceConfiguration, ExperienceSummary};
use crate::repository::ExperienceRepository;
use crate::Result;
use chrono::{DateTime, Utc};
use tracing::instrument;

/// Run the experience-points calculator against durable storage. Strictly simpler than
/// `calculate_streak`: there is no freeze step and no second pass, so XP events never carry
/// a timezone and the zone defaults straight to UTC.
#[instrument(skip(repo, config), fields(user_id, experience_key = %config.experience_key))]
pub async fn calculate_experience_points(
    repo: &dyn ExperienceRepository,
    user_id: &str,
    config: &ExperienceConfiguration,
    zone_override: Option<&str>,
    now: DateTime<Utc>,
) -> Result<ExperienceSummary> {
    tracing::debug!("reading experience events");
    let events = repo.load_events(user_id, &config.experience_key).await?;
    let zone = zone_override.unwrap_or("UTC");
    let summary = experience::calculate(&events, config, user_id, now, zone)?;
    tracing::info!(points_all_time = summary.points_all_time, "upserting experience summary");
    repo.upsert_summary(&summary).await?;
    Ok(summary)
}
