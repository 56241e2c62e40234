// orchestrator/streak.rs - The streak orchestrator (§4.5, §5).

use crate::model::{Metadata, StreakConfiguration, StreakEvent, StreakSummary};
use crate::repository::StreakRepository;
use crate::streak;
use crate::Result;
use chrono::{DateTime, Utc};
use tracing::instrument;
use uuid::Uuid;

/// Run the streak calculator against durable storage and leave the repository holding a
/// freshly computed, up-to-date summary.
///
/// Ordering is fixed per §5: read events, read freezes, calculate, append freeze events in
/// consumption order, mark the consumed freezes used in the same order, and — only if any
/// consumption happened — re-read and recalculate once more before the final upsert. A
/// `conflict` from `apply_freeze_consumption` means another invocation already applied that
/// exact consumption; it is swallowed rather than propagated (§7).
#[instrument(skip(repo, config), fields(user_id, streak_key = %config.streak_key))]
pub async fn calculate_streak(
    repo: &dyn StreakRepository,
    user_id: &str,
    config: &StreakConfiguration,
    zone_override: Option<&str>,
    now: DateTime<Utc>,
) -> Result<StreakSummary> {
    tracing::debug!("reading streak events");
    let events = repo.load_events(user_id, &config.streak_key).await?;
    tracing::debug!("reading streak freezes");
    let freezes = repo.load_freezes(user_id, &config.streak_key).await?;

    let zone = resolve_zone(zone_override, &events);
    let (mut summary, consumptions) =
        streak::calculate(&events, &freezes, config, user_id, now, &zone)?;

    if !consumptions.is_empty() {
        let fallback_timezone = summary.last_event_timezone.clone().unwrap_or_else(|| zone.clone());
        let total = consumptions.len();

        for (n, consumption) in consumptions.iter().enumerate() {
            tracing::debug!(n = n + 1, total, freeze_id = %consumption.freeze_id, "consuming freeze");
            let event = StreakEvent {
                id: Uuid::new_v4().to_string(),
                created_at: consumption.day,
                timezone: fallback_timezone.clone(),
                is_freeze: true,
                freeze_id: Some(consumption.freeze_id.clone()),
                metadata: Metadata::new(),
            };
            match repo
                .apply_freeze_consumption(user_id, &config.streak_key, &event, &consumption.freeze_id)
                .await
            {
                Ok(()) => {}
                Err(err) if err.is_conflict() => {
                    tracing::warn!(freeze_id = %consumption.freeze_id, "freeze consumption already applied, skipping");
                }
                Err(err) => return Err(err),
            }
        }

        // Re-read and recalculate: the freshly appended freeze events close the gaps the
        // first pass found, so this pass must produce zero further consumptions.
        tracing::debug!("re-reading after freeze consumption");
        let events = repo.load_events(user_id, &config.streak_key).await?;
        let freezes = repo.load_freezes(user_id, &config.streak_key).await?;
        let (recomputed, _zero_consumptions) =
            streak::calculate(&events, &freezes, config, user_id, now, &zone)?;
        summary = recomputed;
    }

    tracing::info!(current_streak = summary.current_streak, "upserting streak summary");
    repo.upsert_summary(&summary).await?;
    Ok(summary)
}

/// Prefer the caller-supplied zone; else the timezone of the most recently recorded event;
/// else UTC.
fn resolve_zone(zone_override: Option<&str>, events: &[StreakEvent]) -> String {
    if let Some(zone) = zone_override {
        return zone.to_string();
    }
    events
        .iter()
        .max_by_key(|e| e.created_at)
        .map(|e| e.timezone.clone())
        .unwrap_or_else(|| "UTC".to_string())
}
