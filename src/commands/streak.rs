// commands/streak.rs - The `calculateStreak` callable entry point.

use super::{AppState, Ack};
use crate::error::Error;
use crate::model::{FreezeBehavior, StreakConfiguration};
use crate::orchestrator;
use crate::{calendar, Result};
use chrono::Utc;
use serde::Deserialize;
use tauri::State;

/// Wire shape of `configuration` in a `calculateStreak` invocation. `streak_id` mirrors the
/// top-level `streakKey` for wire compatibility with existing clients; the top-level key is
/// authoritative for repository scoping. `use_server_calculation` is accepted but unused —
/// this crate always computes server-side.
#[derive(Debug, Deserialize)]
pub struct StreakConfigurationRequest {
    #[allow(dead_code)]
    pub streak_id: String,
    pub events_required_per_day: i64,
    #[allow(dead_code)]
    pub use_server_calculation: bool,
    pub leeway_hours: i64,
    pub freeze_behavior: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculateStreakRequest {
    pub user_id: String,
    pub streak_key: String,
    pub configuration: StreakConfigurationRequest,
    #[allow(dead_code)]
    pub root_collection_name: Option<String>,
    pub timezone: Option<String>,
}

fn parse_freeze_behavior(raw: &str) -> Result<FreezeBehavior> {
    match raw {
        "no_freezes" => Ok(FreezeBehavior::NoFreezes),
        "auto_consume" => Ok(FreezeBehavior::AutoConsume),
        "manual_consume" => Ok(FreezeBehavior::ManualConsume),
        other => Err(Error::InvalidArgument(format!("unknown freeze_behavior: {other}"))),
    }
}

fn validate(request: &CalculateStreakRequest) -> Result<StreakConfiguration> {
    if request.user_id.trim().is_empty() {
        return Err(Error::InvalidArgument("missing userId".to_string()));
    }
    if request.streak_key.trim().is_empty() {
        return Err(Error::InvalidArgument("missing streak key".to_string()));
    }
    if request.configuration.events_required_per_day <= 0 {
        return Err(Error::InvalidArgument(
            "events_required_per_day must be positive".to_string(),
        ));
    }
    if !(0..=23).contains(&request.configuration.leeway_hours) {
        return Err(Error::InvalidArgument("leeway_hours must be within 0-23".to_string()));
    }
    if let Some(zone) = request.timezone.as_deref() {
        calendar::parse_zone(zone)?;
    }
    let freeze_behavior = parse_freeze_behavior(&request.configuration.freeze_behavior)?;

    Ok(StreakConfiguration {
        streak_key: request.streak_key.clone(),
        events_required_per_day: request.configuration.events_required_per_day as u32,
        leeway_hours: request.configuration.leeway_hours as u32,
        freeze_behavior,
    })
}

#[tauri::command]
pub async fn calculate_streak(
    state: State<'_, AppState>,
    request: CalculateStreakRequest,
) -> Result<Ack> {
    let config = validate(&request)?;
    orchestrator::calculate_streak(
        state.streak_repository.as_ref(),
        &request.user_id,
        &config,
        request.timezone.as_deref(),
        Utc::now(),
    )
    .await?;
    Ok(Ack::ok())
}
