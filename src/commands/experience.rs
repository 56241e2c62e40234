// commands/experience.rs - The `calculateExperiencePoints` callable entry point.

use super::{AppState, Ack};
use crate::error::Error;
use crate::model::ExperienceConfiguration;
use crate::orchestrator;
use crate::{calendar, Result};
use chrono::Utc;
use serde::Deserialize;
use tauri::State;

/// Wire shape of `configuration` in a `calculateExperiencePoints` invocation. `experience_id`
/// mirrors the top-level `experienceKey`; `use_server_calculation` is accepted but unused.
#[derive(Debug, Deserialize)]
pub struct ExperienceConfigurationRequest {
    #[allow(dead_code)]
    pub experience_id: String,
    #[allow(dead_code)]
    pub use_server_calculation: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculateExperiencePointsRequest {
    pub user_id: String,
    pub experience_key: String,
    pub configuration: ExperienceConfigurationRequest,
    #[allow(dead_code)]
    pub root_collection_name: Option<String>,
    pub timezone: Option<String>,
}

fn validate(request: &CalculateExperiencePointsRequest) -> Result<ExperienceConfiguration> {
    if request.user_id.trim().is_empty() {
        return Err(Error::InvalidArgument("missing userId".to_string()));
    }
    if request.experience_key.trim().is_empty() {
        return Err(Error::InvalidArgument("missing experience key".to_string()));
    }
    if let Some(zone) = request.timezone.as_deref() {
        calendar::parse_zone(zone)?;
    }

    Ok(ExperienceConfiguration { experience_key: request.experience_key.clone() })
}

#[tauri::command]
pub async fn calculate_experience_points(
    state: State<'_, AppState>,
    request: CalculateExperiencePointsRequest,
) -> Result<Ack> {
    let config = validate(&request)?;
    orchestrator::calculate_experience_points(
        state.experience_repository.as_ref(),
        &request.user_id,
        &config,
        request.timezone.as_deref(),
        Utc::now(),
    )
    .await?;
    Ok(Ack::ok())
}
