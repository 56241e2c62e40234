// model.rs - Persisted data shapes shared by the calculators, the repository contract,
// and the callable entry points.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A scalar value stored in an event's free-form `metadata` bag.
///
/// Client applications attach arbitrary key/value context to an event (e.g. "workout_type":
/// "run", "distance_km": 5.2). The calculator never reads these fields, but the repository
/// and serializer must round-trip them without losing type information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    String(String),
    Bool(bool),
    Integer(i64),
    Floating(f64),
}

pub type Metadata = HashMap<String, MetadataValue>;

/// A policy governing how many freezes may be held and consumed at once.
///
/// `no_freezes`: freezes are never consumed; `freezes_available` is still reported (a
/// user may be earning them for later) but the auto-consume gap-fill never runs.
/// `auto_consume`: the streak orchestrator fills qualifying gaps automatically (§4.3 step 5).
/// `manual_consume`: freezes exist and can be spent by an external collaborator, but the
/// calculator never spends them on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FreezeBehavior {
    NoFreezes,
    AutoConsume,
    ManualConsume,
}

/// One entry in a streak's event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreakEvent {
    pub id: String,
    pub created_at: DateTime<Utc>,
    /// IANA zone name the device believed it was in when this event was recorded.
    pub timezone: String,
    /// `true` iff this event is a synthesized gap-fill rather than real user activity.
    pub is_freeze: bool,
    /// Present iff `is_freeze` is true; references the freeze that was consumed.
    pub freeze_id: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

/// One entry in an experience-points event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperienceEvent {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub points: i64,
    #[serde(default)]
    pub metadata: Metadata,
}

/// A consumable token that can fill one missed local day to keep a streak alive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Freeze {
    pub id: String,
    pub earned_at: Option<DateTime<Utc>>,
    /// `None` ⇒ not yet consumed.
    pub used_at: Option<DateTime<Utc>>,
    /// `None` ⇒ never expires.
    pub expires_at: Option<DateTime<Utc>>,
}

impl Freeze {
    /// A freeze is available at instant `t` iff it hasn't been used and (it never expires,
    /// or `t` is still at or before its expiry).
    pub fn is_available(&self, at: DateTime<Utc>) -> bool {
        self.used_at.is_none() && self.expires_at.map(|exp| at <= exp).unwrap_or(true)
    }
}

/// Configuration for one user's streak.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreakConfiguration {
    pub streak_key: String,
    pub events_required_per_day: u32,
    pub leeway_hours: u32,
    pub freeze_behavior: FreezeBehavior,
}

/// Configuration for one user's experience-points ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperienceConfiguration {
    pub experience_key: String,
}

/// The computed, overwrite-merged view of a user's streak.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreakSummary {
    pub streak_key: String,
    pub user_id: String,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub date_last_event: Option<DateTime<Utc>>,
    pub last_event_timezone: Option<String>,
    pub date_streak_start: Option<DateTime<Utc>>,
    pub total_events: u32,
    pub freezes_available: Vec<Freeze>,
    pub freezes_available_count: u32,
    pub date_created: Option<DateTime<Utc>>,
    pub date_updated: DateTime<Utc>,
    pub events_required_per_day: u32,
    pub today_event_count: u32,
    pub recent_events: Vec<StreakEvent>,
}

/// The computed, overwrite-merged view of a user's experience points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperienceSummary {
    pub experience_key: String,
    pub user_id: String,
    pub points_all_time: i64,
    pub points_today: i64,
    pub events_today_count: u32,
    pub points_this_week: i64,
    pub points_last_7_days: i64,
    pub points_this_month: i64,
    pub points_last_30_days: i64,
    pub points_this_year: i64,
    pub points_last_12_months: i64,
    pub date_last_event: Option<DateTime<Utc>>,
    pub date_created: Option<DateTime<Utc>>,
    pub date_updated: DateTime<Utc>,
    pub recent_events: Vec<ExperienceEvent>,
}

/// One item in the (out-of-scope, interface-only) progress collaborator's store.
///
/// Described in §6 only because an external collaborator shares the same document-store
/// foundation; no calculator or orchestrator in this crate consumes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressItem {
    pub id: String,
    pub user_id: String,
    pub progress_key: String,
    #[serde(default)]
    pub metadata: Metadata,
}

/// What kind of change a progress-items change stream observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressChangeKind {
    Added,
    Modified,
    Removed,
}
