// repository/memory.rs - In-memory doubles for the repository contracts, test-only.

use crate::error::Error;
use crate::model::{ExperienceEvent, ExperienceSummary, Freeze, StreakEvent, StreakSummary};
use crate::repository::{ExperienceRepository, StreakRepository};
use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::mpsc;

type StreakKey = (String, String);

#[derive(Default)]
struct StreakState {
    events: Vec<StreakEvent>,
    freezes: Vec<Freeze>,
    summary: Option<StreakSummary>,
}

/// An in-memory `StreakRepository` for unit and orchestrator tests. Not for production use:
/// state lives only as long as the process and there is no persistence.
#[derive(Default)]
pub struct InMemoryStreakRepository {
    state: Mutex<HashMap<StreakKey, StreakState>>,
}

impl InMemoryStreakRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_events(&self, user_id: &str, streak_key: &str, events: Vec<StreakEvent>) {
        let mut state = self.state.lock().expect("memory repository mutex poisoned");
        state.entry((user_id.to_string(), streak_key.to_string())).or_default().events = events;
    }

    pub fn seed_freezes(&self, user_id: &str, streak_key: &str, freezes: Vec<Freeze>) {
        let mut state = self.state.lock().expect("memory repository mutex poisoned");
        state.entry((user_id.to_string(), streak_key.to_string())).or_default().freezes = freezes;
    }
}

#[async_trait]
impl StreakRepository for InMemoryStreakRepository {
    async fn load_events(&self, user_id: &str, streak_key: &str) -> Result<Vec<StreakEvent>> {
        let state = self.state.lock().expect("memory repository mutex poisoned");
        Ok(state
            .get(&(user_id.to_string(), streak_key.to_string()))
            .map(|s| s.events.clone())
            .unwrap_or_default())
    }

    async fn load_freezes(&self, user_id: &str, streak_key: &str) -> Result<Vec<Freeze>> {
        let state = self.state.lock().expect("memory repository mutex poisoned");
        Ok(state
            .get(&(user_id.to_string(), streak_key.to_string()))
            .map(|s| s.freezes.clone())
            .unwrap_or_default())
    }

    async fn apply_freeze_consumption(
        &self,
        user_id: &str,
        streak_key: &str,
        event: &StreakEvent,
        freeze_id: &str,
    ) -> Result<()> {
        let mut state = self.state.lock().expect("memory repository mutex poisoned");
        let entry = state.entry((user_id.to_string(), streak_key.to_string())).or_default();

        if entry.events.iter().any(|e| e.id == event.id) {
            // Idempotence guard: a re-run that tries to apply the same consumption twice is
            // a conflict the orchestrator already knows how to recover from (§7).
            return Err(Error::Conflict(format!("event {} already recorded", event.id)));
        }

        let freeze = entry
            .freezes
            .iter_mut()
            .find(|f| f.id == freeze_id)
            .ok_or_else(|| Error::Internal(format!("unknown freeze {freeze_id}")))?;
        if freeze.used_at.is_some() {
            return Err(Error::Conflict(format!("freeze {freeze_id} already used")));
        }
        freeze.used_at = Some(event.created_at);
        entry.events.push(event.clone());
        Ok(())
    }

    async fn upsert_summary(&self, summary: &StreakSummary) -> Result<()> {
        let mut state = self.state.lock().expect("memory repository mutex poisoned");
        let entry = state
            .entry((summary.user_id.clone(), summary.streak_key.clone()))
            .or_default();
        entry.summary = Some(summary.clone());
        Ok(())
    }

    async fn load_summary(&self, user_id: &str, streak_key: &str) -> Result<Option<StreakSummary>> {
        let state = self.state.lock().expect("memory repository mutex poisoned");
        Ok(state
            .get(&(user_id.to_string(), streak_key.to_string()))
            .and_then(|s| s.summary.clone()))
    }

    /// No live storage backend to watch, so this emits the current summary (if any) once
    /// and closes — enough for an orchestrator test to exercise the call, not a real feed.
    async fn stream_summary(
        &self,
        user_id: &str,
        streak_key: &str,
    ) -> Result<mpsc::Receiver<Result<StreakSummary>>> {
        let (tx, rx) = mpsc::channel(1);
        if let Some(summary) = self.load_summary(user_id, streak_key).await? {
            let _ = tx.send(Ok(summary)).await;
        }
        Ok(rx)
    }
}

#[derive(Default)]
struct ExperienceState {
    events: Vec<ExperienceEvent>,
    summary: Option<ExperienceSummary>,
}

/// An in-memory `ExperienceRepository` for unit and orchestrator tests.
#[derive(Default)]
pub struct InMemoryExperienceRepository {
    state: Mutex<HashMap<StreakKey, ExperienceState>>,
}

impl InMemoryExperienceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_events(&self, user_id: &str, experience_key: &str, events: Vec<ExperienceEvent>) {
        let mut state = self.state.lock().expect("memory repository mutex poisoned");
        state.entry((user_id.to_string(), experience_key.to_string())).or_default().events = events;
    }
}

#[async_trait]
impl ExperienceRepository for InMemoryExperienceRepository {
    async fn load_events(&self, user_id: &str, experience_key: &str) -> Result<Vec<ExperienceEvent>> {
        let state = self.state.lock().expect("memory repository mutex poisoned");
        Ok(state
            .get(&(user_id.to_string(), experience_key.to_string()))
            .map(|s| s.events.clone())
            .unwrap_or_default())
    }

    async fn upsert_summary(&self, summary: &ExperienceSummary) -> Result<()> {
        let mut state = self.state.lock().expect("memory repository mutex poisoned");
        let entry = state
            .entry((summary.user_id.clone(), summary.experience_key.clone()))
            .or_default();
        entry.summary = Some(summary.clone());
        Ok(())
    }

    async fn load_summary(
        &self,
        user_id: &str,
        experience_key: &str,
    ) -> Result<Option<ExperienceSummary>> {
        let state = self.state.lock().expect("memory repository mutex poisoned");
        Ok(state
            .get(&(user_id.to_string(), experience_key.to_string()))
            .and_then(|s| s.summary.clone()))
    }

    async fn stream_summary(
        &self,
        user_id: &str,
        experience_key: &str,
    ) -> Result<mpsc::Receiver<Result<ExperienceSummary>>> {
        let (tx, rx) = mpsc::channel(1);
        if let Some(summary) = self.load_summary(user_id, experience_key).await? {
            let _ = tx.send(Ok(summary)).await;
        }
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Metadata;
    use chrono::{TimeZone, Utc};

    fn utc(y: i32, mo: u32, d: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn seeded_events_round_trip() {
        let repo = InMemoryStreakRepository::new();
        let event = StreakEvent {
            id: "e1".to_string(),
            created_at: utc(2025, 1, 1),
            timezone: "UTC".to_string(),
            is_freeze: false,
            freeze_id: None,
            metadata: Metadata::new(),
        };
        repo.seed_events("u1", "workout", vec![event.clone()]);
        let loaded = repo.load_events("u1", "workout").await.unwrap();
        assert_eq!(loaded, vec![event]);
    }

    #[tokio::test]
    async fn stream_summary_emits_the_current_summary_once() {
        let repo = InMemoryStreakRepository::new();
        let summary = StreakSummary {
            streak_key: "workout".to_string(),
            user_id: "u1".to_string(),
            current_streak: 3,
            longest_streak: 3,
            date_last_event: None,
            last_event_timezone: None,
            date_streak_start: None,
            total_events: 3,
            freezes_available: Vec::new(),
            freezes_available_count: 0,
            date_created: None,
            date_updated: utc(2025, 1, 3),
            events_required_per_day: 1,
            today_event_count: 1,
            recent_events: Vec::new(),
        };
        repo.upsert_summary(&summary).await.unwrap();

        let mut rx = repo.stream_summary("u1", "workout").await.unwrap();
        let received = rx.recv().await.unwrap().unwrap();
        assert_eq!(received.current_streak, 3);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn apply_freeze_consumption_marks_freeze_used_and_appends_event() {
        let repo = InMemoryStreakRepository::new();
        repo.seed_freezes(
            "u1",
            "workout",
            vec![Freeze { id: "f1".to_string(), earned_at: None, used_at: None, expires_at: None }],
        );
        let event = StreakEvent {
            id: "gap-1".to_string(),
            created_at: utc(2025, 1, 2),
            timezone: "UTC".to_string(),
            is_freeze: true,
            freeze_id: Some("f1".to_string()),
            metadata: Metadata::new(),
        };
        repo.apply_freeze_consumption("u1", "workout", &event, "f1").await.unwrap();

        let freezes = repo.load_freezes("u1", "workout").await.unwrap();
        assert!(freezes[0].used_at.is_some());
        let events = repo.load_events("u1", "workout").await.unwrap();
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn reapplying_the_same_consumption_is_a_conflict() {
        let repo = InMemoryStreakRepository::new();
        repo.seed_freezes(
            "u1",
            "workout",
            vec![Freeze { id: "f1".to_string(), earned_at: None, used_at: None, expires_at: None }],
        );
        let event = StreakEvent {
            id: "gap-1".to_string(),
            created_at: utc(2025, 1, 2),
            timezone: "UTC".to_string(),
            is_freeze: true,
            freeze_id: Some("f1".to_string()),
            metadata: Metadata::new(),
        };
        repo.apply_freeze_consumption("u1", "workout", &event, "f1").await.unwrap();
        let result = repo.apply_freeze_consumption("u1", "workout", &event, "f1").await;
        assert!(matches!(result, Err(Error::Conflict(_))));
    }
}
