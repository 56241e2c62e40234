// repository.rs - Storage contracts the orchestrators depend on.
//
// No concrete persistence backend lives in this crate; a host application wires in its own
// implementation (SQLite, an embedded document store, a remote API). These traits are the
// seam: orchestrators take `&dyn StreakRepository` / `&dyn ExperienceRepository` and never
// touch a storage engine directly.

use crate::model::{
    ExperienceEvent, ExperienceSummary, Freeze, ProgressChangeKind, ProgressItem, StreakEvent,
    StreakSummary,
};
use crate::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

#[cfg(test)]
pub mod memory;

/// Durable storage for one user's streak event log, freezes, and computed summary.
#[async_trait]
pub trait StreakRepository: Send + Sync {
    /// All events recorded for `(user_id, streak_key)`, in no particular order.
    async fn load_events(&self, user_id: &str, streak_key: &str) -> Result<Vec<StreakEvent>>;

    /// All freezes earned by `(user_id, streak_key)`, used or not.
    async fn load_freezes(&self, user_id: &str, streak_key: &str) -> Result<Vec<Freeze>>;

    /// Append a synthesized gap-fill event and mark the freeze it consumed as used, in one
    /// atomic unit. Implementations that cannot guarantee atomicity must instead detect and
    /// surface a write race as `Error::Conflict` so the orchestrator can retry.
    async fn apply_freeze_consumption(
        &self,
        user_id: &str,
        streak_key: &str,
        event: &StreakEvent,
        freeze_id: &str,
    ) -> Result<()>;

    /// Replace the stored summary for `(user_id, streak_key)` with a freshly computed one.
    async fn upsert_summary(&self, summary: &StreakSummary) -> Result<()>;

    /// The last summary written by `upsert_summary`, if any.
    async fn load_summary(&self, user_id: &str, streak_key: &str) -> Result<Option<StreakSummary>>;

    /// A live, restartable feed of every server-observed change to this summary document.
    /// Closes only when the consumer drops the receiver or the subscription itself ends.
    async fn stream_summary(
        &self,
        user_id: &str,
        streak_key: &str,
    ) -> Result<mpsc::Receiver<Result<StreakSummary>>>;
}

/// Durable storage for one user's experience-points event log and computed summary.
#[async_trait]
pub trait ExperienceRepository: Send + Sync {
    async fn load_events(&self, user_id: &str, experience_key: &str) -> Result<Vec<ExperienceEvent>>;

    async fn upsert_summary(&self, summary: &ExperienceSummary) -> Result<()>;

    async fn load_summary(
        &self,
        user_id: &str,
        experience_key: &str,
    ) -> Result<Option<ExperienceSummary>>;

    /// A live, restartable feed of every server-observed change to this summary document.
    async fn stream_summary(
        &self,
        user_id: &str,
        experience_key: &str,
    ) -> Result<mpsc::Receiver<Result<ExperienceSummary>>>;
}

/// Storage for the out-of-scope progress-items collaborator. Described only so the
/// document-store contract is pinned down for whatever external system subscribes to it; no
/// calculator or orchestrator in this crate reads or writes progress items.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    async fn load_items(&self, user_id: &str, progress_key: &str) -> Result<Vec<ProgressItem>>;

    /// Upsert keyed by `item.id`, same merge semantics as a summary upsert.
    async fn upsert_item(&self, item: &ProgressItem) -> Result<()>;

    async fn delete_item(&self, user_id: &str, progress_key: &str, item_id: &str) -> Result<()>;

    /// Remove every item under `(user_id, progress_key)`.
    async fn delete_all(&self, user_id: &str, progress_key: &str) -> Result<()>;

    /// A live feed of `(kind, item)` pairs for `(user_id, progress_key)`. The channel closes
    /// when the subscription ends; callers drain it with `recv()` in a loop.
    async fn stream_changes(
        &self,
        user_id: &str,
        progress_key: &str,
    ) -> Result<mpsc::Receiver<Result<(ProgressChangeKind, ProgressItem)>>>;
}
