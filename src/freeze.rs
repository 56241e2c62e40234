// freeze.rs - Freeze availability, FIFO ordering, and gap-day selection (§4.2).

use crate::model::Freeze;
use chrono::{DateTime, Utc};

/// A single freeze consumption the streak calculator wants applied: spend `freeze_id` to
/// fill the gap on local day `day`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreezeConsumption {
    pub freeze_id: String,
    pub day: DateTime<Utc>,
}

/// A freeze is available at `now` iff it hasn't been used and hasn't expired.
pub fn available(freeze: &Freeze, now: DateTime<Utc>) -> bool {
    freeze.is_available(now)
}

/// Sort freezes ascending by `earned_at` (nulls first), breaking ties by `id`
/// lexicographically so the ordering is total.
pub fn fifo_order(freezes: &[Freeze]) -> Vec<&Freeze> {
    let mut ordered: Vec<&Freeze> = freezes.iter().collect();
    ordered.sort_by(|a, b| a.earned_at.cmp(&b.earned_at).then_with(|| a.id.cmp(&b.id)));
    ordered
}

/// Pair the first `min(|days|, |available_freezes|)` freezes (FIFO) with the first
/// `min(|days|, |available_freezes|)` days. The caller is responsible for not invoking
/// this unless it already knows a full-gap cover is possible (§4.3 step 5); a partial
/// save is never produced here or anywhere else.
pub fn select_for_days(days: &[DateTime<Utc>], available_freezes: &[&Freeze]) -> Vec<FreezeConsumption> {
    days.iter()
        .zip(available_freezes.iter())
        .map(|(day, freeze)| FreezeConsumption {
            freeze_id: freeze.id.clone(),
            day: *day,
        })
        .collect()
}
