// streak/calculator.rs - The streak calculator proper (§4.3).
//
// Pure function: `events`, `freezes`, `config`, `user_id`, `now`, and `zone` in;
// `(StreakSummary, Vec<FreezeConsumption>)` out. No I/O, no wall-clock reads - `now` is
// always supplied by the caller so tests (and the orchestrator, and a replay) can drive it.

use crate::calendar;
use crate::error::Result;
use crate::freeze::{self, FreezeConsumption};
use crate::model::{Freeze, FreezeBehavior, StreakConfiguration, StreakEvent, StreakSummary};
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Default, Clone, Copy)]
struct DayBucket {
    count: u32,
    has_real_event: bool,
}

/// Run the streak calculator over one user's event log and freeze inventory.
pub fn calculate(
    events: &[StreakEvent],
    freezes: &[Freeze],
    config: &StreakConfiguration,
    user_id: &str,
    now: DateTime<Utc>,
    zone: &str,
) -> Result<(StreakSummary, Vec<FreezeConsumption>)> {
    // Validate the zone up front even on the empty-events path (§4.1: start_of_day must
    // not fail silently).
    calendar::parse_zone(zone)?;

    if events.is_empty() {
        let freezes_available: Vec<Freeze> = freeze::fifo_order(freezes)
            .into_iter()
            .filter(|f| freeze::available(f, now))
            .cloned()
            .collect();
        let freezes_available_count = freezes_available.len() as u32;
        return Ok((
            StreakSummary {
                streak_key: config.streak_key.clone(),
                user_id: user_id.to_string(),
                current_streak: 0,
                longest_streak: 0,
                date_last_event: None,
                last_event_timezone: None,
                date_streak_start: None,
                total_events: 0,
                freezes_available,
                freezes_available_count,
                date_created: None,
                date_updated: now,
                events_required_per_day: config.events_required_per_day,
                today_event_count: 0,
                recent_events: Vec::new(),
            },
            Vec::new(),
        ));
    }

    // Step 2/3: group events by local day, then mark which days clear the threshold.
    let mut buckets: BTreeMap<DateTime<Utc>, DayBucket> = BTreeMap::new();
    for event in events {
        let day = calendar::start_of_day(event.created_at, zone)?;
        let bucket = buckets.entry(day).or_default();
        bucket.count += 1;
        if !event.is_freeze {
            bucket.has_real_event = true;
        }
    }
    let threshold = config.events_required_per_day;
    let mut qualifying_days: Vec<DateTime<Utc>> = buckets
        .iter()
        .filter(|(_, bucket)| bucket.count >= threshold)
        .map(|(day, _)| *day)
        .collect();

    // Step 4: the day the calculator expects to see activity on, shifted back one day
    // during the leeway grace window.
    let today_local = calendar::start_of_day(now, zone)?;
    let mut leeway_expected = today_local;
    if config.leeway_hours > 0 && calendar::hours_between(today_local, now) <= config.leeway_hours as i64 {
        leeway_expected = calendar::shift_local_days(leeway_expected, zone, -1)?;
    }

    // Step 5: auto-consume freezes across the gap between the last qualifying day and
    // today, but only if the available inventory covers the whole gap.
    let mut freezes_available: Vec<Freeze> = freeze::fifo_order(freezes)
        .into_iter()
        .filter(|f| freeze::available(f, now))
        .cloned()
        .collect();
    let mut consumptions: Vec<FreezeConsumption> = Vec::new();

    if config.freeze_behavior == FreezeBehavior::AutoConsume {
        if let Some(&last_qual) = qualifying_days.last() {
            let gap = (calendar::days_between(last_qual, today_local, zone)? - 1).max(0);
            if gap > 0 && freezes_available.len() as i64 >= gap {
                let mut gap_days: Vec<DateTime<Utc>> = Vec::with_capacity(gap as usize);
                for n in 1..=gap {
                    gap_days.push(calendar::shift_local_days(last_qual, zone, n)?);
                }
                let candidates: Vec<&Freeze> = freezes_available.iter().collect();
                let picks = freeze::select_for_days(&gap_days, &candidates[..gap as usize]);

                let consumed_ids: HashSet<&str> =
                    picks.iter().map(|c| c.freeze_id.as_str()).collect();
                freezes_available.retain(|f| !consumed_ids.contains(f.id.as_str()));

                for pick in &picks {
                    buckets.entry(pick.day).or_default().count += 1;
                }
                qualifying_days = buckets
                    .iter()
                    .filter(|(_, bucket)| bucket.count >= threshold)
                    .map(|(day, _)| *day)
                    .collect();
                consumptions = picks;
            }
        }
    }

    // Step 6: walk backward from the expected day, counting real effort while letting
    // freeze-filled days keep the chain alive without incrementing it.
    let mut current_streak: u32 = 0;
    let mut started = false;
    let mut expected_cursor = leeway_expected;
    for &day in qualifying_days.iter().rev() {
        if day >= expected_cursor {
            if buckets[&day].has_real_event {
                current_streak += 1;
            }
            expected_cursor = calendar::shift_local_days(day, zone, -1)?;
            started = true;
            continue;
        }

        let gap = calendar::days_between(day, expected_cursor, zone)?;
        let at_risk_exception =
            !started && gap == 1 && (today_local == expected_cursor || config.leeway_hours > 0);
        if at_risk_exception {
            if buckets[&day].has_real_event {
                current_streak += 1;
            }
            expected_cursor = calendar::shift_local_days(day, zone, -1)?;
            started = true;
        } else {
            break;
        }
    }

    // Step 7: longest streak, scanning the same qualifying days ascending.
    let mut longest: u32 = 0;
    let mut running: u32 = 0;
    let mut previous: Option<DateTime<Utc>> = None;
    for &day in &qualifying_days {
        let has_real = buckets[&day].has_real_event;
        let continues_chain = match previous {
            Some(prev) => calendar::days_between(prev, day, zone)? == 1,
            None => false,
        };
        if continues_chain {
            if has_real {
                running += 1;
            }
        } else {
            longest = longest.max(running);
            running = if has_real { 1 } else { 0 };
        }
        previous = Some(day);
    }
    longest = longest.max(running).max(current_streak);

    // Step 8: derived fields.
    let today_event_count = events
        .iter()
        .filter(|e| calendar::start_of_day(e.created_at, zone).map(|d| d == today_local).unwrap_or(false))
        .count() as u32;

    let last_event = events.iter().max_by_key(|e| e.created_at);
    let date_last_event = last_event.map(|e| e.created_at);
    let last_event_timezone = last_event.map(|e| e.timezone.clone());

    let date_streak_start = if current_streak > 0 {
        Some(calendar::shift_local_days(leeway_expected, zone, -((current_streak - 1) as i64))?)
    } else {
        None
    };

    let date_created = events.iter().map(|e| e.created_at).min();
    let recent_events = recent_events_for_streak(events, zone, config.leeway_hours)?;

    let total_events = events.len() as u32 + consumptions.len() as u32;
    let freezes_available_count = freezes_available.len() as u32;

    let summary = StreakSummary {
        streak_key: config.streak_key.clone(),
        user_id: user_id.to_string(),
        current_streak,
        longest_streak: longest,
        date_last_event,
        last_event_timezone,
        date_streak_start,
        total_events,
        freezes_available,
        freezes_available_count,
        date_created,
        date_updated: now,
        events_required_per_day: config.events_required_per_day,
        today_event_count,
        recent_events,
    };

    Ok((summary, consumptions))
}

/// §4.3's 60-day recent-events view: events in the last 60 distinct local days, where an
/// event falling inside the leeway window right after local midnight is grouped under the
/// *previous* local day (but still emitted with its real `created_at`).
fn recent_events_for_streak(
    events: &[StreakEvent],
    zone: &str,
    leeway_hours: u32,
) -> Result<Vec<StreakEvent>> {
    let mut rolled: Vec<(DateTime<Utc>, &StreakEvent)> = Vec::with_capacity(events.len());
    for event in events {
        let day = calendar::start_of_day(event.created_at, zone)?;
        let grouped_day = if leeway_hours > 0 && calendar::hours_between(day, event.created_at) <= leeway_hours as i64 {
            calendar::shift_local_days(day, zone, -1)?
        } else {
            day
        };
        rolled.push((grouped_day, event));
    }

    let mut distinct_days: Vec<DateTime<Utc>> = rolled.iter().map(|(d, _)| *d).collect();
    distinct_days.sort();
    distinct_days.dedup();
    let kept: HashSet<DateTime<Utc>> = if distinct_days.len() > 60 {
        distinct_days[distinct_days.len() - 60..].iter().copied().collect()
    } else {
        distinct_days.into_iter().collect()
    };

    let mut recent: Vec<StreakEvent> = rolled
        .into_iter()
        .filter(|(day, _)| kept.contains(day))
        .map(|(_, event)| event.clone())
        .collect();
    recent.sort_by_key(|e| e.created_at);
    Ok(recent)
}
