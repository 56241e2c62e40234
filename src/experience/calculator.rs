// experience/calculator.rs - The experience-points calculator (§4.4).

use crate::calendar;
use crate::error::Result;
use crate::model::{ExperienceConfiguration, ExperienceEvent, ExperienceSummary};
use chrono::{DateTime, Duration, Months, Utc};
use std::collections::HashSet;

/// Run the experience-points aggregator over one user's event log.
pub fn calculate(
    events: &[ExperienceEvent],
    config: &ExperienceConfiguration,
    user_id: &str,
    now: DateTime<Utc>,
    zone: &str,
) -> Result<ExperienceSummary> {
    calendar::parse_zone(zone)?;

    if events.is_empty() {
        return Ok(ExperienceSummary {
            experience_key: config.experience_key.clone(),
            user_id: user_id.to_string(),
            points_all_time: 0,
            points_today: 0,
            events_today_count: 0,
            points_this_week: 0,
            points_last_7_days: 0,
            points_this_month: 0,
            points_last_30_days: 0,
            points_this_year: 0,
            points_last_12_months: 0,
            date_last_event: None,
            date_created: None,
            date_updated: now,
            recent_events: Vec::new(),
        });
    }

    // Ordering rule: ascending by `created_at` so `date_created` is deterministic.
    let mut ordered: Vec<&ExperienceEvent> = events.iter().collect();
    ordered.sort_by_key(|e| e.created_at);

    let points_all_time: i64 = ordered.iter().map(|e| e.points).sum();

    let mut points_today = 0i64;
    let mut events_today_count = 0u32;
    for event in &ordered {
        if calendar::same_day(event.created_at, now, zone)? {
            points_today += event.points;
            events_today_count += 1;
        }
    }

    let points_this_week = calendar::week_interval(now, zone)
        .map(|interval| sum_within(&ordered, interval, now))
        .unwrap_or(0);
    let points_this_month = calendar::month_interval(now, zone)
        .map(|interval| sum_within(&ordered, interval, now))
        .unwrap_or(0);
    let points_this_year = calendar::year_interval(now, zone)
        .map(|interval| sum_within(&ordered, interval, now))
        .unwrap_or(0);

    // Rolling windows: pure instant arithmetic, no timezone involved.
    let points_last_7_days = sum_since(&ordered, now - Duration::days(7));
    let points_last_30_days = sum_since(&ordered, now - Duration::days(30));
    let since_12_months = now
        .checked_sub_months(Months::new(12))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let points_last_12_months = sum_since(&ordered, since_12_months);

    let date_last_event = ordered.last().map(|e| e.created_at);
    let date_created = ordered.first().map(|e| e.created_at);
    let recent_events = recent_events_for_experience(&ordered, zone)?;

    Ok(ExperienceSummary {
        experience_key: config.experience_key.clone(),
        user_id: user_id.to_string(),
        points_all_time,
        points_today,
        events_today_count,
        points_this_week,
        points_last_7_days,
        points_this_month,
        points_last_30_days,
        points_this_year,
        points_last_12_months,
        date_last_event,
        date_created,
        date_updated: now,
        recent_events,
    })
}

/// Sum points within `interval`, clamped to `now`: §4.4 defines the calendar windows as
/// "inclusive of start, through now", so an event timestamped later in the same period but
/// after `now` must not be counted.
fn sum_within(events: &[&ExperienceEvent], interval: calendar::Interval, now: DateTime<Utc>) -> i64 {
    let end = interval.end.min(now);
    events
        .iter()
        .filter(|e| e.created_at >= interval.start && e.created_at <= end)
        .map(|e| e.points)
        .sum()
}

fn sum_since(events: &[&ExperienceEvent], since: DateTime<Utc>) -> i64 {
    events.iter().filter(|e| e.created_at >= since).map(|e| e.points).sum()
}

/// The 60-distinct-local-day recent-events view, without the streak calculator's leeway
/// remap (experience points have no leeway concept).
fn recent_events_for_experience(
    events: &[&ExperienceEvent],
    zone: &str,
) -> Result<Vec<ExperienceEvent>> {
    let mut by_day: Vec<(DateTime<Utc>, &ExperienceEvent)> = Vec::with_capacity(events.len());
    for event in events {
        let day = calendar::start_of_day(event.created_at, zone)?;
        by_day.push((day, event));
    }

    let mut distinct_days: Vec<DateTime<Utc>> = by_day.iter().map(|(d, _)| *d).collect();
    distinct_days.sort();
    distinct_days.dedup();
    let kept: HashSet<DateTime<Utc>> = if distinct_days.len() > 60 {
        distinct_days[distinct_days.len() - 60..].iter().copied().collect()
    } else {
        distinct_days.into_iter().collect()
    };

    let mut recent: Vec<ExperienceEvent> = by_day
        .into_iter()
        .filter(|(day, _)| kept.contains(day))
        .map(|(_, event)| (*event).clone())
        .collect();
    recent.sort_by_key(|e| e.created_at);
    Ok(recent)
}
