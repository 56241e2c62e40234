// calendar.rs - Timezone-aware calendar kernel.
//
// Every function here is pure over its `(instant, zone)` arguments. `zone` is always an
// IANA zone name (e.g. "America/Chicago"); unlike `chrono::Local`/`FixedOffset`, resolving
// one requires the `chrono-tz` zone database so DST transitions and non-hour offsets are
// handled correctly.

use crate::error::{Error, Result};
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use std::str::FromStr;

/// Half-open-by-a-millisecond local interval, expressed back in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Interval {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant <= self.end
    }
}

/// Parse an IANA zone name. The one place an unrecognized zone becomes a typed failure
/// rather than a silent "no interval" — per §4.1, `start_of_day` must not fail silently.
pub fn parse_zone(zone: &str) -> Result<Tz> {
    Tz::from_str(zone).map_err(Error::from)
}

fn try_parse_zone(zone: &str) -> Option<Tz> {
    Tz::from_str(zone).ok()
}

/// Midnight local time for `date` in `tz`, expressed in UTC. DST "fall back" can make a
/// local midnight ambiguous (two UTC instants map to it); we deterministically take the
/// earlier of the two, falling back to the later if a gap swallows midnight entirely.
fn localize_midnight(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let naive_midnight = date
        .and_hms_opt(0, 0, 0)
        .expect("00:00:00 is always a valid NaiveTime");
    match tz.from_local_datetime(&naive_midnight) {
        chrono::LocalResult::Single(dt) => dt.with_timezone(&Utc),
        chrono::LocalResult::Ambiguous(earlier, _later) => earlier.with_timezone(&Utc),
        chrono::LocalResult::None => {
            // Midnight falls inside a DST "spring forward" gap; nudge forward an hour at
            // a time until we land on a valid local instant.
            let mut probe = naive_midnight;
            loop {
                probe += Duration::hours(1);
                if let chrono::LocalResult::Single(dt) = tz.from_local_datetime(&probe) {
                    return dt.with_timezone(&Utc);
                }
            }
        }
    }
}

/// The instant representing 00:00:00 local time in `zone` on the calendar day containing
/// `instant`.
pub fn start_of_day(instant: DateTime<Utc>, zone: &str) -> Result<DateTime<Utc>> {
    let tz = parse_zone(zone)?;
    let local_date = instant.with_timezone(&tz).date_naive();
    Ok(localize_midnight(local_date, tz))
}

/// `start_of_day(a, zone) == start_of_day(b, zone)`.
pub fn same_day(a: DateTime<Utc>, b: DateTime<Utc>, zone: &str) -> Result<bool> {
    Ok(start_of_day(a, zone)? == start_of_day(b, zone)?)
}

/// Rounded whole-day difference of `start_of_day(b) − start_of_day(a)`.
///
/// Computed as the difference of the two local calendar dates rather than the UTC instant
/// delta: a local day can be 23h or 25h long across a DST transition, so truncating
/// `(start_of_day(b) - start_of_day(a)).num_days()` would misreport a gap that spans one.
pub fn days_between(a: DateTime<Utc>, b: DateTime<Utc>, zone: &str) -> Result<i64> {
    let tz = parse_zone(zone)?;
    let date_a = a.with_timezone(&tz).date_naive();
    let date_b = b.with_timezone(&tz).date_naive();
    Ok((date_b - date_a).num_days())
}

/// Step `instant`'s local calendar date by `delta` days and return that date's local
/// midnight, expressed in UTC. Unlike subtracting a raw `Duration::days`, this walks actual
/// calendar dates first, so a DST-shortened or -lengthened local day never skews the result.
pub fn shift_local_days(instant: DateTime<Utc>, zone: &str, delta: i64) -> Result<DateTime<Utc>> {
    let tz = parse_zone(zone)?;
    let local_date = instant.with_timezone(&tz).date_naive();
    let shifted = local_date + Duration::days(delta);
    Ok(localize_midnight(shifted, tz))
}

/// Floored wall-time difference in hours; no timezone needed.
pub fn hours_between(a: DateTime<Utc>, b: DateTime<Utc>) -> i64 {
    (b - a).num_seconds().div_euclid(3600)
}

/// Sunday 00:00 local through Saturday 23:59:59.999 local containing `instant`.
/// `None` if `zone` is not a recognized IANA name.
pub fn week_interval(instant: DateTime<Utc>, zone: &str) -> Option<Interval> {
    let tz = try_parse_zone(zone)?;
    let local_date = instant.with_timezone(&tz).date_naive();
    let days_from_sunday = local_date.weekday().num_days_from_sunday() as i64;
    let sunday = local_date - Duration::days(days_from_sunday);
    let saturday = sunday + Duration::days(6);
    Some(Interval {
        start: localize_midnight(sunday, tz),
        end: localize_midnight(saturday, tz) + Duration::days(1) - Duration::milliseconds(1),
    })
}

/// First-of-month 00:00 local through last-of-month 23:59:59.999 local containing
/// `instant`. The last day is derived by stepping to the first of the next month and
/// subtracting one day, to avoid month-length hazards. `None` if `zone` is unrecognized.
pub fn month_interval(instant: DateTime<Utc>, zone: &str) -> Option<Interval> {
    let tz = try_parse_zone(zone)?;
    let local_date = instant.with_timezone(&tz).date_naive();
    let first_of_month = local_date.with_day(1)?;
    let first_of_next_month = if first_of_month.month() == 12 {
        NaiveDate::from_ymd_opt(first_of_month.year() + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(first_of_month.year(), first_of_month.month() + 1, 1)?
    };
    let last_of_month = first_of_next_month - Duration::days(1);
    Some(Interval {
        start: localize_midnight(first_of_month, tz),
        end: localize_midnight(last_of_month, tz) + Duration::days(1) - Duration::milliseconds(1),
    })
}

/// January 1 00:00 local through December 31 23:59:59.999 local containing `instant`.
/// `None` if `zone` is unrecognized.
pub fn year_interval(instant: DateTime<Utc>, zone: &str) -> Option<Interval> {
    let tz = try_parse_zone(zone)?;
    let year = instant.with_timezone(&tz).date_naive().year();
    let jan1 = NaiveDate::from_ymd_opt(year, 1, 1)?;
    let dec31 = NaiveDate::from_ymd_opt(year, 12, 31)?;
    Some(Interval {
        start: localize_midnight(jan1, tz),
        end: localize_midnight(dec31, tz) + Duration::days(1) - Duration::milliseconds(1),
    })
}
