//! Next-fire-time calculation for daily reminders.
//! Pure functions over any `chrono::TimeZone`; no cron expressions, just
//! "the next time the local clock reads HH:MM:00".

use chrono::{DateTime, Datelike, Days, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone};
use medirem_core::{TimeOfDay, Weekdays};

/// Earliest instant after `now` whose local time of day is `time`, with
/// seconds zeroed. Today's occurrence if it is still ahead, otherwise the
/// same wall time one calendar day later.
pub fn next_fire<Tz: TimeZone>(time: TimeOfDay, now: &DateTime<Tz>) -> DateTime<Tz> {
    let tz = now.timezone();
    let today = now.date_naive();
    let candidate = at_local(&tz, today, time);
    if candidate > *now {
        return candidate;
    }
    match today.checked_add_days(Days::new(1)) {
        Some(tomorrow) => at_local(&tz, tomorrow, time),
        None => candidate + Duration::days(1),
    }
}

/// Like [`next_fire`], but only on days in `weekdays`. `None` when the set
/// is empty.
pub fn next_fire_on<Tz: TimeZone>(
    time: TimeOfDay,
    weekdays: Weekdays,
    now: &DateTime<Tz>,
) -> Option<DateTime<Tz>> {
    if weekdays.is_empty() {
        return None;
    }
    let tz = now.timezone();
    let today = now.date_naive();
    // Today plus a full week covers every weekday with today's slot already past.
    (0..=7u64)
        .filter_map(|offset| today.checked_add_days(Days::new(offset)))
        .filter(|date| weekdays.contains(date.weekday()))
        .map(|date| at_local(&tz, date, time))
        .find(|candidate| candidate > now)
}

/// Resolve a local wall time to an instant. Ambiguous times take the
/// earlier instant; times inside a DST gap move past the gap.
fn at_local<Tz: TimeZone>(tz: &Tz, date: NaiveDate, time: TimeOfDay) -> DateTime<Tz> {
    let naive = date.and_time(time.naive());
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(t) => t,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => past_gap(tz, naive),
    }
}

fn past_gap<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    (1..=4)
        .map(|quarter| naive + Duration::minutes(15 * quarter))
        .find_map(|shifted| tz.from_local_datetime(&shifted).earliest())
        .unwrap_or_else(|| tz.from_utc_datetime(&naive))
}
