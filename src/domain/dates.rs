use crate::odata::datetime_literal;
use chrono::{DateTime, Days, Local, NaiveDate, NaiveTime, TimeZone, Utc};

/// Midnight at the start of `date` in `tz`, as UTC. On a DST gap at midnight the first
/// existing local instant after it is used.
pub fn local_midnight<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    (0..=2)
        .filter_map(|h| tz.from_local_datetime(&(naive + chrono::Duration::hours(h))).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .next()
        .unwrap_or_else(|| naive.and_utc())
}

/// `[start, end)` of `date` in `tz`, in UTC.
pub fn day_bounds_in<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    days_bounds_in(date, 1, tz)
}

/// `[start of date, start of date + days)` in `tz`, in UTC.
pub fn days_bounds_in<Tz: TimeZone>(date: NaiveDate, days: u32, tz: &Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = local_midnight(date, tz);
    let end = date
        .checked_add_days(Days::new(u64::from(days)))
        .map_or(start + chrono::Duration::days(i64::from(days)), |next| local_midnight(next, tz));
    (start, end)
}

/// Bounds of `date` in the client's local time zone.
pub fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    day_bounds_in(date, &Local)
}

pub fn today_local() -> NaiveDate {
    Local::now().date_naive()
}

/// `{field} ge {from} and {field} lt {to}`
pub fn range_filter(field: &str, from: DateTime<Utc>, to: DateTime<Utc>) -> String {
    format!("{field} ge {} and {field} lt {}", datetime_literal(from), datetime_literal(to))
}
