//! Time-range selection and date filtering.
//!
//! "Now" is always passed in. Nothing in this module reads the clock, so the
//! same inputs give the same cutoff in tests and in production.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeDelta, TimeZone, Utc};
use log::debug;

const MS_PER_DAY: u64 = 24 * 60 * 60 * 1000;

/// Symbolic time range offered by the map's time filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum TimeFilterOption {
    #[default]
    AllTime,
    Today,
    Last7Days,
    Last30Days,
}

impl TimeFilterOption {
    /// All options in display order.
    pub const ALL: [TimeFilterOption; 4] = [
        TimeFilterOption::AllTime,
        TimeFilterOption::Today,
        TimeFilterOption::Last7Days,
        TimeFilterOption::Last30Days,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TimeFilterOption::AllTime => "All Time",
            TimeFilterOption::Today => "Today",
            TimeFilterOption::Last7Days => "Last 7 Days",
            TimeFilterOption::Last30Days => "Last 30 Days",
        }
    }
}

/// Earliest instant included by `filter`, relative to `now`.
///
/// - `AllTime`: the Unix epoch
/// - `Today`: midnight of `now`'s calendar day in `now`'s time zone
/// - `Last7Days` / `Last30Days`: exactly 7 / 30 × 24h before `now`
///
/// If local midnight falls into a DST gap, midnight at `now`'s current UTC
/// offset is used instead.
///
/// # Example
///
/// ```rust
/// use chrono::{FixedOffset, TimeZone};
/// use crime_safety::{cutoff_for, TimeFilterOption};
///
/// let manila = FixedOffset::east_opt(8 * 3600).unwrap();
/// let now = manila.with_ymd_and_hms(2024, 3, 10, 15, 30, 0).unwrap();
///
/// let cutoff = cutoff_for(TimeFilterOption::Today, &now);
/// assert_eq!(cutoff, manila.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap());
/// ```
pub fn cutoff_for<Tz: TimeZone>(filter: TimeFilterOption, now: &DateTime<Tz>) -> DateTime<Utc> {
    match filter {
        TimeFilterOption::AllTime => DateTime::<Utc>::UNIX_EPOCH,
        TimeFilterOption::Today => local_midnight(now),
        TimeFilterOption::Last7Days => now.with_timezone(&Utc) - TimeDelta::days(7),
        TimeFilterOption::Last30Days => now.with_timezone(&Utc) - TimeDelta::days(30),
    }
}

fn local_midnight<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Utc> {
    let midnight = now.date_naive().and_time(NaiveTime::MIN);

    match now.timezone().from_local_datetime(&midnight).earliest() {
        Some(local) => local.with_timezone(&Utc),
        None => {
            let offset = now.offset().fix();
            midnight.and_utc() - TimeDelta::seconds(i64::from(offset.local_minus_utc()))
        }
    }
}

/// Keep records dated at or after `cutoff`, preserving order.
///
/// `date_of` extracts a record's instant; records for which it returns `None`
/// (unparseable dates) are dropped rather than reported.
///
/// # Example
///
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use crime_safety::{filter_since, parse_timestamp};
///
/// let raw = vec!["2024-03-01", "not a date", "2024-02-01"];
/// let cutoff = Utc.with_ymd_and_hms(2024, 2, 15, 0, 0, 0).unwrap();
///
/// let kept = filter_since(&raw, cutoff, |s| parse_timestamp(s));
/// assert_eq!(kept, vec!["2024-03-01"]);
/// ```
pub fn filter_since<T, F>(records: &[T], cutoff: DateTime<Utc>, date_of: F) -> Vec<T>
where
    T: Clone,
    F: Fn(&T) -> Option<DateTime<Utc>>,
{
    let mut unparseable = 0usize;

    let kept: Vec<T> = records
        .iter()
        .filter(|record| match date_of(record) {
            Some(date) => date >= cutoff,
            None => {
                unparseable += 1;
                false
            }
        })
        .cloned()
        .collect();

    if unparseable > 0 {
        debug!(
            "[TimeWindow] Dropped {} of {} records with unparseable dates",
            unparseable,
            records.len()
        );
    }

    kept
}

/// Absolute whole-day difference between two instants, rounded up.
///
/// Any non-zero remainder counts as a full day: 2.4 hours apart is 1 day,
/// 7 days and 1 ms apart is 8 days. Identical instants are 0 days apart.
pub fn days_between(a: DateTime<Utc>, b: DateTime<Utc>) -> u64 {
    (b - a).num_milliseconds().unsigned_abs().div_ceil(MS_PER_DAY)
}

/// Parse a date string as delivered by incident feeds.
///
/// Accepts RFC 3339 (`2024-03-10T08:15:00+08:00`), naive ISO-8601 date-times
/// (`2024-03-10T08:15:00`, `2024-03-10 08:15:00`, read as UTC) and bare dates
/// (`2024-03-10`, read as UTC midnight). Returns `None` for anything else.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, LocalResult};

    fn manila() -> FixedOffset {
        FixedOffset::east_opt(8 * 3600).unwrap()
    }

    #[test]
    fn test_all_time_is_epoch() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        assert_eq!(cutoff_for(TimeFilterOption::AllTime, &now).timestamp(), 0);
    }

    #[test]
    fn test_today_truncates_to_local_midnight() {
        let now = manila().with_ymd_and_hms(2024, 3, 10, 0, 30, 0).unwrap();
        let cutoff = cutoff_for(TimeFilterOption::Today, &now);
        // Manila midnight is 16:00 UTC the previous day
        assert_eq!(cutoff, Utc.with_ymd_and_hms(2024, 3, 9, 16, 0, 0).unwrap());
    }

    #[test]
    fn test_today_filter_boundary() {
        let tz = manila();
        let now = tz.with_ymd_and_hms(2024, 3, 10, 18, 45, 0).unwrap();
        let cutoff = cutoff_for(TimeFilterOption::Today, &now);

        let yesterday_late = tz.with_ymd_and_hms(2024, 3, 9, 23, 59, 0).unwrap().with_timezone(&Utc);
        let today_midnight = tz.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap().with_timezone(&Utc);

        let records = vec![yesterday_late, today_midnight];
        let kept = filter_since(&records, cutoff, |d| Some(*d));
        assert_eq!(kept, vec![today_midnight]);
    }

    /// UTC-3 zone whose clocks jump from 23:59:59 straight to 01:00 on
    /// 2024-03-10, so that day has no local midnight.
    #[derive(Debug, Clone, Copy)]
    struct MidnightGap;

    impl MidnightGap {
        fn offset() -> FixedOffset {
            FixedOffset::west_opt(3 * 3600).unwrap()
        }

        fn gap_day() -> NaiveDate {
            NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
        }
    }

    impl TimeZone for MidnightGap {
        type Offset = FixedOffset;

        fn from_offset(_offset: &FixedOffset) -> Self {
            MidnightGap
        }

        fn offset_from_local_date(&self, _local: &NaiveDate) -> LocalResult<FixedOffset> {
            LocalResult::Single(Self::offset())
        }

        fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> LocalResult<FixedOffset> {
            let skipped = NaiveTime::from_hms_opt(1, 0, 0).unwrap();
            if local.date() == Self::gap_day() && local.time() < skipped {
                LocalResult::None
            } else {
                LocalResult::Single(Self::offset())
            }
        }

        fn offset_from_utc_date(&self, _utc: &NaiveDate) -> FixedOffset {
            Self::offset()
        }

        fn offset_from_utc_datetime(&self, _utc: &NaiveDateTime) -> FixedOffset {
            Self::offset()
        }
    }

    #[test]
    fn test_today_falls_back_when_midnight_is_skipped() {
        // 12:00 local on the gap day
        let now = MidnightGap.from_utc_datetime(
            &NaiveDate::from_ymd_opt(2024, 3, 10).unwrap().and_hms_opt(15, 0, 0).unwrap(),
        );
        assert_eq!(
            cutoff_for(TimeFilterOption::Today, &now),
            Utc.with_ymd_and_hms(2024, 3, 10, 3, 0, 0).unwrap()
        );

        // A regular day resolves midnight through the zone itself
        let next_day = now + TimeDelta::days(1);
        assert_eq!(
            cutoff_for(TimeFilterOption::Today, &next_day),
            Utc.with_ymd_and_hms(2024, 3, 11, 3, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_rolling_windows() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        assert_eq!(
            cutoff_for(TimeFilterOption::Last7Days, &now),
            Utc.with_ymd_and_hms(2024, 3, 3, 12, 0, 0).unwrap()
        );
        assert_eq!(
            cutoff_for(TimeFilterOption::Last30Days, &now),
            Utc.with_ymd_and_hms(2024, 2, 9, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_filter_since_is_inclusive_and_ordered() {
        let cutoff = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let records = vec![
            Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 2, 28, 0, 0, 0).unwrap(),
            cutoff,
        ];
        let kept = filter_since(&records, cutoff, |d| Some(*d));
        assert_eq!(kept, vec![records[0], cutoff]);
    }

    #[test]
    fn test_filter_since_drops_unparseable() {
        let records = vec!["2024-03-05", "yesterday", "", "2024-13-40"];
        let kept = filter_since(&records, DateTime::<Utc>::UNIX_EPOCH, |s| parse_timestamp(s));
        assert_eq!(kept, vec!["2024-03-05"]);
    }

    #[test]
    fn test_days_between_rounds_up() {
        let a = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();
        assert_eq!(days_between(a, a), 0);
        assert_eq!(days_between(a, a + TimeDelta::hours(2)), 1);
        assert_eq!(days_between(a, a + TimeDelta::days(1)), 1);
        assert_eq!(days_between(a, a + TimeDelta::days(7) + TimeDelta::milliseconds(1)), 8);
    }

    #[test]
    fn test_days_between_is_absolute() {
        let a = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();
        let b = a + TimeDelta::hours(50);
        assert_eq!(days_between(a, b), days_between(b, a));
        assert_eq!(days_between(b, a), 3);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 10, 0, 15, 0).unwrap();
        assert_eq!(parse_timestamp("2024-03-10T08:15:00+08:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-10T00:15:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-10T00:15:00.000"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-10 00:15:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-03-10"),
            Some(Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_timestamp("10/03/2024"), None);
    }

    #[test]
    fn test_labels() {
        let labels: Vec<&str> = TimeFilterOption::ALL.iter().map(|f| f.label()).collect();
        assert_eq!(labels, vec!["All Time", "Today", "Last 7 Days", "Last 30 Days"]);
        assert_eq!(TimeFilterOption::default(), TimeFilterOption::AllTime);
    }
}
