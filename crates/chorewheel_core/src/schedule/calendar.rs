//! Calendar arithmetic in local wall-clock time.
//!
//! # Invariants
//! - Month/year steps clamp the day to the target month's last day; they
//!   never spill into the following month.
//! - Local times inside a DST gap move forward by one hour; ambiguous local
//!   times resolve to the earliest instant.

use chrono::{
    DateTime, Datelike, Days, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc, Weekday,
};
use chrono_tz::Tz;

/// Adds whole calendar days, keeping the wall-clock time.
pub fn add_days(local: NaiveDateTime, days: u64) -> Option<NaiveDateTime> {
    local.checked_add_days(Days::new(days))
}

/// Adds whole months, clamping Jan 31 + 1 month to Feb 28/29.
pub fn add_months(local: NaiveDateTime, months: u32) -> Option<NaiveDateTime> {
    local.checked_add_months(Months::new(months))
}

/// Number of days in `month` of `year`.
pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = first.checked_add_months(Months::new(1))?;
    u32::try_from(next.signed_duration_since(first).num_days()).ok()
}

/// `day` of the given month, clamped to the month's last day.
pub fn clamped_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    let last = days_in_month(year, month)?;
    NaiveDate::from_ymd_opt(year, month, day.min(last))
}

/// First date strictly after `local` whose weekday is in `days`.
pub fn next_weekday_in(local: NaiveDateTime, days: &[Weekday]) -> Option<NaiveDateTime> {
    (1..=7)
        .filter_map(|offset| add_days(local, offset))
        .find(|candidate| days.contains(&candidate.weekday()))
}

/// `day` (clamped) of the first month after `local`'s month that is listed
/// in `months`; every month qualifies when `months` is empty.
pub fn next_day_of_month(local: NaiveDateTime, day: u32, months: &[u32]) -> Option<NaiveDateTime> {
    let month_start = NaiveDate::from_ymd_opt(local.year(), local.month(), 1)?;
    (1..=12)
        .filter_map(|offset| month_start.checked_add_months(Months::new(offset)))
        .find(|first| months.is_empty() || months.contains(&first.month()))
        .and_then(|first| clamped_date(first.year(), first.month(), day))
        .map(|date| date.and_time(local.time()))
}

/// Replaces the wall-clock time when a time-of-day is configured.
pub fn with_time_of_day(local: NaiveDateTime, time_of_day: Option<NaiveTime>) -> NaiveDateTime {
    match time_of_day {
        Some(time) => local.date().and_time(time),
        None => local,
    }
}

/// Converts a local wall-clock time in `tz` back to a UTC instant.
pub fn local_to_utc(tz: Tz, local: NaiveDateTime) -> Option<DateTime<Utc>> {
    let resolved = tz.from_local_datetime(&local).earliest().or_else(|| {
        let shifted = local.checked_add_signed(chrono::Duration::hours(1))?;
        tz.from_local_datetime(&shifted).earliest()
    })?;
    Some(resolved.with_timezone(&Utc))
}

/// Wall-clock view of `instant` in `tz`.
pub fn utc_to_local(tz: Tz, instant: DateTime<Utc>) -> NaiveDateTime {
    instant.with_timezone(&tz).naive_local()
}

#[cfg(test)]
mod tests {
    use super::{
        add_months, clamped_date, days_in_month, local_to_utc, next_day_of_month,
        next_weekday_in,
    };
    use chrono::{NaiveDate, NaiveDateTime, TimeZone, Utc, Weekday};
    use chrono_tz::Tz;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|date| date.and_hms_opt(h, 0, 0))
            .expect("valid test datetime")
    }

    #[test]
    fn days_in_month_handles_leap_years() {
        assert_eq!(days_in_month(2024, 2), Some(29));
        assert_eq!(days_in_month(2023, 2), Some(28));
        assert_eq!(days_in_month(2023, 12), Some(31));
        assert_eq!(days_in_month(2023, 13), None);
    }

    #[test]
    fn add_months_clamps_to_month_end() {
        assert_eq!(add_months(at(2023, 1, 31, 8), 1), Some(at(2023, 2, 28, 8)));
        assert_eq!(add_months(at(2024, 1, 31, 8), 1), Some(at(2024, 2, 29, 8)));
        assert_eq!(add_months(at(2024, 2, 29, 8), 12), Some(at(2025, 2, 28, 8)));
    }

    #[test]
    fn clamped_date_never_overflows_month() {
        assert_eq!(
            clamped_date(2023, 4, 31),
            NaiveDate::from_ymd_opt(2023, 4, 30)
        );
    }

    #[test]
    fn next_weekday_is_strictly_after_reference() {
        // 2024-01-01 is a Monday.
        let monday = at(2024, 1, 1, 9);
        assert_eq!(
            next_weekday_in(monday, &[Weekday::Mon]),
            Some(at(2024, 1, 8, 9))
        );
        assert_eq!(
            next_weekday_in(monday, &[Weekday::Mon, Weekday::Wed]),
            Some(at(2024, 1, 3, 9))
        );
        assert_eq!(next_weekday_in(monday, &[]), None);
    }

    #[test]
    fn next_day_of_month_skips_unlisted_months() {
        let reference = at(2024, 1, 15, 7);
        assert_eq!(next_day_of_month(reference, 15, &[]), Some(at(2024, 2, 15, 7)));
        assert_eq!(next_day_of_month(reference, 31, &[4]), Some(at(2024, 4, 30, 7)));
        assert_eq!(next_day_of_month(reference, 10, &[1]), Some(at(2025, 1, 10, 7)));
    }

    #[test]
    fn gap_times_move_forward() {
        // 02:30 does not exist in New York on 2024-03-10.
        let resolved =
            local_to_utc(Tz::America__New_York, at(2024, 3, 10, 2) + chrono::Duration::minutes(30))
                .expect("gap resolves");
        assert_eq!(resolved, Utc.with_ymd_and_hms(2024, 3, 10, 7, 30, 0).unwrap());
    }

    #[test]
    fn ambiguous_times_take_earliest_instant() {
        // 01:30 happens twice in New York on 2024-11-03; EDT comes first.
        let resolved =
            local_to_utc(Tz::America__New_York, at(2024, 11, 3, 1) + chrono::Duration::minutes(30))
                .expect("ambiguous time resolves");
        assert_eq!(resolved, Utc.with_ymd_and_hms(2024, 11, 3, 5, 30, 0).unwrap());
    }
}
