//! Billing-period arithmetic
//!
//! Quota windows reset at the start of the next calendar month (UTC).

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};

/// Midnight UTC on the first day of the month following `now`.
pub fn next_month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let (year, month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };

    let date = NaiveDate::from_ymd_opt(year, month, 1)
        .expect("first of month is always a valid date");

    Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).expect("midnight is valid"))
}

/// Seconds from `now` until the next calendar month begins.
pub fn seconds_until_next_month(now: DateTime<Utc>) -> u64 {
    (next_month_start(now) - now).num_seconds().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_next_month_start_mid_month() {
        assert_eq!(next_month_start(at(2026, 8, 27, 12)), at(2026, 9, 1, 0));
    }

    #[test]
    fn test_next_month_start_december_rolls_year() {
        assert_eq!(next_month_start(at(2026, 12, 31, 23)), at(2027, 1, 1, 0));
    }

    #[test]
    fn test_seconds_until_next_month() {
        let now = Utc.with_ymd_and_hms(2026, 8, 31, 23, 59, 0).unwrap();
        assert_eq!(seconds_until_next_month(now), 60);
    }

    #[test]
    fn test_seconds_are_positive_at_month_boundary() {
        let boundary = at(2026, 9, 1, 0);
        // An entire month ahead, never zero or negative
        assert!(seconds_until_next_month(boundary) > 0);
    }
}
