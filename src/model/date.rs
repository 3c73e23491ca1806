use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Storage format for calendar dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a stored date string.
///
/// Accepts plain ISO dates as well as full timestamps, which some writers put
/// in the same fields; only the calendar day is kept.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in &[DATE_FORMAT, "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|dt| dt.date())
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Shift a date by a signed number of days, saturating at chrono's limits.
pub fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    chrono::Duration::try_days(days)
        .and_then(|delta| date.checked_add_signed(delta))
        .unwrap_or(if days < 0 {
            NaiveDate::MIN
        } else {
            NaiveDate::MAX
        })
}

/// Last day of the given month, if the month exists.
pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    if !(1..=12).contains(&month) {
        return None;
    }
    let (ny, nm) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(ny, nm, 1)?.pred_opt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn parses_iso_dates_and_timestamps() {
        assert_eq!(parse_date("2025-01-10"), Some(d(2025, 1, 10)));
        assert_eq!(parse_date(" 2025/03/02 "), Some(d(2025, 3, 2)));
        assert_eq!(parse_date("2025-01-10T00:00:00.000Z"), Some(d(2025, 1, 10)));
        assert_eq!(parse_date("2025-01-10T08:30:00"), Some(d(2025, 1, 10)));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("next tuesday"), None);
        assert_eq!(parse_date("2025-02-30"), None);
    }

    #[test]
    fn month_ends() {
        assert_eq!(last_day_of_month(2024, 2), Some(d(2024, 2, 29)));
        assert_eq!(last_day_of_month(2025, 12), Some(d(2025, 12, 31)));
        assert_eq!(last_day_of_month(2025, 13), None);
    }

    #[test]
    fn add_days_saturates() {
        assert_eq!(add_days(d(2025, 1, 31), 1), d(2025, 2, 1));
        assert_eq!(add_days(d(2025, 1, 1), -1), d(2024, 12, 31));
        assert_eq!(add_days(d(2025, 1, 1), i64::MAX), NaiveDate::MAX);
    }
}
