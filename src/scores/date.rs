//! Calendar-date helpers: normalization to `YYYY-MM-DD`, day offsets and the
//! clock that decides what "today" is.

use chrono::{DateTime, Local, NaiveDate, TimeZone};

use crate::error::SearchError;

pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// Anything that can be normalized to a calendar date.
///
/// Strings must be exactly `YYYY-MM-DD`; rich date values drop their time
/// component. Malformed input fails instead of producing a date that would
/// never match anything.
pub trait ToGameDate {
    fn to_game_date(&self) -> Result<NaiveDate, SearchError>;
}

impl ToGameDate for NaiveDate {
    fn to_game_date(&self) -> Result<NaiveDate, SearchError> {
        Ok(*self)
    }
}

impl ToGameDate for str {
    fn to_game_date(&self) -> Result<NaiveDate, SearchError> {
        let trimmed = self.trim();
        // chrono accepts unpadded fields, so insist on the canonical width
        if trimmed.len() != 10 {
            return Err(SearchError::InvalidDate(self.to_string()));
        }
        NaiveDate::parse_from_str(trimmed, ISO_DATE_FORMAT)
            .map_err(|_| SearchError::InvalidDate(self.to_string()))
    }
}

impl ToGameDate for String {
    fn to_game_date(&self) -> Result<NaiveDate, SearchError> {
        self.as_str().to_game_date()
    }
}

impl<Tz: TimeZone> ToGameDate for DateTime<Tz> {
    fn to_game_date(&self) -> Result<NaiveDate, SearchError> {
        Ok(self.date_naive())
    }
}

impl<T: ToGameDate + ?Sized> ToGameDate for &T {
    fn to_game_date(&self) -> Result<NaiveDate, SearchError> {
        (**self).to_game_date()
    }
}

pub fn iso_date(date: NaiveDate) -> String {
    date.format(ISO_DATE_FORMAT).to_string()
}

/// Shift `base` by a signed number of days.
pub fn shift_days(base: NaiveDate, offset: i64) -> Result<NaiveDate, SearchError> {
    base.checked_add_signed(chrono::Duration::days(offset))
        .ok_or(SearchError::DateOutOfRange { base, offset })
}

/// Absolute number of calendar days between two dates.
pub fn day_distance(a: NaiveDate, b: NaiveDate) -> u64 {
    (a - b).num_days().unsigned_abs()
}

/// Source of the current calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clock {
    /// Local wall-clock date.
    System,
    /// Fixed date, for deterministic runs and tests.
    Fixed(NaiveDate),
}

impl Clock {
    pub fn from_fake_date(fake_date: Option<NaiveDate>) -> Self {
        match fake_date {
            Some(date) => Clock::Fixed(date),
            None => Clock::System,
        }
    }

    pub fn today(&self) -> NaiveDate {
        match self {
            Clock::System => Local::now().date_naive(),
            Clock::Fixed(date) => *date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, ISO_DATE_FORMAT).unwrap()
    }

    #[test]
    fn test_string_and_rich_dates_normalize_alike() {
        let from_str = "2024-07-15".to_game_date().unwrap();
        let from_string = String::from("2024-07-15").to_game_date().unwrap();
        let from_datetime = Utc.with_ymd_and_hms(2024, 7, 15, 23, 59, 0).unwrap().to_game_date().unwrap();
        assert_eq!(from_str, date("2024-07-15"));
        assert_eq!(from_string, from_str);
        assert_eq!(from_datetime, from_str);
    }

    #[test]
    fn test_malformed_dates_fail_fast() {
        for bad in ["", "2024-7-15", "15-07-2024", "2024-02-30", "yesterday", "2024-07-15T00:00"] {
            assert!(
                matches!(bad.to_game_date(), Err(SearchError::InvalidDate(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_shift_days_crosses_month_and_year() {
        assert_eq!(shift_days(date("2024-12-31"), 1).unwrap(), date("2025-01-01"));
        assert_eq!(shift_days(date("2024-03-01"), -1).unwrap(), date("2024-02-29"));
        assert!(shift_days(NaiveDate::MAX, 1).is_err());
    }

    #[test]
    fn test_day_distance_is_symmetric() {
        assert_eq!(day_distance(date("2024-07-10"), date("2024-07-15")), 5);
        assert_eq!(day_distance(date("2024-07-20"), date("2024-07-15")), 5);
        assert_eq!(day_distance(date("2024-07-15"), date("2024-07-15")), 0);
    }

    #[test]
    fn test_fixed_clock_returns_fake_date() {
        let clock = Clock::from_fake_date(Some(date("2024-10-15")));
        assert_eq!(clock.today(), date("2024-10-15"));
        assert_eq!(Clock::from_fake_date(None), Clock::System);
    }
}
