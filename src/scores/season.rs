use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};

use crate::error::SearchError;

/// A month/day pair without a year, ordered like its `MM-DD` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MonthDay {
    month: u32,
    day: u32,
}

impl MonthDay {
    pub fn of(date: NaiveDate) -> Self {
        MonthDay {
            month: date.month(),
            day: date.day(),
        }
    }
}

impl FromStr for MonthDay {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SearchError::InvalidSeasonBound(s.to_string());
        let (month, day) = s.trim().split_once('-').ok_or_else(invalid)?;
        if month.len() != 2 || day.len() != 2 {
            return Err(invalid());
        }
        let month: u32 = month.parse().map_err(|_| invalid())?;
        let day: u32 = day.parse().map_err(|_| invalid())?;
        // Validate against a leap year so 02-29 is accepted.
        NaiveDate::from_ymd_opt(2000, month, day).ok_or_else(invalid)?;
        Ok(MonthDay { month, day })
    }
}

impl fmt::Display for MonthDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{:02}", self.month, self.day)
    }
}

/// Active season window of a league.
///
/// With neither bound set the league plays year-round. A missing single bound
/// defaults to `01-01` / `12-31`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeasonWindow {
    pub from: Option<MonthDay>,
    pub to: Option<MonthDay>,
}

const SEASON_START: MonthDay = MonthDay { month: 1, day: 1 };
const SEASON_END: MonthDay = MonthDay { month: 12, day: 31 };

impl SeasonWindow {
    pub fn year_round() -> Self {
        SeasonWindow::default()
    }

    /// Build a window from optional `MM-DD` strings.
    pub fn parse(from: Option<&str>, to: Option<&str>) -> Result<Self, SearchError> {
        Ok(SeasonWindow {
            from: from.map(str::parse::<MonthDay>).transpose()?,
            to: to.map(str::parse::<MonthDay>).transpose()?,
        })
    }

    pub fn is_year_round(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    /// Whether `date` falls inside the season. Only month and day are
    /// compared; a `from` later than `to` wraps around New Year.
    pub fn contains(&self, date: NaiveDate) -> bool {
        if self.is_year_round() {
            return true;
        }
        let from = self.from.unwrap_or(SEASON_START);
        let to = self.to.unwrap_or(SEASON_END);
        let current = MonthDay::of(date);

        if from <= to {
            from <= current && current <= to
        } else {
            current >= from || current <= to
        }
    }
}

impl fmt::Display for SeasonWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to {}",
            self.from.unwrap_or(SEASON_START),
            self.to.unwrap_or(SEASON_END)
        )
    }
}
