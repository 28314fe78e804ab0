use thiserror::Error;

/// Errors raised by the game search core.
///
/// Per-day provider failures never show up here: they are absorbed by the
/// day fetcher and count as an empty day.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The query is missing a league, teams or has an unusable field.
    #[error("malformed query: {0}")]
    MalformedQuery(String),

    /// A date could not be normalized to `YYYY-MM-DD`.
    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    /// A season bound could not be parsed as `MM-DD`.
    #[error("invalid season bound '{0}', expected MM-DD")]
    InvalidSeasonBound(String),

    /// Day arithmetic left the representable calendar.
    #[error("date {base} shifted by {offset} days is out of range")]
    DateOutOfRange { base: chrono::NaiveDate, offset: i64 },

    /// The search loop itself failed (including panics inside it).
    #[error("search orchestration failed: {0}")]
    Orchestration(String),
}

impl SearchError {
    /// Whether the error is the caller's fault and should fail fast.
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            SearchError::MalformedQuery(_)
                | SearchError::InvalidDate(_)
                | SearchError::InvalidSeasonBound(_)
        )
    }
}
