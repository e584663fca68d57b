//! Date tokens and the service's publication calendar.

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, ValidationError};

/// Service calendar constants.
pub mod constants {
    use chrono::NaiveDate;

    /// Literal accepted in place of a date.
    pub const LATEST: &str = "latest";

    /// Hour (UTC) at which the service publishes the day's rates.
    pub const PUBLISH_HOUR_UTC: u32 = 15;

    /// Earliest date the service has rates for (1999-01-04).
    pub fn min_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(1999, 1, 4).unwrap_or(NaiveDate::MIN)
    }
}

/// A timestamp with timezone (always UTC).
pub type Timestamp = DateTime<Utc>;

/// Get the current timestamp.
pub fn now() -> Timestamp {
    Utc::now()
}

/// A requested quote date: either the most recent publication or a calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum DateToken {
    #[default]
    Latest,
    On(NaiveDate),
}

impl DateToken {
    pub fn is_latest(&self) -> bool {
        matches!(self, DateToken::Latest)
    }
}

impl fmt::Display for DateToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateToken::Latest => write!(f, "{}", constants::LATEST),
            DateToken::On(date) => write!(f, "{}", date.format("%Y-%m-%d")),
        }
    }
}

impl From<NaiveDate> for DateToken {
    fn from(date: NaiveDate) -> Self {
        DateToken::On(date)
    }
}

impl FromStr for DateToken {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self> {
        parse_date(s)
    }
}

impl From<DateToken> for String {
    fn from(token: DateToken) -> Self {
        token.to_string()
    }
}

impl TryFrom<String> for DateToken {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self> {
        parse_date(&s)
    }
}

/// Parse `latest` or `YYYY-MM-DD`.
///
/// Whitespace around the text and around each field is tolerated, as are
/// leading zeros. The fields must name a real calendar day.
pub fn parse_date(text: &str) -> Result<DateToken> {
    let trimmed = text.trim();
    if trimmed == constants::LATEST {
        return Ok(DateToken::Latest);
    }

    let invalid = || ValidationError::InvalidDate(text.to_string());
    let fields: Vec<&str> = trimmed.split('-').map(str::trim).collect();
    let [year, month, day] = fields.as_slice() else {
        return Err(invalid());
    };

    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month: u32 = month.parse().map_err(|_| invalid())?;
    let day: u32 = day.parse().map_err(|_| invalid())?;

    NaiveDate::from_ymd_opt(year, month, day)
        .map(DateToken::On)
        .ok_or_else(invalid)
}

/// Resolve a token to the date the service's rates were last published on.
pub fn resolve_update_date(token: DateToken) -> NaiveDate {
    resolve_update_date_at(token, now())
}

/// Resolve a token against an explicit clock.
///
/// Before the daily publish hour the service still serves yesterday's rates.
pub fn resolve_update_date_at(token: DateToken, now: Timestamp) -> NaiveDate {
    match token {
        DateToken::On(date) => date,
        DateToken::Latest => {
            let today = now.date_naive();
            if now.hour() < constants::PUBLISH_HOUR_UTC {
                today.pred_opt().unwrap_or(today)
            } else {
                today
            }
        }
    }
}

/// Whether a token names a date the service can quote.
pub fn is_valid_date(token: DateToken) -> bool {
    is_valid_date_at(token, now())
}

/// `is_valid_date` against an explicit clock.
pub fn is_valid_date_at(token: DateToken, now: Timestamp) -> bool {
    match token {
        DateToken::Latest => true,
        DateToken::On(date) => {
            let newest = resolve_update_date_at(DateToken::Latest, now);
            date >= constants::min_date() && date <= newest
        }
    }
}

/// Fail with `InvalidDate` unless the token is quotable.
pub fn validate_date_at(token: DateToken, now: Timestamp) -> Result<()> {
    if is_valid_date_at(token, now) {
        Ok(())
    } else {
        Err(ValidationError::InvalidDate(token.to_string()))
    }
}
