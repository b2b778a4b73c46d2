use crate::error::{PipelineError, Result};
use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static YYYYMM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})(\d{2})$").expect("valid regex"));

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default()
}

/// Parse `"YYYYMM"` into the first day of that month.
/// Surrounding whitespace is ignored; anything else returns `None`.
pub fn parse_yyyymm(s: &str) -> Option<NaiveDate> {
    let caps = YYYYMM.captures(s.trim())?;
    let year: i32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Days since 1970-01-01, the Arrow `Date32` encoding.
pub fn date_to_days(date: NaiveDate) -> i32 {
    (date - epoch()).num_days() as i32
}

pub fn days_to_date(days: i32) -> Option<NaiveDate> {
    epoch().checked_add_signed(chrono::Duration::days(days as i64))
}

/// A calendar month, the granularity of every date bound in the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthYear {
    pub year: i32,
    pub month: u32,
}

impl MonthYear {
    pub fn new(month: u32, year: i32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(PipelineError::validation(format!(
                "month {} is outside 01-12",
                month
            )));
        }
        Ok(Self { year, month })
    }

    /// Parse the request form: a two-digit month (`"01"`-`"12"`) and a
    /// four-digit year.
    pub fn parse(month: &str, year: &str) -> Result<Self> {
        let month = month.trim();
        let year = year.trim();
        if month.len() != 2 || !month.chars().all(|c| c.is_ascii_digit()) {
            return Err(PipelineError::validation(format!(
                "month '{}' must be two digits 01-12",
                month
            )));
        }
        if year.len() != 4 || !year.chars().all(|c| c.is_ascii_digit()) {
            return Err(PipelineError::validation(format!(
                "year '{}' must be four digits",
                year
            )));
        }
        let m: u32 = month
            .parse()
            .map_err(|_| PipelineError::validation(format!("invalid month '{}'", month)))?;
        let y: i32 = year
            .parse()
            .map_err(|_| PipelineError::validation(format!("invalid year '{}'", year)))?;
        Self::new(m, y)
    }

    pub fn first_day(&self) -> NaiveDate {
        // month is validated on construction
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// `"MM"` token.
    pub fn month_token(&self) -> String {
        format!("{:02}", self.month)
    }

    /// `"YYYY"` token.
    pub fn year_token(&self) -> String {
        format!("{:04}", self.year)
    }
}

impl fmt::Display for MonthYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{:04}", self.month, self.year)
    }
}
