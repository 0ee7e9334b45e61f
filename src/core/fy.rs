use chrono::{Datelike, NaiveDate};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Label given to rows whose date is missing or unparseable
pub const UNKNOWN_FINANCIAL_YEAR: &str = "Unknown";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid financial year '{0}', expected e.g. 2024-2025 or 2024-25")]
pub struct ParseFinancialYearError(String);

/// Australian Financial Year (runs 1 July to 30 June)
/// The year value represents the start year (e.g., 2024 = 2024-2025 financial year)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
pub struct FinancialYear(pub i32);

impl FinancialYear {
    /// Create a financial year from a date
    pub fn from_date(date: NaiveDate) -> Self {
        // July to December belongs to the year starting this July,
        // January to June to the year that started last July
        if date.month() >= 7 {
            FinancialYear(date.year())
        } else {
            FinancialYear(date.year() - 1)
        }
    }

    /// Start date of the financial year (1 July)
    pub fn start_date(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.0, 7, 1).expect("1 July is a valid date")
    }

    /// End date of the financial year (30 June)
    pub fn end_date(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.0 + 1, 6, 30).expect("30 June is a valid date")
    }

    pub fn next(&self) -> Self {
        FinancialYear(self.0 + 1)
    }

    /// Display as "2024-2025" format
    pub fn label(&self) -> String {
        format!("{}-{}", self.0, self.0 + 1)
    }
}

impl std::fmt::Display for FinancialYear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for FinancialYear {
    type Err = ParseFinancialYearError;

    /// Accepts "2024-2025" and the short "2024-25" form
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseFinancialYearError(s.to_string());
        let (start, end) = s.trim().split_once('-').ok_or_else(err)?;
        let start: i32 = start.trim().parse().map_err(|_| err())?;
        let end_str = end.trim();
        let end: i32 = end_str.parse().map_err(|_| err())?;
        let valid = match end_str.len() {
            4 => end == start + 1,
            2 => end == (start + 1).rem_euclid(100),
            _ => false,
        };
        if valid {
            Ok(FinancialYear(start))
        } else {
            Err(err())
        }
    }
}

/// Financial year label for a date, or "Unknown" when there is no date
pub fn financial_year_label(date: Option<NaiveDate>) -> String {
    match date {
        Some(date) => FinancialYear::from_date(date).label(),
        None => UNKNOWN_FINANCIAL_YEAR.to_string(),
    }
}

/// Days from `date` (inclusive) until the next 1 July (exclusive)
pub fn days_to_next_fy(date: NaiveDate) -> i64 {
    let next_start = FinancialYear::from_date(date).next().start_date();
    (next_start - date).num_days()
}
