use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Three-letter month labels as they appear in wide calendar grids (CPI).
/// Position in the table is the month ordinal minus one.
const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// The universal join key: a calendar month. Every reader must produce this
/// exact encoding (numeric ordinal, never a label) or joins silently match
/// nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(PipelineError::Config(format!(
                "month out of range: {year}-{month}"
            )));
        }
        Ok(Self { year, month })
    }

    /// Derive the key from any calendar date within the month.
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Resolve a three-letter month label ("Jan".."Dec") against a year.
    /// Unknown labels are a parse failure, attributed to the caller's file.
    pub fn from_label(year: i32, label: &str, file: &str) -> Result<Self> {
        let month = MONTH_LABELS
            .iter()
            .position(|l| l.eq_ignore_ascii_case(label))
            .ok_or_else(|| {
                PipelineError::parse(file, label, "unrecognized month column label")
            })?;
        Ok(Self {
            year,
            month: month as u32 + 1,
        })
    }

    /// First-of-month date carrying this key.
    pub fn first_day(&self) -> NaiveDate {
        // Safe: month is validated on construction, day 1 always exists.
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .unwrap_or_else(|| panic!("invalid month key {}-{}", self.year, self.month))
    }

    /// The following calendar month.
    pub fn succ(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }
}

impl std::fmt::Display for MonthKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Identifies a county uniquely within a state; stable across all datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CountyKey {
    pub state_code: u32,
    pub county_code: u32,
}

impl CountyKey {
    pub fn new(state_code: u32, county_code: u32) -> Self {
        Self {
            state_code,
            county_code,
        }
    }
}

/// Floor a mid-month snapshot date to the first of its month. Lossy by
/// design: distinct same-month snapshots collapse onto one key.
pub fn floor_to_month(date: NaiveDate) -> NaiveDate {
    MonthKey::from_date(date).first_day()
}

/// Parse a date string against a format, mapped into the pipeline's parse
/// error with the file and field that carried it.
pub fn parse_date(value: &str, format: &str, file: &str, field: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, format)
        .map_err(|e| PipelineError::parse(file, field, format!("'{value}': {e}")))
}

/// Parse a numeric field, mapped the same way. Empty cells and the FRED "."
/// placeholder read as absent, not as failures.
pub fn parse_optional_f64(value: &str, file: &str, field: &str) -> Result<Option<f64>> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed == "." {
        return Ok(None);
    }
    trimmed
        .parse::<f64>()
        .map(Some)
        .map_err(|e| PipelineError::parse(file, field, format!("'{value}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_key_from_date_and_label_agree() {
        // The single highest-risk correctness point: keys derived from a
        // date column and from a label column must be bit-for-bit equal.
        let from_date = MonthKey::from_date(NaiveDate::from_ymd_opt(2020, 3, 17).unwrap());
        let from_label = MonthKey::from_label(2020, "Mar", "test.csv").unwrap();
        assert_eq!(from_date, from_label);
    }

    #[test]
    fn keys_from_two_synthetic_sources_fully_match() {
        let years = [2019, 2020];
        let mut date_derived = Vec::new();
        for year in years {
            for month in 1..=12 {
                let day = NaiveDate::from_ymd_opt(year, month, 15).unwrap();
                date_derived.push(MonthKey::from_date(day));
            }
        }
        let mut label_derived = Vec::new();
        for year in years {
            for label in MONTH_LABELS {
                label_derived.push(MonthKey::from_label(year, label, "t.csv").unwrap());
            }
        }
        assert_eq!(date_derived, label_derived);
    }

    #[test]
    fn label_lookup_is_case_insensitive() {
        let a = MonthKey::from_label(2021, "jan", "t.csv").unwrap();
        let b = MonthKey::from_label(2021, "JAN", "t.csv").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.month, 1);
    }

    #[test]
    fn unknown_label_is_a_parse_error() {
        let err = MonthKey::from_label(2021, "Janvier", "cpi.csv").unwrap_err();
        assert!(err.to_string().contains("cpi.csv"));
    }

    #[test]
    fn month_out_of_range_rejected() {
        assert!(MonthKey::new(2020, 0).is_err());
        assert!(MonthKey::new(2020, 13).is_err());
        assert!(MonthKey::new(2020, 12).is_ok());
    }

    #[test]
    fn succ_rolls_over_december() {
        let dec = MonthKey::new(2020, 12).unwrap();
        assert_eq!(dec.succ(), MonthKey::new(2021, 1).unwrap());
    }

    #[test]
    fn floor_to_month_hits_first_day() {
        let floored = floor_to_month(NaiveDate::from_ymd_opt(2022, 6, 28).unwrap());
        assert_eq!(floored, NaiveDate::from_ymd_opt(2022, 6, 1).unwrap());
    }

    #[test]
    fn optional_float_treats_placeholder_as_absent() {
        assert_eq!(parse_optional_f64(".", "f.csv", "RATE").unwrap(), None);
        assert_eq!(parse_optional_f64("", "f.csv", "RATE").unwrap(), None);
        assert_eq!(parse_optional_f64("6.5", "f.csv", "RATE").unwrap(), Some(6.5));
        assert!(parse_optional_f64("6,5", "f.csv", "RATE").is_err());
    }
}
