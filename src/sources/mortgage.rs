use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;
use tracing::debug;

use crate::constants::MORTGAGE_SOURCE;
use crate::error::Result;
use crate::keys::{parse_date, parse_optional_f64, MonthKey};
use crate::sources::{NationalFact, SourceReader};
use crate::table::RawTable;

const DATE_COL: &str = "DATE";
const RATE_COL: &str = "MORTGAGE30US";

/// Reader for the weekly 30-year mortgage rate series. The series reports
/// several readings per month; the chronologically first one is
/// authoritative and the rest are dropped, never averaged.
pub struct MortgageReader;

impl SourceReader for MortgageReader {
    type Fact = NationalFact;

    fn source_name(&self) -> &'static str {
        MORTGAGE_SOURCE
    }

    fn read(&self, path: &Path) -> Result<Vec<NationalFact>> {
        let table = RawTable::load(path)?;
        let date_idx = table.column(DATE_COL)?;
        let rate_idx = table.column(RATE_COL)?;

        let mut observations: Vec<(NaiveDate, f64)> = Vec::new();
        for row in &table.rows {
            let date = parse_date(table.cell(row, date_idx), "%m/%d/%y", &table.file, DATE_COL)?;
            let Some(rate) = parse_optional_f64(table.cell(row, rate_idx), &table.file, RATE_COL)?
            else {
                continue;
            };
            observations.push((date, rate));
        }

        // "First of the month" means chronologically first, not first in
        // file order.
        observations.sort_by_key(|(date, _)| *date);

        let mut by_month: BTreeMap<MonthKey, f64> = BTreeMap::new();
        let mut dropped = 0usize;
        for (date, rate) in observations {
            let key = MonthKey::from_date(date);
            if by_month.contains_key(&key) {
                dropped += 1;
            } else {
                by_month.insert(key, rate);
            }
        }
        debug!(
            source = MORTGAGE_SOURCE,
            months = by_month.len(),
            dropped_intra_month = dropped,
            "deduplicated mortgage readings"
        );

        Ok(by_month
            .into_iter()
            .map(|(month, value)| NationalFact { month, value })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn read_csv(content: &str) -> Vec<NationalFact> {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(content.as_bytes()).unwrap();
        MortgageReader.read(tmp.path()).unwrap()
    }

    #[test]
    fn first_observation_of_month_wins() {
        let facts = read_csv("DATE,MORTGAGE30US\n03/09/20,6.7\n03/02/20,6.5\n");
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].month, MonthKey::new(2020, 3).unwrap());
        assert_eq!(facts[0].value, 6.5);
    }

    #[test]
    fn months_are_kept_separately() {
        let facts = read_csv("DATE,MORTGAGE30US\n01/07/21,2.65\n02/04/21,2.73\n01/14/21,2.79\n");
        assert_eq!(facts.len(), 2);
        assert_eq!(facts[0].value, 2.65);
        assert_eq!(facts[1].value, 2.73);
    }

    #[test]
    fn placeholder_readings_are_skipped() {
        let facts = read_csv("DATE,MORTGAGE30US\n04/01/21,.\n04/08/21,3.13\n");
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].value, 3.13);
    }

    #[test]
    fn malformed_date_is_fatal() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"DATE,MORTGAGE30US\nnot-a-date,6.5\n").unwrap();
        let err = MortgageReader.read(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("DATE"));
    }

    #[test]
    fn missing_rate_column_is_schema_error() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"DATE,WRONG\n03/02/20,6.5\n").unwrap();
        let err = MortgageReader.read(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("MORTGAGE30US"));
    }
}
