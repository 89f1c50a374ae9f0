use std::path::Path;

use crate::constants::CPI_SOURCE;
use crate::error::{PipelineError, Result};
use crate::keys::{parse_optional_f64, MonthKey};
use crate::sources::{NationalFact, SourceReader};
use crate::table::{unpivot, RawTable};

const YEAR_COL: &str = "Year";

/// Reader for the CPI index. The raw file is a wide year-by-month grid (one
/// row per year, one column per three-letter month label); it is unpivoted
/// to one fact per (year, month) cell.
pub struct CpiReader;

impl SourceReader for CpiReader {
    type Fact = NationalFact;

    fn source_name(&self) -> &'static str {
        CPI_SOURCE
    }

    fn read(&self, path: &Path) -> Result<Vec<NationalFact>> {
        let table = RawTable::load(path)?;
        // Month columns are whatever resolves through the shared label
        // table; annual aggregate columns (HALF1, Annual, ...) are ignored.
        let long = unpivot(&table, &[YEAR_COL], |h| {
            MonthKey::from_label(2000, h, "probe").is_ok()
        })?;

        let mut facts = Vec::with_capacity(long.len());
        for row in long {
            let year_raw = &row.id_values[0];
            let year: i32 = year_raw.trim().parse().map_err(|e| {
                PipelineError::parse(&table.file, YEAR_COL, format!("'{year_raw}': {e}"))
            })?;
            let Some(value) = parse_optional_f64(&row.value, &table.file, &row.column)? else {
                continue;
            };
            facts.push(NationalFact {
                month: MonthKey::from_label(year, &row.column, &table.file)?,
                value,
            });
        }
        facts.sort_by_key(|f| f.month);
        Ok(facts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn read_csv(content: &str) -> Result<Vec<NationalFact>> {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(content.as_bytes()).unwrap();
        CpiReader.read(tmp.path())
    }

    #[test]
    fn wide_grid_unpivots_to_month_rows() {
        let facts = read_csv(
            "Year,Jan,Feb,Mar\n\
             2020,257.9,258.7,258.1\n\
             2021,261.6,263.0,264.9\n",
        )
        .unwrap();
        assert_eq!(facts.len(), 6);
        assert_eq!(facts[0].month, MonthKey::new(2020, 1).unwrap());
        assert_eq!(facts[0].value, 257.9);
        assert_eq!(facts[5].month, MonthKey::new(2021, 3).unwrap());
        assert_eq!(facts[5].value, 264.9);
    }

    #[test]
    fn aggregate_columns_are_ignored() {
        let facts = read_csv("Year,Jan,Feb,HALF1,Annual\n2020,1.0,2.0,1.5,1.5\n").unwrap();
        assert_eq!(facts.len(), 2);
    }

    #[test]
    fn empty_trailing_cells_are_absent_not_errors() {
        // The current year has months that have not been published yet.
        let facts = read_csv("Year,Jan,Feb\n2023,299.2,\n").unwrap();
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].value, 299.2);
    }

    #[test]
    fn grid_without_month_columns_is_schema_error() {
        let err = read_csv("Year,Total\n2020,100.0\n").unwrap_err();
        assert!(err.to_string().contains("zero value columns"));
    }

    #[test]
    fn bad_year_is_parse_error() {
        let err = read_csv("Year,Jan\ntwenty,1.0\n").unwrap_err();
        assert!(err.to_string().contains("Year"));
    }
}
