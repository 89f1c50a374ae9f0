use std::path::Path;

use chrono::NaiveDate;

use crate::constants::HOME_VALUE_SOURCE;
use crate::error::{PipelineError, Result};
use crate::keys::{CountyKey, MonthKey};
use crate::sources::{CountyMonthFact, SourceReader};
use crate::table::{unpivot, RawTable};

const STATE_FIPS_COL: &str = "StateCodeFIPS";
const COUNTY_FIPS_COL: &str = "MunicipalCodeFIPS";
const STATE_COL: &str = "State";
const REGION_COL: &str = "RegionName";

/// Reader for the county home-value index. The raw file is wide: one row
/// per county, one column per snapshot date. Snapshots can fall mid-month,
/// so each is floored to the first of its month; the floor is the only
/// dedup applied.
pub struct HomeValueReader;

impl SourceReader for HomeValueReader {
    type Fact = CountyMonthFact;

    fn source_name(&self) -> &'static str {
        HOME_VALUE_SOURCE
    }

    fn read(&self, path: &Path) -> Result<Vec<CountyMonthFact>> {
        let table = RawTable::load(path)?;
        // A value column is any header that reads as an ISO date; the
        // remaining metadata columns ride along as ids or are ignored.
        let long = unpivot(
            &table,
            &[STATE_COL, REGION_COL, STATE_FIPS_COL, COUNTY_FIPS_COL],
            |h| NaiveDate::parse_from_str(h, "%Y-%m-%d").is_ok(),
        )?;

        let mut facts = Vec::with_capacity(long.len());
        for row in long {
            let state_code: u32 = row.id_values[2].trim().parse().map_err(|e| {
                PipelineError::parse(&table.file, STATE_FIPS_COL, format!("{e}"))
            })?;
            let county_code: u32 = row.id_values[3].trim().parse().map_err(|e| {
                PipelineError::parse(&table.file, COUNTY_FIPS_COL, format!("{e}"))
            })?;
            let value = row.value.trim();
            if value.is_empty() {
                continue;
            }
            let index: f64 = value.parse().map_err(|e| {
                PipelineError::parse(&table.file, &row.column, format!("'{value}': {e}"))
            })?;
            // Header parse already validated the date shape.
            let snapshot = NaiveDate::parse_from_str(&row.column, "%Y-%m-%d").map_err(|e| {
                PipelineError::parse(&table.file, &row.column, format!("{e}"))
            })?;

            facts.push(CountyMonthFact {
                month: MonthKey::from_date(snapshot),
                county: CountyKey::new(state_code, county_code),
                value: index,
            });
        }
        facts.sort_by_key(|f| (f.county, f.month));
        Ok(facts)
    }
}
