use std::path::Path;

use crate::constants::LISTINGS_SOURCE;
use crate::error::Result;
use crate::keys::{parse_date, parse_optional_f64, MonthKey};
use crate::sources::{NationalFact, SourceReader};
use crate::table::RawTable;

const DATE_COL: &str = "observation_date";
const COUNT_COL: &str = "ACTLISCOUUS";

/// Reader for the national active-listings count: one ISO-dated observation
/// per month. This is the latest-starting source, so its earliest month
/// also defines the reconciler's validity cutoff.
pub struct ListingsReader;

impl SourceReader for ListingsReader {
    type Fact = NationalFact;

    fn source_name(&self) -> &'static str {
        LISTINGS_SOURCE
    }

    fn read(&self, path: &Path) -> Result<Vec<NationalFact>> {
        let table = RawTable::load(path)?;
        let date_idx = table.column(DATE_COL)?;
        let count_idx = table.column(COUNT_COL)?;

        let mut facts = Vec::with_capacity(table.rows.len());
        for row in &table.rows {
            let date = parse_date(table.cell(row, date_idx), "%Y-%m-%d", &table.file, DATE_COL)?;
            let Some(count) =
                parse_optional_f64(table.cell(row, count_idx), &table.file, COUNT_COL)?
            else {
                continue;
            };
            facts.push(NationalFact {
                month: MonthKey::from_date(date),
                value: count,
            });
        }
        facts.sort_by_key(|f| f.month);
        Ok(facts)
    }
}
