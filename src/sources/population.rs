use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::POPULATION_SOURCE;
use crate::error::{PipelineError, Result};
use crate::keys::CountyKey;
use crate::sources::{CountyYearFact, SourceReader};
use crate::table::{merge_prefer_second, unpivot, RawTable};

const STATE_COL: &str = "STATE";
const COUNTY_COL: &str = "COUNTY";
const STATE_NAME_COL: &str = "STNAME";
const COUNTY_NAME_COL: &str = "CTYNAME";
const ESTIMATE_PREFIX: &str = "POPESTIMATE";

/// Full identity a county carries in the census extracts. Both extracts must
/// agree on all four columns for a county to survive the merge.
type Identity = (u32, u32, String, String);

/// Per-county population estimates merged across the two census extracts:
/// the county identity plus one estimate per reference year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountyPopulation {
    pub key: CountyKey,
    pub state_name: String,
    pub county_name: String,
    pub by_year: BTreeMap<i32, f64>,
}

impl CountyPopulation {
    /// The estimate for the most recent reference year. Selection and the
    /// threshold filter key off this value.
    pub fn latest_estimate(&self) -> Option<f64> {
        self.by_year.values().next_back().copied()
    }

    /// Flatten to the yearly facts the reconciler broadcasts across months.
    pub fn year_facts(&self) -> impl Iterator<Item = CountyYearFact> + '_ {
        self.by_year.iter().map(|(&year, &value)| CountyYearFact {
            year,
            county: self.key,
            value,
        })
    }
}

/// Reader for the county population estimates. Two raw extracts cover
/// non-overlapping decade ranges with a shared reference year; they are
/// unpivoted to per-year values and inner-joined on the four-column county
/// identity, the later extract winning wherever both report the same year.
pub struct PopulationReader {
    later_extract: PathBuf,
}

impl PopulationReader {
    pub fn new(later_extract: impl Into<PathBuf>) -> Self {
        Self {
            later_extract: later_extract.into(),
        }
    }

    fn read_extract(path: &Path) -> Result<BTreeMap<Identity, BTreeMap<i32, f64>>> {
        let table = RawTable::load(path)?;
        let long = unpivot(
            &table,
            &[STATE_COL, COUNTY_COL, STATE_NAME_COL, COUNTY_NAME_COL],
            |h| h.starts_with(ESTIMATE_PREFIX),
        )?;

        let mut by_county: BTreeMap<Identity, BTreeMap<i32, f64>> = BTreeMap::new();
        for row in long {
            let state_code = parse_code(&row.id_values[0], &table.file, STATE_COL)?;
            let county_code = parse_code(&row.id_values[1], &table.file, COUNTY_COL)?;
            let year: i32 = row.column[ESTIMATE_PREFIX.len()..].parse().map_err(|e| {
                PipelineError::parse(&table.file, &row.column, format!("bad year suffix: {e}"))
            })?;
            let value = row.value.trim();
            if value.is_empty() {
                continue;
            }
            let estimate: f64 = value.parse().map_err(|e| {
                PipelineError::parse(&table.file, &row.column, format!("'{value}': {e}"))
            })?;

            let identity = (
                state_code,
                county_code,
                row.id_values[2].clone(),
                row.id_values[3].clone(),
            );
            by_county.entry(identity).or_default().insert(year, estimate);
        }
        Ok(by_county)
    }
}

fn parse_code(value: &str, file: &str, field: &str) -> Result<u32> {
    value
        .trim()
        .parse()
        .map_err(|e| PipelineError::parse(file, field, format!("'{value}': {e}")))
}

impl SourceReader for PopulationReader {
    type Fact = CountyPopulation;

    fn source_name(&self) -> &'static str {
        POPULATION_SOURCE
    }

    /// `path` is the earlier extract; the later one was given at
    /// construction and is authoritative on overlapping years.
    fn read(&self, path: &Path) -> Result<Vec<CountyPopulation>> {
        let first = Self::read_extract(path)?;
        let second = Self::read_extract(&self.later_extract)?;
        let merged = merge_prefer_second(&first, &second);
        debug!(
            source = POPULATION_SOURCE,
            earlier = first.len(),
            later = second.len(),
            merged = merged.len(),
            "merged population extracts"
        );

        Ok(merged
            .into_iter()
            .map(|((state_code, county_code, state_name, county_name), by_year)| {
                CountyPopulation {
                    key: CountyKey::new(state_code, county_code),
                    state_name,
                    county_name,
                    by_year,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(content.as_bytes()).unwrap();
        tmp
    }

    #[test]
    fn extracts_merge_on_identity_with_second_authoritative() {
        let earlier = write_csv(
            "STATE,COUNTY,STNAME,CTYNAME,POPESTIMATE2018,POPESTIMATE2020\n\
             6,37,California,Los Angeles County,10100000,10050000\n\
             6,0,California,California,39000000,39100000\n",
        );
        let later = write_csv(
            "STATE,COUNTY,STNAME,CTYNAME,POPESTIMATE2020,POPESTIMATE2021\n\
             6,37,California,Los Angeles County,9900000,9800000\n",
        );

        let reader = PopulationReader::new(later.path());
        let counties = reader.read(earlier.path()).unwrap();

        // The state-aggregate row exists only in the earlier extract and is
        // dropped by the inner join.
        assert_eq!(counties.len(), 1);
        let la = &counties[0];
        assert_eq!(la.key, CountyKey::new(6, 37));
        assert_eq!(la.county_name, "Los Angeles County");
        assert_eq!(la.by_year[&2018], 10_100_000.0);
        assert_eq!(la.by_year[&2020], 9_900_000.0); // later extract wins
        assert_eq!(la.by_year[&2021], 9_800_000.0);
        assert_eq!(la.latest_estimate(), Some(9_800_000.0));
    }

    #[test]
    fn year_facts_flatten_per_year() {
        let earlier = write_csv(
            "STATE,COUNTY,STNAME,CTYNAME,POPESTIMATE2015\n\
             53,33,Washington,King County,2100000\n",
        );
        let later = write_csv(
            "STATE,COUNTY,STNAME,CTYNAME,POPESTIMATE2016\n\
             53,33,Washington,King County,2150000\n",
        );
        let counties = PopulationReader::new(later.path()).read(earlier.path()).unwrap();
        let facts: Vec<_> = counties[0].year_facts().collect();
        assert_eq!(facts.len(), 2);
        assert_eq!(facts[0].year, 2015);
        assert_eq!(facts[0].value, 2_100_000.0);
        assert_eq!(facts[1].county, CountyKey::new(53, 33));
    }

    #[test]
    fn extract_without_estimate_columns_is_schema_error() {
        let earlier = write_csv("STATE,COUNTY,STNAME,CTYNAME,TOTAL\n6,37,California,LA,1\n");
        let later = write_csv("STATE,COUNTY,STNAME,CTYNAME,POPESTIMATE2021\n6,37,California,LA,1\n");
        let err = PopulationReader::new(later.path())
            .read(earlier.path())
            .unwrap_err();
        assert!(err.to_string().contains("zero value columns"));
    }

    #[test]
    fn non_numeric_county_code_is_fatal() {
        let earlier = write_csv("STATE,COUNTY,STNAME,CTYNAME,POPESTIMATE2015\n6,xx,California,LA,1\n");
        let later = write_csv("STATE,COUNTY,STNAME,CTYNAME,POPESTIMATE2016\n6,37,California,LA,1\n");
        let err = PopulationReader::new(later.path())
            .read(earlier.path())
            .unwrap_err();
        assert!(err.to_string().contains("COUNTY"));
    }
}
