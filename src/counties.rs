use serde::{Deserialize, Serialize};
use tracing::info;

use crate::keys::CountyKey;
use crate::sources::CountyPopulation;

/// A county in scope for the run. Created once from the merged population
/// table and immutable afterwards; `id` is the 1-based rank under ascending
/// state code and is stable for the lifetime of the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountyRecord {
    pub id: u32,
    pub key: CountyKey,
    pub state_name: String,
    pub county_name: String,
}

/// Determine the fixed county set: drop national/state aggregate rows
/// (county code 0) and keep counties whose latest-year estimate exceeds the
/// threshold. Sorting is stable on state code, so equal codes keep their
/// original row order and id assignment is exactly reproducible.
pub fn select_counties(population: &[CountyPopulation], threshold: f64) -> Vec<CountyRecord> {
    let mut selected: Vec<&CountyPopulation> = population
        .iter()
        .filter(|county| county.key.county_code != 0)
        .filter(|county| county.latest_estimate().is_some_and(|pop| pop > threshold))
        .collect();
    selected.sort_by_key(|county| county.key.state_code);

    let records: Vec<CountyRecord> = selected
        .iter()
        .enumerate()
        .map(|(rank, county)| CountyRecord {
            id: rank as u32 + 1,
            key: county.key,
            state_name: county.state_name.clone(),
            county_name: county.county_name.clone(),
        })
        .collect();

    info!(
        candidates = population.len(),
        selected = records.len(),
        threshold,
        "selected counties"
    );
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn county(
        state_code: u32,
        county_code: u32,
        name: &str,
        latest_pop: f64,
    ) -> CountyPopulation {
        CountyPopulation {
            key: CountyKey::new(state_code, county_code),
            state_name: format!("State {state_code}"),
            county_name: name.to_string(),
            by_year: BTreeMap::from([(2021, latest_pop), (2020, latest_pop - 1000.0)]),
        }
    }

    #[test]
    fn threshold_and_code_zero_exclusion() {
        // Five counties: two above threshold, one aggregate row with code 0
        // whose population would otherwise qualify.
        let input = vec![
            county(6, 37, "Los Angeles County", 9_800_000.0),
            county(6, 0, "California", 39_000_000.0),
            county(53, 33, "King County", 2_250_000.0),
            county(53, 61, "Snohomish County", 830_000.0),
            county(48, 453, "Travis County", 1_300_000.0),
        ];
        let records = select_counties(&input, 2_000_000.0);
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.key.county_code != 0));
        assert_eq!(records[0].county_name, "Los Angeles County");
        assert_eq!(records[1].county_name, "King County");
    }

    #[test]
    fn ids_rank_by_ascending_state_code() {
        let input = vec![
            county(53, 33, "King County", 3_000_000.0),
            county(6, 37, "Los Angeles County", 9_800_000.0),
            county(17, 31, "Cook County", 5_100_000.0),
        ];
        let records = select_counties(&input, 2_000_000.0);
        let ids: Vec<(u32, u32)> = records.iter().map(|r| (r.id, r.key.state_code)).collect();
        assert_eq!(ids, vec![(1, 6), (2, 17), (3, 53)]);
    }

    #[test]
    fn same_state_ties_keep_original_order() {
        let input = vec![
            county(6, 73, "San Diego County", 3_300_000.0),
            county(6, 37, "Los Angeles County", 9_800_000.0),
        ];
        let records = select_counties(&input, 2_000_000.0);
        // Stable sort: San Diego appeared first in the input, keeps rank 1.
        assert_eq!(records[0].county_name, "San Diego County");
        assert_eq!(records[1].county_name, "Los Angeles County");
    }

    #[test]
    fn threshold_is_strict() {
        let input = vec![county(6, 37, "Exactly At", 2_000_000.0)];
        assert!(select_counties(&input, 2_000_000.0).is_empty());
    }

    #[test]
    fn selection_is_reproducible() {
        let input = vec![
            county(53, 33, "King County", 3_000_000.0),
            county(6, 37, "Los Angeles County", 9_800_000.0),
        ];
        let a = select_counties(&input, 2_000_000.0);
        let b = select_counties(&input, 2_000_000.0);
        assert_eq!(a, b);
    }
}
