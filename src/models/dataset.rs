use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::reconcile::ReconciledRow;

/// Feature columns, in design-matrix order. The target is the home-value
/// index.
pub const FEATURE_NAMES: [&str; 4] = ["mortgage_rate", "cpi", "active_listings", "population"];

/// Pooled design matrix over every complete row, for the cross-county
/// models (linear regression, random forest).
#[derive(Debug, Clone)]
pub struct PooledDataset {
    /// One row per observation, FEATURE_NAMES order.
    pub features: Vec<Vec<f64>>,
    pub target: Vec<f64>,
}

/// One county's chronological series with aligned exogenous regressors, for
/// the per-county ARIMA fits.
#[derive(Debug, Clone)]
pub struct CountySeries {
    pub county_id: u32,
    pub county_name: String,
    pub dates: Vec<NaiveDate>,
    pub target: Vec<f64>,
    /// Row-major: one regressor row per observation, FEATURE_NAMES order.
    pub exog: Vec<Vec<f64>>,
}

fn feature_row(row: &ReconciledRow) -> Option<Vec<f64>> {
    Some(vec![
        row.mortgage_rate?,
        row.cpi?,
        row.active_listings?,
        row.population?,
    ])
}

/// Build the pooled dataset from the complete partition. Rows missing any
/// field are skipped defensively, though the reconciler's partition already
/// guarantees completeness here.
pub fn pooled(rows: &[ReconciledRow]) -> PooledDataset {
    let mut features = Vec::with_capacity(rows.len());
    let mut target = Vec::with_capacity(rows.len());
    for row in rows {
        let (Some(x), Some(y)) = (feature_row(row), row.home_value_index) else {
            continue;
        };
        features.push(x);
        target.push(y);
    }
    PooledDataset { features, target }
}

/// Split the complete partition into per-county chronological series. Input
/// ordering (id then date) is preserved, so each series comes out already
/// sorted by date.
pub fn per_county(rows: &[ReconciledRow]) -> Vec<CountySeries> {
    let mut by_county: BTreeMap<u32, CountySeries> = BTreeMap::new();
    for row in rows {
        let (Some(x), Some(y)) = (feature_row(row), row.home_value_index) else {
            continue;
        };
        let series = by_county.entry(row.id).or_insert_with(|| CountySeries {
            county_id: row.id,
            county_name: row.county_name.clone(),
            dates: Vec::new(),
            target: Vec::new(),
            exog: Vec::new(),
        });
        series.dates.push(row.date);
        series.target.push(y);
        series.exog.push(x);
    }
    by_county.into_values().collect()
}
