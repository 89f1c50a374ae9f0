use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::backbone::BackboneRow;
use crate::constants::{
    CPI_SOURCE, HOME_VALUE_SOURCE, LISTINGS_SOURCE, MORTGAGE_SOURCE, POPULATION_SOURCE,
};
use crate::counties::CountyRecord;
use crate::keys::{CountyKey, MonthKey};
use crate::sources::{CountyMonthFact, CountyYearFact, NationalFact};

/// The five fact families the reconciler attaches to the backbone.
#[derive(Debug, Clone, Default)]
pub struct SourceFacts {
    pub mortgage: Vec<NationalFact>,
    pub cpi: Vec<NationalFact>,
    pub listings: Vec<NationalFact>,
    pub population: Vec<CountyYearFact>,
    pub home_value: Vec<CountyMonthFact>,
}

/// One (county, month) row of the reconciled table. Fact fields stay
/// optional until the completeness partition; a missing join is an explicit
/// null, never an absent row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciledRow {
    pub id: u32,
    pub state_code: u32,
    pub county_code: u32,
    pub state_name: String,
    pub county_name: String,
    pub date: NaiveDate,
    pub year: i32,
    pub month: u32,
    pub mortgage_rate: Option<f64>,
    pub cpi: Option<f64>,
    pub active_listings: Option<f64>,
    pub population: Option<f64>,
    pub home_value_index: Option<f64>,
}

impl ReconciledRow {
    /// A row is complete when all five tracked fields joined.
    pub fn is_complete(&self) -> bool {
        self.mortgage_rate.is_some()
            && self.cpi.is_some()
            && self.active_listings.is_some()
            && self.population.is_some()
            && self.home_value_index.is_some()
    }

    pub fn month_key(&self) -> MonthKey {
        MonthKey {
            year: self.year,
            month: self.month,
        }
    }
}

/// A source whose post-join non-null rate fell below the configured floor.
/// Non-fatal, but it is the signature of a join-key normalization mismatch
/// and must reach the operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinIntegrityWarning {
    pub source: String,
    pub non_null: usize,
    pub total: usize,
    pub rate: f64,
}

/// Reconciler tuning.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Minimum acceptable post-cutoff non-null rate per source. A healthy
    /// join sits near 1.0; a key mismatch sits at 0.0.
    pub min_non_null_rate: f64,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            min_non_null_rate: 0.5,
        }
    }
}

/// The reconciled record set: the complete partition is the output table
/// handed to modeling collaborators; the incomplete partition is retained
/// as a diagnostic set, never silently discarded.
#[derive(Debug, Clone, Serialize)]
pub struct ReconciledTable {
    pub complete: Vec<ReconciledRow>,
    pub incomplete: Vec<ReconciledRow>,
    /// First month with active-listings coverage; rows before it were
    /// structurally incomplete and dropped.
    pub cutoff: Option<MonthKey>,
    pub warnings: Vec<JoinIntegrityWarning>,
}

impl ReconciledTable {
    pub fn joined_len(&self) -> usize {
        self.complete.len() + self.incomplete.len()
    }
}

/// Left-join every fact family onto backbone × counties, apply the validity
/// cutoff, and partition by completeness. Deterministic and idempotent:
/// iteration runs counties in id order and months in backbone order, so
/// identical inputs give a byte-identical table.
pub fn reconcile(
    backbone: &[BackboneRow],
    counties: &[CountyRecord],
    facts: &SourceFacts,
    config: &ReconcilerConfig,
) -> ReconciledTable {
    let mortgage: HashMap<MonthKey, f64> =
        facts.mortgage.iter().map(|f| (f.month, f.value)).collect();
    let cpi: HashMap<MonthKey, f64> = facts.cpi.iter().map(|f| (f.month, f.value)).collect();
    let listings: HashMap<MonthKey, f64> =
        facts.listings.iter().map(|f| (f.month, f.value)).collect();
    let population: HashMap<(CountyKey, i32), f64> = facts
        .population
        .iter()
        .map(|f| ((f.county, f.year), f.value))
        .collect();
    let home_value: HashMap<(CountyKey, MonthKey), f64> = facts
        .home_value
        .iter()
        .map(|f| ((f.county, f.month), f.value))
        .collect();

    // Validity cutoff: the listings series starts latest, so months before
    // its first observation cannot produce a full-feature row.
    let cutoff = facts.listings.iter().map(|f| f.month).min();

    let mut joined = Vec::with_capacity(backbone.len() * counties.len());
    for county in counties {
        for row in backbone {
            if cutoff.is_some_and(|c| row.month < c) {
                continue;
            }
            joined.push(ReconciledRow {
                id: county.id,
                state_code: county.key.state_code,
                county_code: county.key.county_code,
                state_name: county.state_name.clone(),
                county_name: county.county_name.clone(),
                date: row.date,
                year: row.month.year,
                month: row.month.month,
                mortgage_rate: mortgage.get(&row.month).copied(),
                cpi: cpi.get(&row.month).copied(),
                active_listings: listings.get(&row.month).copied(),
                population: population.get(&(county.key, row.month.year)).copied(),
                home_value_index: home_value.get(&(county.key, row.month)).copied(),
            });
        }
    }

    let warnings = check_join_integrity(&joined, config);

    let (complete, incomplete): (Vec<_>, Vec<_>) =
        joined.into_iter().partition(ReconciledRow::is_complete);

    info!(
        complete = complete.len(),
        incomplete = incomplete.len(),
        cutoff = ?cutoff,
        "reconciled backbone against sources"
    );

    ReconciledTable {
        complete,
        incomplete,
        cutoff,
        warnings,
    }
}

/// Post-join sanity check: a source whose non-null rate is anomalously low
/// almost always means its reader and the backbone disagree on key
/// encoding. Surfaced as a warning rather than an error because the rows
/// themselves are still well-formed.
fn check_join_integrity(
    joined: &[ReconciledRow],
    config: &ReconcilerConfig,
) -> Vec<JoinIntegrityWarning> {
    if joined.is_empty() {
        return Vec::new();
    }
    let total = joined.len();
    let counts = [
        (MORTGAGE_SOURCE, joined.iter().filter(|r| r.mortgage_rate.is_some()).count()),
        (CPI_SOURCE, joined.iter().filter(|r| r.cpi.is_some()).count()),
        (LISTINGS_SOURCE, joined.iter().filter(|r| r.active_listings.is_some()).count()),
        (POPULATION_SOURCE, joined.iter().filter(|r| r.population.is_some()).count()),
        (HOME_VALUE_SOURCE, joined.iter().filter(|r| r.home_value_index.is_some()).count()),
    ];

    let mut warnings = Vec::new();
    for (source, non_null) in counts {
        let rate = non_null as f64 / total as f64;
        if rate < config.min_non_null_rate {
            warn!(
                source,
                non_null,
                total,
                rate,
                "post-join non-null rate below floor; likely key normalization mismatch"
            );
            warnings.push(JoinIntegrityWarning {
                source: source.to_string(),
                non_null,
                total,
                rate,
            });
        }
    }
    warnings
}
