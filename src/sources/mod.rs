use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::keys::{CountyKey, MonthKey};

pub mod cpi;
pub mod home_value;
pub mod listings;
pub mod mortgage;
pub mod population;

pub use cpi::CpiReader;
pub use home_value::HomeValueReader;
pub use listings::ListingsReader;
pub use mortgage::MortgageReader;
pub use population::{CountyPopulation, PopulationReader};

/// A national-scope observation: one scalar per month.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NationalFact {
    pub month: MonthKey,
    pub value: f64,
}

/// A county-scope observation keyed by month.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CountyMonthFact {
    pub month: MonthKey,
    pub county: CountyKey,
    pub value: f64,
}

/// A county-scope observation keyed by year; broadcast across all twelve
/// months of that year when joined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CountyYearFact {
    pub year: i32,
    pub county: CountyKey,
    pub value: f64,
}

/// Common seam for the five ingestion adapters. Each reader turns one raw
/// tabular input into facts addressable by the shared join keys; all key
/// derivation goes through `keys` so every source lands on the same
/// encoding.
pub trait SourceReader {
    type Fact;

    /// Stable name used in logs, reports, and integrity warnings.
    fn source_name(&self) -> &'static str;

    /// Parse the raw file into the source's fact stream. Malformed fields
    /// and missing columns are fatal.
    fn read(&self, path: &Path) -> Result<Vec<Self::Fact>>;
}
