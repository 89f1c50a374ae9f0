use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{PipelineError, Result};
use crate::keys::MonthKey;

/// Run configuration, loaded from a TOML file. Every section has defaults
/// so a partial file (or none of the optional sections) still works.
#[derive(Debug, Deserialize)]
pub struct Config {
    pub inputs: InputsConfig,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub counties: CountiesConfig,
    #[serde(default)]
    pub integrity: IntegrityConfig,
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Paths to the five raw datasets (population is two extracts).
#[derive(Debug, Deserialize)]
pub struct InputsConfig {
    pub mortgage: PathBuf,
    pub cpi: PathBuf,
    pub listings: PathBuf,
    pub population_earlier: PathBuf,
    pub population_later: PathBuf,
    pub home_values: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct WindowConfig {
    /// First backbone month, "YYYY-MM".
    pub start: String,
    /// Last backbone month, inclusive, "YYYY-MM".
    pub end: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            start: "2010-01".to_string(),
            end: "2023-05".to_string(),
        }
    }
}

impl WindowConfig {
    pub fn start_month(&self) -> Result<MonthKey> {
        parse_month(&self.start)
    }

    pub fn end_month(&self) -> Result<MonthKey> {
        parse_month(&self.end)
    }
}

fn parse_month(value: &str) -> Result<MonthKey> {
    let (year, month) = value
        .split_once('-')
        .ok_or_else(|| PipelineError::Config(format!("bad window month '{value}', want YYYY-MM")))?;
    let year: i32 = year
        .parse()
        .map_err(|e| PipelineError::Config(format!("bad window year in '{value}': {e}")))?;
    let month: u32 = month
        .parse()
        .map_err(|e| PipelineError::Config(format!("bad window month in '{value}': {e}")))?;
    MonthKey::new(year, month)
}

#[derive(Debug, Deserialize)]
pub struct CountiesConfig {
    /// Counties with a latest-year estimate above this stay in scope.
    pub population_threshold: f64,
}

impl Default for CountiesConfig {
    fn default() -> Self {
        Self {
            population_threshold: 2_000_000.0,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct IntegrityConfig {
    /// Floor for the post-join non-null rate before a source is flagged.
    pub min_non_null_rate: f64,
}

impl Default for IntegrityConfig {
    fn default() -> Self {
        Self {
            min_non_null_rate: 0.5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelsConfig {
    pub arima_p: usize,
    pub arima_d: usize,
    pub forest_trees: usize,
    pub forest_max_depth: usize,
    pub forest_min_samples_split: usize,
    pub forest_seed: u64,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            arima_p: 2,
            arima_d: 1,
            forest_trees: 100,
            forest_max_depth: 8,
            forest_min_samples_split: 4,
            forest_seed: 42,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    /// Directory for the exported tables and the run report.
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("failed to read config file '{}': {e}", path.display()))
        })?;
        let config: Config = toml::from_str(&content)?;
        config.window.start_month()?;
        config.window.end_month()?;
        Ok(config)
    }
}
