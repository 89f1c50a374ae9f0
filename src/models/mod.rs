use serde::Serialize;
use tracing::{info, warn};

use crate::config::ModelsConfig;
use crate::error::Result;
use crate::reconcile::ReconciledRow;

pub mod arima;
pub mod dataset;
pub mod forest;
pub mod linear;

pub use arima::{ArimaSpec, ArimaxModel};
pub use forest::{ForestConfig, RandomForestRegressor};
pub use linear::OlsRegression;

/// Fit summary for one model, pooled or per-county.
#[derive(Debug, Clone, Serialize)]
pub struct ModelSummary {
    pub model: String,
    /// Present for the per-county ARIMA fits, absent for pooled models.
    pub county: Option<String>,
    pub observations: usize,
    pub r_squared: Option<f64>,
    pub rmse: Option<f64>,
}

/// Results of the whole modeling stage.
#[derive(Debug, Clone, Serialize, Default)]
pub struct ModelReport {
    pub summaries: Vec<ModelSummary>,
    /// Counties skipped by the ARIMA stage (short series, degenerate fit).
    pub skipped_counties: Vec<String>,
}

/// Fit the three collaborator model classes against the complete partition.
/// Pooled linear and forest models run over every row; ARIMA runs as a map
/// over counties, one fitted model per county. A county that cannot be fit
/// is skipped with a warning, never fatal to the run.
pub fn fit_models(rows: &[ReconciledRow], config: &ModelsConfig) -> Result<ModelReport> {
    let mut report = ModelReport::default();

    let pooled = dataset::pooled(rows);
    info!(observations = pooled.target.len(), "fitting pooled models");

    let mut ols = OlsRegression::new();
    ols.fit(&pooled.features, &pooled.target)?;
    report.summaries.push(ModelSummary {
        model: "linear_regression".to_string(),
        county: None,
        observations: pooled.target.len(),
        r_squared: ols.r_squared(),
        rmse: ols.rmse(),
    });

    let mut forest = RandomForestRegressor::new(ForestConfig {
        n_trees: config.forest_trees,
        max_depth: config.forest_max_depth,
        min_samples_split: config.forest_min_samples_split,
        seed: config.forest_seed,
    });
    forest.fit(&pooled.features, &pooled.target)?;
    report.summaries.push(ModelSummary {
        model: "random_forest".to_string(),
        county: None,
        observations: pooled.target.len(),
        r_squared: forest.r_squared(&pooled.target),
        rmse: forest.rmse(),
    });

    let spec = ArimaSpec::new(config.arima_p, config.arima_d);
    for series in dataset::per_county(rows) {
        let mut model = ArimaxModel::new(spec);
        match model.fit(&series.target, &series.exog) {
            Ok(()) => {
                report.summaries.push(ModelSummary {
                    model: format!("arima({},{},0)", spec.p, spec.d),
                    county: Some(series.county_name.clone()),
                    observations: series.target.len(),
                    r_squared: None,
                    rmse: model.rmse(),
                });
            }
            Err(e) => {
                warn!(county = %series.county_name, error = %e, "skipping county ARIMA fit");
                report.skipped_counties.push(series.county_name.clone());
            }
        }
    }

    Ok(report)
}
