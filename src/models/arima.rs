use crate::error::{PipelineError, Result};
use crate::models::linear::least_squares;

/// ARIMA order for the per-county fits. MA terms are deliberately absent:
/// with exogenous regressors carrying most of the signal, conditional least
/// squares on an AR(p) of the differenced series is the reference behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArimaSpec {
    /// AR order (p)
    pub p: usize,
    /// Differencing order (d)
    pub d: usize,
}

impl ArimaSpec {
    pub fn new(p: usize, d: usize) -> Self {
        Self { p, d }
    }
}

impl Default for ArimaSpec {
    fn default() -> Self {
        Self::new(2, 1)
    }
}

/// Per-county ARIMA(p, d, 0) with exogenous regressors, fit by conditional
/// least squares on the d-times differenced target and regressors.
#[derive(Debug, Clone)]
pub struct ArimaxModel {
    spec: ArimaSpec,
    intercept: f64,
    ar_coefficients: Vec<f64>,
    exog_coefficients: Vec<f64>,
    /// Original target, kept for integration when forecasting.
    original: Option<Vec<f64>>,
    /// Last exog row seen, the held-level default for future regressors.
    last_exog: Option<Vec<f64>>,
    differenced: Option<Vec<f64>>,
    residuals: Option<Vec<f64>>,
}

impl ArimaxModel {
    pub fn new(spec: ArimaSpec) -> Self {
        Self {
            spec,
            intercept: 0.0,
            ar_coefficients: vec![],
            exog_coefficients: vec![],
            original: None,
            last_exog: None,
            differenced: None,
            residuals: None,
        }
    }

    pub fn spec(&self) -> ArimaSpec {
        self.spec
    }

    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar_coefficients
    }

    pub fn exog_coefficients(&self) -> &[f64] {
        &self.exog_coefficients
    }

    pub fn is_fitted(&self) -> bool {
        self.differenced.is_some()
    }

    pub fn residuals(&self) -> Option<&[f64]> {
        self.residuals.as_deref()
    }

    /// In-sample RMSE on the differenced scale.
    pub fn rmse(&self) -> Option<f64> {
        self.residuals.as_ref().map(|r| {
            (r.iter().map(|e| e * e).sum::<f64>() / r.len() as f64).sqrt()
        })
    }

    /// Fit against a chronological target and aligned exog rows (one per
    /// observation). Both are differenced d times so the regression runs on
    /// a comparable scale.
    pub fn fit(&mut self, target: &[f64], exog: &[Vec<f64>]) -> Result<()> {
        if target.is_empty() {
            return Err(PipelineError::Model("empty series".to_string()));
        }
        if target.len() != exog.len() {
            return Err(PipelineError::Model(format!(
                "series/exog length mismatch: {} vs {}",
                target.len(),
                exog.len()
            )));
        }
        let ArimaSpec { p, d } = self.spec;
        let n_exog = exog.first().map(Vec::len).unwrap_or(0);
        // Enough rows that the design (intercept + p lags + exog) stays
        // overdetermined with margin.
        let min_len = d + 2 * p + n_exog + 4;
        if target.len() < min_len {
            return Err(PipelineError::Model(format!(
                "series too short: need at least {min_len} observations, got {}",
                target.len()
            )));
        }

        let diffed = difference(target, d);
        let exog_columns: Vec<Vec<f64>> = (0..n_exog)
            .map(|j| {
                let column: Vec<f64> = exog.iter().map(|row| row[j]).collect();
                difference(&column, d)
            })
            .collect();
        let exog_diffed = transpose_with_rows(&exog_columns, diffed.len());

        // Design: intercept | p lags of the differenced target | exog row.
        let rows = diffed.len() - p;
        let mut design = Vec::with_capacity(rows);
        let mut response = Vec::with_capacity(rows);
        for t in p..diffed.len() {
            let mut row = Vec::with_capacity(1 + p + n_exog);
            row.push(1.0);
            for lag in 1..=p {
                row.push(diffed[t - lag]);
            }
            row.extend_from_slice(&exog_diffed[t]);
            design.push(row);
            response.push(diffed[t]);
        }

        let beta = least_squares(&design, &response)?;
        let residuals: Vec<f64> = design
            .iter()
            .zip(&response)
            .map(|(row, &y)| y - row.iter().zip(&beta).map(|(x, b)| x * b).sum::<f64>())
            .collect();

        self.intercept = beta[0];
        self.ar_coefficients = beta[1..1 + p].to_vec();
        self.exog_coefficients = beta[1 + p..].to_vec();
        self.original = Some(target.to_vec());
        self.last_exog = exog.last().cloned();
        self.differenced = Some(diffed);
        self.residuals = Some(residuals);
        Ok(())
    }

    /// Forecast `horizon` steps ahead. Future exog rows may be supplied; any
    /// shortfall is filled by holding the last observed regressor levels
    /// (differenced contribution zero). Differencing is undone against the
    /// original series tail.
    pub fn forecast(&self, horizon: usize, future_exog: &[Vec<f64>]) -> Result<Vec<f64>> {
        let diffed = self
            .differenced
            .as_ref()
            .ok_or_else(|| PipelineError::Model("model must be fitted before forecasting".to_string()))?;
        let original = self.original.as_ref().expect("fitted model keeps its series");
        let last_exog = self.last_exog.as_ref().expect("fitted model keeps last exog");

        let n_exog = self.exog_coefficients.len();
        let mut history: Vec<f64> = diffed.clone();
        let mut prev_exog = last_exog.clone();
        let mut forecasts_diffed = Vec::with_capacity(horizon);

        for step in 0..horizon {
            let mut value = self.intercept;
            for (lag, coef) in self.ar_coefficients.iter().enumerate() {
                value += coef * history[history.len() - 1 - lag];
            }
            // Exog enters differenced: held-level future regressors
            // contribute zero change.
            let step_exog = future_exog.get(step).unwrap_or(last_exog);
            for j in 0..n_exog {
                value += self.exog_coefficients[j] * (step_exog[j] - prev_exog[j]);
            }
            prev_exog = step_exog.clone();
            history.push(value);
            forecasts_diffed.push(value);
        }

        Ok(integrate(original, &forecasts_diffed, self.spec.d))
    }
}

/// Column-major to row-major. With zero columns the row count is
/// unknowable, so callers pass `rows` explicitly.
fn transpose_with_rows(columns: &[Vec<f64>], rows: usize) -> Vec<Vec<f64>> {
    (0..rows)
        .map(|i| columns.iter().map(|col| col[i]).collect())
        .collect()
}

/// Difference a series d times: each pass shortens it by one.
pub fn difference(series: &[f64], d: usize) -> Vec<f64> {
    let mut current = series.to_vec();
    for _ in 0..d {
        current = current.windows(2).map(|w| w[1] - w[0]).collect();
    }
    current
}

/// Undo d rounds of differencing for a forecast tail, anchored on the
/// original series.
pub fn integrate(original: &[f64], forecasts: &[f64], d: usize) -> Vec<f64> {
    if d == 0 {
        return forecasts.to_vec();
    }
    // Rebuild the anchor values at each differencing level.
    let mut levels = vec![original.to_vec()];
    for i in 0..d {
        let prev = &levels[i];
        levels.push(prev.windows(2).map(|w| w[1] - w[0]).collect());
    }

    let mut current = forecasts.to_vec();
    for level in (0..d).rev() {
        let mut anchor = *levels[level].last().expect("non-empty level");
        current = current
            .iter()
            .map(|&delta| {
                anchor += delta;
                anchor
            })
            .collect();
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difference_and_integrate_round_trip() {
        let series = vec![10.0, 12.0, 15.0, 14.0, 18.0];
        let diffed = difference(&series, 1);
        assert_eq!(diffed, vec![2.0, 3.0, -1.0, 4.0]);

        let continued = vec![1.0, -2.0];
        let restored = integrate(&series, &continued, 1);
        assert_eq!(restored, vec![19.0, 17.0]);
    }

    #[test]
    fn second_difference() {
        let series = vec![1.0, 3.0, 6.0, 10.0];
        assert_eq!(difference(&series, 2), vec![1.0, 1.0]);
    }

    #[test]
    fn recovers_ar_process_on_differenced_scale() {
        // Differenced series follows x_t = 2 + 0.5 x_{t-1} exactly, so the
        // fit should recover the recursion and forecast it forward.
        let mut diffs = vec![1.0];
        for t in 1..50 {
            diffs.push(2.0 + 0.5 * diffs[t - 1]);
        }
        let mut target = vec![100.0];
        for &delta in &diffs {
            target.push(target.last().unwrap() + delta);
        }
        // An unrelated moving regressor; the unique least-squares solution
        // gives it a zero coefficient and must not disturb the AR fit.
        let exog: Vec<Vec<f64>> = (0..target.len())
            .map(|t| vec![((t as f64) * 0.7).sin()])
            .collect();

        let mut model = ArimaxModel::new(ArimaSpec::new(1, 1));
        model.fit(&target, &exog).unwrap();
        assert!(model.is_fitted());
        assert!(model.rmse().unwrap() < 1e-6);
        assert!((model.ar_coefficients()[0] - 0.5).abs() < 1e-6);

        let forecast = model.forecast(2, &[]).unwrap();
        let last_diff = *diffs.last().unwrap();
        let next_diff = 2.0 + 0.5 * last_diff;
        let expected_1 = target.last().unwrap() + next_diff;
        let expected_2 = expected_1 + 2.0 + 0.5 * next_diff;
        assert!((forecast[0] - expected_1).abs() < 1e-6);
        assert!((forecast[1] - expected_2).abs() < 1e-6);
    }

    #[test]
    fn exog_signal_is_picked_up() {
        // Differenced target equals twice the differenced regressor.
        let regressor: Vec<f64> = (0..50).map(|t| ((t as f64) * 0.3).sin() * 10.0).collect();
        let mut target = vec![100.0];
        for t in 1..50 {
            let delta = 2.0 * (regressor[t] - regressor[t - 1]);
            let next = target[t - 1] + delta;
            target.push(next);
        }
        let exog: Vec<Vec<f64>> = regressor.iter().map(|&x| vec![x]).collect();

        let mut model = ArimaxModel::new(ArimaSpec::new(1, 1));
        model.fit(&target, &exog).unwrap();
        assert!((model.exog_coefficients()[0] - 2.0).abs() < 0.1);
    }

    #[test]
    fn short_series_is_rejected() {
        let mut model = ArimaxModel::new(ArimaSpec::new(2, 1));
        let err = model.fit(&[1.0, 2.0, 3.0], &[vec![0.0], vec![0.0], vec![0.0]]).unwrap_err();
        assert!(err.to_string().contains("too short"));
    }

    #[test]
    fn forecast_requires_fit() {
        let model = ArimaxModel::new(ArimaSpec::default());
        assert!(model.forecast(1, &[]).is_err());
    }
}
