use crate::error::{PipelineError, Result};

/// Ordinary least squares fit via the normal equations. Small feature
/// counts make the explicit Gaussian elimination cheaper and more
/// transparent than pulling in a linear-algebra stack.
#[derive(Debug, Clone, Default)]
pub struct OlsRegression {
    /// Intercept followed by one coefficient per feature.
    coefficients: Option<Vec<f64>>,
    fitted: Option<Vec<f64>>,
    residuals: Option<Vec<f64>>,
    r_squared: Option<f64>,
}

impl OlsRegression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fit(&mut self, features: &[Vec<f64>], target: &[f64]) -> Result<()> {
        if features.is_empty() || target.is_empty() {
            return Err(PipelineError::Model("empty training data".to_string()));
        }
        if features.len() != target.len() {
            return Err(PipelineError::Model(format!(
                "feature/target length mismatch: {} vs {}",
                features.len(),
                target.len()
            )));
        }
        let n_features = features[0].len();
        if features.len() <= n_features + 1 {
            return Err(PipelineError::Model(format!(
                "need more than {} observations for {} features",
                n_features + 1,
                n_features
            )));
        }

        // Design matrix with a leading intercept column.
        let design: Vec<Vec<f64>> = features
            .iter()
            .map(|row| {
                let mut full = Vec::with_capacity(row.len() + 1);
                full.push(1.0);
                full.extend_from_slice(row);
                full
            })
            .collect();

        let beta = least_squares(&design, target)?;

        let fitted: Vec<f64> = design
            .iter()
            .map(|row| dot(row, &beta))
            .collect();
        let residuals: Vec<f64> = target
            .iter()
            .zip(&fitted)
            .map(|(y, f)| y - f)
            .collect();

        let mean = target.iter().sum::<f64>() / target.len() as f64;
        let ss_tot: f64 = target.iter().map(|y| (y - mean).powi(2)).sum();
        let ss_res: f64 = residuals.iter().map(|r| r * r).sum();
        let r_squared = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 };

        self.coefficients = Some(beta);
        self.fitted = Some(fitted);
        self.residuals = Some(residuals);
        self.r_squared = Some(r_squared);
        Ok(())
    }

    pub fn predict(&self, features: &[f64]) -> Result<f64> {
        let beta = self
            .coefficients
            .as_ref()
            .ok_or_else(|| PipelineError::Model("model must be fitted before prediction".to_string()))?;
        if features.len() + 1 != beta.len() {
            return Err(PipelineError::Model(format!(
                "expected {} features, got {}",
                beta.len() - 1,
                features.len()
            )));
        }
        Ok(beta[0] + dot(&beta[1..], features))
    }

    pub fn coefficients(&self) -> Option<&[f64]> {
        self.coefficients.as_deref()
    }

    pub fn residuals(&self) -> Option<&[f64]> {
        self.residuals.as_deref()
    }

    pub fn r_squared(&self) -> Option<f64> {
        self.r_squared
    }

    pub fn rmse(&self) -> Option<f64> {
        self.residuals.as_ref().map(|r| {
            (r.iter().map(|e| e * e).sum::<f64>() / r.len() as f64).sqrt()
        })
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Solve min ||X b - y|| through the normal equations with partial-pivot
/// Gaussian elimination. A pivot collapsing to ~0 means collinear columns.
pub(crate) fn least_squares(design: &[Vec<f64>], target: &[f64]) -> Result<Vec<f64>> {
    let cols = design[0].len();

    // X'X and X'y
    let mut xtx = vec![vec![0.0; cols]; cols];
    let mut xty = vec![0.0; cols];
    for (row, &y) in design.iter().zip(target) {
        for i in 0..cols {
            xty[i] += row[i] * y;
            for j in 0..cols {
                xtx[i][j] += row[i] * row[j];
            }
        }
    }

    // Forward elimination with partial pivoting.
    for col in 0..cols {
        let pivot_row = (col..cols)
            .max_by(|&a, &b| xtx[a][col].abs().total_cmp(&xtx[b][col].abs()))
            .unwrap_or(col);
        if xtx[pivot_row][col].abs() < 1e-10 {
            return Err(PipelineError::Model(
                "singular normal equations (collinear features)".to_string(),
            ));
        }
        xtx.swap(col, pivot_row);
        xty.swap(col, pivot_row);

        for row in col + 1..cols {
            let factor = xtx[row][col] / xtx[col][col];
            for k in col..cols {
                xtx[row][k] -= factor * xtx[col][k];
            }
            xty[row] -= factor * xty[col];
        }
    }

    // Back substitution.
    let mut beta = vec![0.0; cols];
    for col in (0..cols).rev() {
        let mut sum = xty[col];
        for k in col + 1..cols {
            sum -= xtx[col][k] * beta[k];
        }
        beta[col] = sum / xtx[col][col];
    }
    Ok(beta)
}
