//! # Gaussian process regression
//!
//! Regression of each disturbance axis against mission time with a shared
//! squared exponential kernel
//!
//! ```text
//! k(t, t') = s^2 exp(-(t - t')^2 / (2 l^2))
//! ```
//!
//! The per-axis mean of the training targets is removed before fitting and
//! added back to the predictions.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{DMatrix, Vector3};
use thiserror::Error;

use super::GprParams;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A regression model of the disturbance against time.
pub trait Regressor: Send {
    /// Fit the model to the samples. An empty sample set leaves the model
    /// unchanged.
    fn fit(&mut self, xs: &[f64], ys: &[Vector3<f64>]) -> Result<(), FitError>;

    /// Predict the disturbance at each of `xs`, `None` if the model has not
    /// been fit.
    fn predict(&self, xs: &[f64]) -> Option<Vec<Vector3<f64>>>;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

pub struct Gpr {
    params: GprParams,

    train_xs: Vec<f64>,

    /// `K^-1 (Y - mean)`, one column per axis
    alpha: Option<DMatrix<f64>>,

    mean: Vector3<f64>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum FitError {
    #[error("Sample count mismatch: {0} times but {1} values")]
    LengthMismatch(usize, usize),

    #[error("The kernel matrix is not positive definite")]
    NotPositiveDefinite
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Gpr {
    pub fn new(params: GprParams) -> Self {
        Self {
            params,
            train_xs: Vec::new(),
            alpha: None,
            mean: Vector3::zeros()
        }
    }

    fn kernel(&self, a: f64, b: f64) -> f64 {
        let l = self.params.length_scale_s;
        self.params.signal_var * (-(a - b).powi(2) / (2.0 * l * l)).exp()
    }
}

impl Regressor for Gpr {
    fn fit(&mut self, xs: &[f64], ys: &[Vector3<f64>]) -> Result<(), FitError> {
        if xs.len() != ys.len() {
            return Err(FitError::LengthMismatch(xs.len(), ys.len()))
        }
        let n = xs.len();
        if n == 0 {
            return Ok(())
        }

        let mean = ys.iter().fold(Vector3::zeros(), |acc, y| acc + y) / n as f64;

        let k = DMatrix::from_fn(n, n, |i, j| {
            let noise = if i == j { self.params.noise_var } else { 0.0 };
            self.kernel(xs[i], xs[j]) + noise
        });
        let y = DMatrix::from_fn(n, 3, |i, j| ys[i][j] - mean[j]);

        let chol = k.cholesky().ok_or(FitError::NotPositiveDefinite)?;

        self.alpha = Some(chol.solve(&y));
        self.train_xs = xs.to_vec();
        self.mean = mean;

        Ok(())
    }

    fn predict(&self, xs: &[f64]) -> Option<Vec<Vector3<f64>>> {
        let alpha = self.alpha.as_ref()?;

        let k_star = DMatrix::from_fn(xs.len(), self.train_xs.len(), |i, j| {
            self.kernel(xs[i], self.train_xs[j])
        });
        let pred = k_star * alpha;

        Some(
            (0..xs.len())
                .map(|i| Vector3::new(pred[(i, 0)], pred[(i, 1)], pred[(i, 2)]) + self.mean)
                .collect()
        )
    }
}
