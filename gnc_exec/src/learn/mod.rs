//! # Online Learning
//!
//! OnlineLearn samples the model-based disturbance estimate against mission
//! time and forecasts the disturbance over the guidance horizon. The forecast
//! is published for disturbance estimation and guidance adaptation.
//!
//! Forecasting and refitting are gated independently: a forecast is made
//! every `estimate_cycle` learning ticks from the current model, and the
//! model is refit every `update_cycle` learning ticks from the sample window.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod gpr;
mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, warn};
use nalgebra::Vector3;
use std::collections::VecDeque;
use thiserror::Error;

pub use gpr::{FitError, Gpr, Regressor};
pub use params::{GprParams, Params};
use crate::{gnc_core::ControlStatus, shared::Shared};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Disturbance forecast over the guidance horizon.
///
/// Units: meters/second^2, frame: local NED
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Forecast {
    /// One value per horizon sample, empty until the first forecast.
    pub values: Vec<Vector3<f64>>,

    /// Number of forecasts published so far.
    pub num_updates: u64
}

pub struct OnlineLearn {
    params: Params,

    horizon_len: usize,
    horizon_dt_s: f64,

    /// Training samples of (mission time, disturbance)
    samples: VecDeque<(f64, Vector3<f64>)>,

    regressor: Box<dyn Regressor>,

    forecast: Shared<Forecast>,

    num_cycles: u64
}

/// What happened during one learning tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LearnReport {
    pub sampled: bool,
    pub forecast_published: bool,
    pub refit: bool
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum InitError {
    #[error("Could not load learning parameters: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("Invalid learning parameters: {0}")]
    InvalidParams(&'static str)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl OnlineLearn {
    /// Load the parameters from file and build the learner with a Gaussian
    /// process regressor.
    ///
    /// The forecast horizon is the guidance horizon, so that one forecast
    /// value corresponds to one guidance parameter sample.
    pub fn init(
        params_path: &str,
        horizon_len: usize,
        horizon_dt_s: f64,
        forecast: Shared<Forecast>
    ) -> Result<Self, InitError> {
        let params: Params = util::params::load(params_path)
            .map_err(InitError::ParamLoadError)?;
        let regressor = Box::new(Gpr::new(params.gpr));

        Self::new(params, horizon_len, horizon_dt_s, regressor, forecast)
    }

    pub fn new(
        params: Params,
        horizon_len: usize,
        horizon_dt_s: f64,
        regressor: Box<dyn Regressor>,
        forecast: Shared<Forecast>
    ) -> Result<Self, InitError> {
        if params.estimate_cycle == 0 || params.update_cycle == 0 {
            return Err(InitError::InvalidParams("cycles must be at least 1"))
        }
        if params.window_len == 0 {
            return Err(InitError::InvalidParams("window_len must be at least 1"))
        }

        Ok(Self {
            samples: VecDeque::with_capacity(params.window_len),
            params,
            horizon_len,
            horizon_dt_s,
            regressor,
            forecast,
            num_cycles: 0
        })
    }

    /// Run one learning tick on a snapshot of the core status.
    pub fn cycle(&mut self, status: &ControlStatus) -> LearnReport {
        let mut report = LearnReport::default();

        if !status.initial_pos_reached || status.ticks_since_start == 0 {
            return report
        }

        let now_s = status.mission_time_s;
        self.samples.push_back((now_s, status.disturbance_ms2));
        while self.samples.len() > self.params.window_len {
            self.samples.pop_front();
        }
        report.sampled = true;

        if self.num_cycles % self.params.estimate_cycle == 0 {
            report.forecast_published = self.publish_forecast(now_s);
        }

        if self.num_cycles % self.params.update_cycle == 0 {
            report.refit = self.refit();
        }

        self.num_cycles += 1;

        report
    }

    pub fn num_samples(&self) -> usize {
        self.samples.len()
    }

    fn publish_forecast(&mut self, now_s: f64) -> bool {
        let xs: Vec<f64> = (0..self.horizon_len)
            .map(|k| now_s + k as f64 * self.horizon_dt_s)
            .collect();

        match self.regressor.predict(&xs) {
            Some(values) if values.iter().all(|v| v.iter().all(|x| x.is_finite())) => {
                self.forecast.update(|f| {
                    f.values = values;
                    f.num_updates += 1;
                });
                true
            },
            Some(_) => {
                warn!("Discarding non-finite disturbance forecast");
                false
            },
            None => false
        }
    }

    fn refit(&mut self) -> bool {
        if self.samples.len() < self.params.min_fit_samples.max(1) {
            debug!(
                "Skipping refit, {} of {} samples", 
                self.samples.len(), self.params.min_fit_samples
            );
            return false
        }

        let (xs, ys): (Vec<f64>, Vec<Vector3<f64>>) = self.samples.iter().cloned().unzip();

        match self.regressor.fit(&xs, &ys) {
            Ok(()) => true,
            Err(e) => {
                warn!("Could not refit the disturbance model: {}", e);
                false
            }
        }
    }
}
