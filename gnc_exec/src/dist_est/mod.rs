//! # Disturbance Estimator
//!
//! DistEst provides the disturbance acceleration used by path following on
//! each control tick. Two sources are available:
//!
//! - `Model`: the nonlinear disturbance observer driven by the vehicle state
//!   and the previously commanded force.
//! - `Learned`: the first element of the online learning forecast. Until the
//!   first forecast is published the observer estimate is used instead.
//!
//! The observer is stepped on every tick whichever source is selected, as its
//! output is also the training signal for online learning.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod ndo;
mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::warn;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use util::{module::State, params as util_params, session::Session};

pub use params::Params;
use ndo::{DisturbanceObserver, Ndo, ObserverInput};
use crate::{
    learn::Forecast,
    params::VehicleParams,
    shared::Shared,
    state_cache::VehicleState
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

pub struct DistEst {
    params: Params,
    vehicle: VehicleParams,
    source: DistSource,
    dt_s: f64,

    observer: Box<dyn DisturbanceObserver>,

    /// Forecast published by online learning
    forecast: Shared<Forecast>
}

pub struct InitData {
    pub params_path: String,
    pub vehicle: VehicleParams,
    pub source: DistSource,
    pub dt_s: f64,
    pub forecast: Shared<Forecast>
}

#[derive(Debug, Clone, Copy)]
pub struct InputData {
    pub state: VehicleState,

    /// Force commanded in the body frame on the previous tick.
    pub force_cmd_body_n: Vector3<f64>
}

/// The disturbance estimate for one tick.
///
/// Units: meters/second^2, frame: local NED
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DistEstimate {
    /// Observer output, always from the model regardless of the source.
    pub model: Vector3<f64>,

    /// Disturbance from the selected source.
    pub disturbance: Vector3<f64>,

    /// Modelled aerodynamic drag.
    pub drag: Vector3<f64>,

    /// `disturbance + drag`, the acceleration compensated by path following.
    pub total: Vector3<f64>,

    pub source: DistSource
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StatusReport {
    /// Set when the learned source is selected but no forecast exists yet.
    pub forecast_unavailable: bool
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistSource {
    Model,
    Learned
}

#[derive(Debug, Error)]
pub enum InitError {
    #[error("Could not load DistEst parameters: {0}")]
    ParamLoadError(util_params::LoadError),

    #[error("The control period must be positive, got {0} s")]
    InvalidPeriod(f64)
}

#[derive(Debug, Error)]
pub enum ProcError {
    #[error("The disturbance observer diverged (|d| = {0} m/s^2) and has been reset")]
    ObserverDiverged(f64)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for DistEstimate {
    fn default() -> Self {
        Self {
            model: Vector3::zeros(),
            disturbance: Vector3::zeros(),
            drag: Vector3::zeros(),
            total: Vector3::zeros(),
            source: DistSource::Model
        }
    }
}

impl State for DistEst {
    type InitData = InitData;
    type InitError = InitError;

    type InputData = InputData;
    type OutputData = DistEstimate;
    type StatusReport = StatusReport;
    type ProcError = ProcError;

    /// Load the parameters and build the observer.
    fn init(
        init_data: Self::InitData, 
        _session: &Session
    ) -> Result<Self, Self::InitError> {
        let params = util_params::load(&init_data.params_path)
            .map_err(InitError::ParamLoadError)?;

        Self::new(
            params, 
            init_data.vehicle, 
            init_data.source, 
            init_data.dt_s, 
            init_data.forecast
        )
    }

    fn proc(
        &mut self, 
        input_data: &Self::InputData
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        let mut report = StatusReport::default();

        let obs = self.observer.observe(&ObserverInput {
            dt_s: self.dt_s,
            velocity_ms: input_data.state.velocity_ms,
            attitude_rad: input_data.state.attitude_rad,
            force_body_n: input_data.force_cmd_body_n,
            vehicle: self.vehicle
        });

        // Never hand out a diverged estimate
        let mag = obs.disturbance_ms2.norm();
        if !mag.is_finite() || mag > self.params.max_disturbance_ms2 {
            self.observer.reset();
            return Err(ProcError::ObserverDiverged(mag))
        }

        let disturbance = match self.source {
            DistSource::Model => obs.disturbance_ms2,
            DistSource::Learned => {
                match self.forecast.read(|f| f.values.first().copied()) {
                    Some(d) => d,
                    None => {
                        report.forecast_unavailable = true;
                        obs.disturbance_ms2
                    }
                }
            }
        };

        Ok((
            DistEstimate {
                model: obs.disturbance_ms2,
                disturbance,
                drag: obs.drag_ms2,
                total: disturbance + obs.drag_ms2,
                source: self.source
            },
            report
        ))
    }
}

impl DistEst {
    pub fn new(
        params: Params,
        vehicle: VehicleParams,
        source: DistSource,
        dt_s: f64,
        forecast: Shared<Forecast>
    ) -> Result<Self, InitError> {
        if !(dt_s > 0.0) {
            return Err(InitError::InvalidPeriod(dt_s))
        }

        if source == DistSource::Learned {
            warn!("DistEst using the learned disturbance, the model is used until a forecast exists");
        }

        Ok(Self {
            observer: Box::new(Ndo::new(params.ndo_gains)),
            params,
            vehicle,
            source,
            dt_s,
            forecast
        })
    }

    pub fn source(&self) -> DistSource {
        self.source
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Build the disturbance forecast over a horizon of `len` samples.
///
/// With the learned source and a non-empty forecast the forecast is used,
/// holding its last sample if it is shorter than the horizon. Otherwise the
/// model estimate is held constant over the whole horizon.
pub fn horizon(
    source: DistSource, 
    forecast: &Forecast, 
    model: Vector3<f64>, 
    len: usize
) -> Vec<Vector3<f64>> {
    match (source, forecast.values.last()) {
        (DistSource::Learned, Some(last)) => (0..len)
            .map(|i| *forecast.values.get(i).unwrap_or(last))
            .collect(),
        _ => vec![model; len]
    }
}
