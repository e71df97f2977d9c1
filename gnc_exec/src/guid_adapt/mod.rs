//! # Guidance Parameter Adaptation
//!
//! GuidAdapt tunes the desired speed and look-ahead distance used by path
//! following. It runs on its own period, slower than the control tick.
//!
//! Every `update_cycle` adaptation ticks the optimiser produces new candidate
//! series over the horizon. The candidates are clamped to the minimum values,
//! low-pass filtered along the horizon and advanced `lpf_num_shifts` samples.
//! On every adaptation tick the series are advanced by one more sample and
//! their first samples are published.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod mppi;
mod params;
pub mod series;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, warn};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

pub use mppi::{GuidanceOptimiser, Mppi, OptimInput};
pub use params::{MppiParams, Params};
pub use series::MppiSeries;
use crate::{
    dist_est::{self, DistSource},
    gnc_core::ControlStatus,
    learn::Forecast,
    shared::Shared,
    state_cache::VehicleState,
    waypoints::WaypointSeq
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Guidance parameters read by path following.
///
/// The reach distance always equals the look-ahead distance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GuidParams {
    des_speed_ms: f64,
    look_ahead_m: f64,
    reach_m: f64
}

pub struct GuidAdapt {
    params: Params,

    /// Where the disturbance forecast comes from
    source: DistSource,

    series: MppiSeries,

    optimiser: Box<dyn GuidanceOptimiser>,

    /// Published guidance parameters
    guid: Shared<GuidParams>,

    forecast: Shared<Forecast>,

    num_cycles: u64
}

/// Snapshot of the core used by one adaptation tick.
#[derive(Debug, Clone)]
pub struct AdaptInput {
    pub state: VehicleState,
    pub status: ControlStatus,
    pub waypoints: Arc<WaypointSeq>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum InitError {
    #[error("Could not load GuidAdapt parameters: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("Invalid GuidAdapt parameters: {0}")]
    InvalidParams(&'static str)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl GuidParams {
    pub fn new(des_speed_ms: f64, look_ahead_m: f64) -> Self {
        Self {
            des_speed_ms,
            look_ahead_m,
            reach_m: look_ahead_m
        }
    }

    pub fn des_speed_ms(&self) -> f64 {
        self.des_speed_ms
    }

    pub fn look_ahead_m(&self) -> f64 {
        self.look_ahead_m
    }

    pub fn reach_m(&self) -> f64 {
        self.reach_m
    }

    pub fn set_des_speed(&mut self, des_speed_ms: f64) {
        self.des_speed_ms = des_speed_ms;
    }

    /// Set the look-ahead distance, and with it the reach distance.
    pub fn set_look_ahead(&mut self, look_ahead_m: f64) {
        self.look_ahead_m = look_ahead_m;
        self.reach_m = look_ahead_m;
    }
}

impl Params {
    /// Guidance parameters before any adaptation.
    pub fn nominal(&self) -> GuidParams {
        GuidParams::new(self.nominal_speed_ms, self.nominal_look_ahead_m)
    }

    /// Ratio of the horizon sample time to the filter time constant.
    pub fn lpf_alpha(&self) -> f64 {
        self.horizon_dt_s / self.lpf_tau_s
    }

    fn validate(&self) -> Result<(), InitError> {
        if self.horizon_len == 0 {
            return Err(InitError::InvalidParams("horizon_len must be at least 1"))
        }
        if self.update_cycle == 0 {
            return Err(InitError::InvalidParams("update_cycle must be at least 1"))
        }
        if !(self.horizon_dt_s > 0.0) {
            return Err(InitError::InvalidParams("horizon_dt_s must be positive"))
        }

        // The filter must be stable and must not amplify
        let alpha = self.lpf_alpha();
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(InitError::InvalidParams("horizon_dt_s / lpf_tau_s must be in (0, 1]"))
        }

        if self.nominal_speed_ms < self.min_speed_ms 
            || self.nominal_look_ahead_m < self.min_look_ahead_m 
        {
            return Err(InitError::InvalidParams("nominal values must not be below the minimums"))
        }

        Ok(())
    }
}

impl GuidAdapt {
    /// Load the parameters from file and build the adapter with the MPPI
    /// optimiser.
    pub fn init(
        params_path: &str,
        source: DistSource,
        guid: Shared<GuidParams>,
        forecast: Shared<Forecast>
    ) -> Result<Self, InitError> {
        let params: Params = util::params::load(params_path)
            .map_err(InitError::ParamLoadError)?;
        let optimiser = Box::new(Mppi::new(params.mppi.clone()));

        Self::new(params, source, optimiser, guid, forecast)
    }

    pub fn new(
        params: Params,
        source: DistSource,
        optimiser: Box<dyn GuidanceOptimiser>,
        guid: Shared<GuidParams>,
        forecast: Shared<Forecast>
    ) -> Result<Self, InitError> {
        params.validate()?;

        let nominal = params.nominal();
        guid.set(nominal);

        Ok(Self {
            series: MppiSeries::new(
                params.horizon_len, 
                nominal.des_speed_ms, 
                nominal.look_ahead_m
            ),
            params,
            source,
            optimiser,
            guid,
            forecast,
            num_cycles: 0
        })
    }

    /// Run one adaptation tick.
    ///
    /// Returns the published parameters, or `None` if adaptation has not
    /// started yet.
    pub fn cycle(&mut self, input: &AdaptInput) -> Option<GuidParams> {
        let status = &input.status;
        if !status.initial_pos_reached 
            || status.ticks_since_start <= self.params.warmup_ticks
            || input.waypoints.is_empty()
        {
            return None
        }

        if self.num_cycles % self.params.update_cycle == 0 {
            self.optimise(input);
        }
        self.num_cycles += 1;

        self.series.shift_append();
        let (speed_ms, look_ahead_m) = self.series.first()?;

        let mut guid = self.guid.get();
        guid.set_des_speed(speed_ms);
        guid.set_look_ahead(look_ahead_m);
        self.guid.set(guid);

        Some(guid)
    }

    pub fn series(&self) -> &MppiSeries {
        &self.series
    }

    fn optimise(&mut self, input: &AdaptInput) {
        let source = self.source;
        let len = self.params.horizon_len;
        let model = input.status.disturbance_ms2;
        let forecast = self.forecast.read(|f| dist_est::horizon(source, f, model, len));

        let mut cand = self.optimiser.optimise(&OptimInput {
            state: &input.state,
            waypoints: &input.waypoints,
            wp_index: input.status.wp_index,
            forecast: &forecast,
            prev: &self.series,
            dt_s: self.params.horizon_dt_s
        });

        if cand.len() != len || cand.look_ahead_m.len() != len {
            warn!(
                "Optimiser returned series of length {} (expected {}), keeping the previous series", 
                cand.len(), len
            );
            return
        }
        if cand.speed_ms.iter().chain(cand.look_ahead_m.iter()).any(|u| !u.is_finite()) {
            warn!("Optimiser returned non-finite values, keeping the previous series");
            return
        }

        cand.clamp_min(self.params.min_speed_ms, self.params.min_look_ahead_m);
        cand.low_pass(self.params.lpf_alpha());
        for _ in 0..self.params.lpf_num_shifts {
            cand.shift_append();
        }

        debug!(
            "New guidance series, speed[0] = {:.3} m/s, look-ahead[0] = {:.3} m", 
            cand.speed_ms[0], cand.look_ahead_m[0]
        );

        self.series = cand;
    }
}
