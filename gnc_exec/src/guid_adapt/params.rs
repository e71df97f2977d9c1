//! Parameters structure for GuidAdapt

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for guidance parameter adaptation.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {

    // ---- HORIZON ----

    /// Number of samples in the horizon.
    pub horizon_len: usize,

    /// Time between horizon samples.
    ///
    /// Units: seconds
    pub horizon_dt_s: f64,

    /// The optimiser runs once every `update_cycle` adaptation ticks.
    pub update_cycle: u64,

    /// Number of control ticks after the initial position is reached before
    /// adaptation starts.
    pub warmup_ticks: u64,

    // ---- FILTERING ----

    /// Time constant of the low-pass filter applied along the horizon.
    ///
    /// Units: seconds
    pub lpf_tau_s: f64,

    /// Number of shift-and-append passes applied after each optimisation.
    pub lpf_num_shifts: usize,

    // ---- LIMITS ----

    /// Units: meters/second
    pub min_speed_ms: f64,

    /// Units: meters
    pub min_look_ahead_m: f64,

    // ---- NOMINAL VALUES ----

    /// Desired speed used before the first optimisation.
    ///
    /// Units: meters/second
    pub nominal_speed_ms: f64,

    /// Look-ahead distance used before the first optimisation.
    ///
    /// Units: meters
    pub nominal_look_ahead_m: f64,

    pub mppi: MppiParams
}

/// Parameters of the MPPI optimiser.
#[derive(Debug, Clone, Deserialize)]
pub struct MppiParams {
    /// Number of sampled candidate series per optimisation.
    pub num_samples: usize,

    /// Temperature of the exponential weighting.
    pub lambda: f64,

    /// Half width of the uniform speed perturbation.
    ///
    /// Units: meters/second
    pub speed_noise_ms: f64,

    /// Half width of the uniform look-ahead perturbation.
    ///
    /// Units: meters
    pub look_ahead_noise_m: f64,

    /// Weight of the squared cross-track distance.
    pub path_weight: f64,

    /// Weight of the squared deviation from the reference speed.
    pub speed_weight: f64,

    /// Units: meters/second
    pub ref_speed_ms: f64,

    /// Time constant of the speed response in the rollout model.
    ///
    /// Units: seconds
    pub vel_tau_s: f64,

    /// Acceptance radius used to advance waypoints during rollouts.
    ///
    /// Units: meters
    pub acceptance_radius_m: f64,

    /// Seed for the sampling random number generator.
    pub seed: u64
}
