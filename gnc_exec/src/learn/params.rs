//! Parameters structure for online learning

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    /// A forecast is produced once every `estimate_cycle` learning ticks.
    pub estimate_cycle: u64,

    /// The model is refit once every `update_cycle` learning ticks.
    pub update_cycle: u64,

    /// Maximum number of samples kept for training, oldest dropped first.
    pub window_len: usize,

    /// Minimum number of samples needed before the model is fit.
    pub min_fit_samples: usize,

    pub gpr: GprParams
}

/// Hyperparameters of the Gaussian process.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct GprParams {
    /// Length scale of the squared exponential kernel.
    ///
    /// Units: seconds
    pub length_scale_s: f64,

    /// Signal variance of the kernel.
    pub signal_var: f64,

    /// Variance of the measurement noise.
    pub noise_var: f64
}
