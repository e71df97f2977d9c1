//! Parameters structure for PathFollow

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for path following.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    /// Path following runs once every `tick_divider` control ticks.
    pub tick_divider: u64,

    pub pursuit: PursuitParams
}

/// Parameters for the pursuit guidance law.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PursuitParams {
    /// Gain from velocity error to acceleration demand.
    ///
    /// Units: 1/second
    pub vel_gain: f64,

    /// Maximum tilt of the thrust vector from vertical.
    ///
    /// Units: radians
    pub max_tilt_rad: f64,

    /// Minimum upwards acceleration demanded from the thrust, keeps the
    /// vehicle controllable when the demand would point the thrust down.
    ///
    /// Units: meters/second^2
    pub min_lift_accel_ms2: f64
}
