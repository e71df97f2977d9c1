//! Parameters structure for the guidance and control executable

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Top level parameters for the executable.
#[derive(Debug, Clone, Deserialize)]
pub struct GncExecParams {

    // ---- RATES ----

    /// Period of the control tick.
    ///
    /// Units: seconds
    pub control_period_s: f64,

    /// Period of the guidance parameter adaptation task.
    ///
    /// Units: seconds
    pub adapt_period_s: f64,

    /// Period of the online learning task.
    ///
    /// Units: seconds
    pub learn_period_s: f64,

    /// Number of control ticks to stream setpoints for before requesting
    /// offboard mode and arming.
    pub offboard_warmup_ticks: u64,

    // ---- MODES ----

    /// Type of command produced while following the path.
    pub ctrl_mode: CtrlMode,

    /// If true the guidance parameters are adapted online, otherwise the
    /// nominal parameters are used for the whole mission.
    pub use_adaptation: bool,

    /// If true the disturbance is forecast by online learning and the forecast
    /// replaces the model-based estimate.
    pub use_learning: bool,

    // ---- VEHICLE ----

    pub vehicle: VehicleParams
}

/// Physical constants of the vehicle, shared by the disturbance model and the
/// guidance law.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct VehicleParams {
    /// Units: kilograms
    pub mass_kg: f64,

    /// Air density.
    ///
    /// Units: kilograms per cubic meter
    pub air_density_kgm3: f64,

    /// Reference area for the drag model.
    ///
    /// Units: square meters
    pub ref_area_m2: f64,

    /// Drag coefficient, nondimensional.
    pub drag_coeff: f64,

    /// Units: meters/second^2
    pub gravity_ms2: f64,

    /// Normalised thrust required to hover, in [0, 1].
    pub hover_thrust: f64
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The type of command produced by path following.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum CtrlMode {
    Position,
    Attitude
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for VehicleParams {
    fn default() -> Self {
        Self {
            mass_kg: 1.5,
            air_density_kgm3: 1.225,
            ref_area_m2: 0.06,
            drag_coeff: 0.9,
            gravity_ms2: 9.81,
            hover_thrust: 0.5
        }
    }
}

impl VehicleParams {
    /// Aerodynamic drag acceleration for the given velocity.
    ///
    /// Units: meters/second^2
    pub fn drag_accel(&self, vel_ms: &nalgebra::Vector3<f64>) -> nalgebra::Vector3<f64> {
        -0.5 * self.air_density_kgm3 * self.ref_area_m2 * self.drag_coeff 
            * vel_ms.norm() * vel_ms / self.mass_kg
    }
}
