//! Parameters structure for CmdArb

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    /// Position held until path following starts.
    ///
    /// Units: meters, frame: local NED
    pub initial_pos_m: [f64; 3],

    /// The initial position is reached once the altitude is within this
    /// tolerance of the initial position altitude.
    ///
    /// Units: meters
    pub initial_pos_tol_m: f64,

    /// A waypoint is accepted once the planar distance to it is below this
    /// radius.
    ///
    /// Units: meters
    pub acceptance_radius_m: f64,

    /// Path of the progress log relative to the session directory. No log is
    /// written if not given.
    #[serde(default)]
    pub progress_log_path: Option<String>
}
