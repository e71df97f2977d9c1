//! Parameters structure for DistEst

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for disturbance estimation.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    /// Observer gains for the north, east and down axes.
    ///
    /// Units: 1/second
    pub ndo_gains: [f64; 3],

    /// Maximum magnitude of a believable disturbance estimate. Larger
    /// estimates are treated as a diverged observer.
    ///
    /// Units: meters/second^2
    pub max_disturbance_ms2: f64
}
