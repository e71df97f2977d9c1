//! # Telemetry messages
//!
//! Inputs pushed into the core by the flight management unit (FMU) estimator
//! and by the collision avoidance provider. All frames are North-East-Down.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Estimated vehicle states.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct EstimatorStates {
    /// Timestamp of the estimate in microseconds
    pub timestamp: u64,

    /// Attitude quaternion, scalar first (w, x, y, z)
    pub attitude_q: [f64; 4],

    /// Velocity in the NED frame
    pub velocity_ms: [f64; 3],

    /// Position in the NED frame
    pub position_m: [f64; 3],

    /// Estimated wind velocity in the North-East plane
    #[serde(default)]
    pub wind_ne_ms: [f64; 2],
}

/// Body angular rates measured by the FMU.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct VehicleAngularVelocity {
    /// Timestamp in microseconds
    pub timestamp: u64,

    /// Body rates about the x, y and z body axes
    pub xyz_rads: [f64; 3],
}

/// Time synchronisation with the FMU clock.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct Timesync {
    /// FMU timestamp in microseconds, applied to outgoing messages
    pub timestamp: u64,
}

/// Output of the collision avoidance provider.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct AvoidanceData {
    /// Avoidance vector in the horizontal plane
    pub vector: [f64; 2],

    /// Distance to the closest obstacle
    pub obs_dist_m: f64,

    /// True if an obstacle is within the risk range
    pub risk: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Any telemetry input, used when telemetry arrives over a single stream.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub enum TlmInput {
    EstimatorStates(EstimatorStates),
    AngularVelocity(VehicleAngularVelocity),
    Timesync(Timesync),
    Avoidance(AvoidanceData),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TlmInput {
    /// Parse a telemetry input from a single line of JSON.
    pub fn from_json(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_estimator_states() {
        let line = r#"{"EstimatorStates":{"timestamp":12,"attitude_q":[1,0,0,0],
            "velocity_ms":[1,0,0],"position_m":[0,0,-5]}}"#;

        match TlmInput::from_json(line).unwrap() {
            TlmInput::EstimatorStates(s) => {
                assert_eq!(s.timestamp, 12);
                assert_eq!(s.position_m, [0.0, 0.0, -5.0]);
                assert_eq!(s.wind_ne_ms, [0.0, 0.0]);
            }
            other => panic!("Unexpected input {:?}", other),
        }
    }
}
