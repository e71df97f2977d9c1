//! # Vehicle state cache
//!
//! Holds the most recent vehicle state. Telemetry handlers write into the
//! cache as messages arrive, and every periodic task reads a consistent copy
//! of the whole state.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector3;
use serde::Serialize;
use comms_if::tlm::{EstimatorStates, VehicleAngularVelocity};
use util::maths::quat_to_euler;

use crate::shared::Shared;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The estimated state of the vehicle in the local NED frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct VehicleState {
    /// Units: meters
    pub position_m: Vector3<f64>,

    /// Units: meters/second
    pub velocity_ms: Vector3<f64>,

    /// Roll, pitch and yaw.
    ///
    /// Units: radians
    pub attitude_rad: Vector3<f64>,

    /// Body angular rates.
    ///
    /// Units: radians/second
    pub rate_rads: Vector3<f64>,

    /// Timestamp of the last estimator sample.
    ///
    /// Units: microseconds
    pub timestamp_us: u64
}

/// The cache itself. Clones share the same underlying state.
#[derive(Debug, Clone, Default)]
pub struct StateCache {
    state: Shared<VehicleState>
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl StateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the whole state.
    pub fn update(&self, sample: VehicleState) {
        self.state.set(sample);
    }

    /// Get a copy of the latest state.
    ///
    /// Before the first update this is the all-zero state.
    pub fn read(&self) -> VehicleState {
        self.state.get()
    }

    /// Update position, velocity and attitude from an estimator sample,
    /// keeping the last known body rates.
    pub fn update_estimator(&self, msg: &EstimatorStates) {
        let euler = quat_to_euler(msg.attitude_q);

        self.state.update(|s| {
            s.position_m = Vector3::from(msg.position_m);
            s.velocity_ms = Vector3::from(msg.velocity_ms);
            s.attitude_rad = Vector3::from(euler);
            s.timestamp_us = msg.timestamp;
        });
    }

    /// Update the body rates, keeping the rest of the state.
    pub fn update_rates(&self, msg: &VehicleAngularVelocity) {
        self.state.update(|s| s.rate_rads = Vector3::from(msg.xyz_rads));
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_read_before_update_is_zero() {
        let cache = StateCache::new();
        assert_eq!(cache.read(), VehicleState::default());
    }

    #[test]
    fn test_partial_updates() {
        let cache = StateCache::new();
        let reader = cache.clone();

        cache.update_rates(&VehicleAngularVelocity {
            timestamp: 5,
            xyz_rads: [0.1, 0.2, 0.3]
        });
        cache.update_estimator(&EstimatorStates {
            timestamp: 10,
            attitude_q: [1.0, 0.0, 0.0, 0.0],
            velocity_ms: [1.0, 0.0, 0.0],
            position_m: [0.0, 2.0, -5.0],
            wind_ne_ms: [0.0, 0.0]
        });

        let s = reader.read();
        assert_eq!(s.position_m, Vector3::new(0.0, 2.0, -5.0));
        assert_eq!(s.rate_rads, Vector3::new(0.1, 0.2, 0.3));
        assert_eq!(s.attitude_rad, Vector3::zeros());
        assert_eq!(s.timestamp_us, 10);
    }
}
