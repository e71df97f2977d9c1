//! # Nonlinear disturbance observer
//!
//! The translational dynamics are modelled as
//!
//! ```text
//! dv/dt = f(v, F_b, att) + d
//! ```
//!
//! where `f` is thrust, gravity and drag, and `d` the unknown disturbance
//! acceleration. The observer uses the auxiliary state `z = d_hat - L v`:
//!
//! ```text
//! dz/dt = -L (z + L v) - L f
//! d_hat = z + L v
//! ```
//!
//! so that the estimate error decays with the diagonal gains `L`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{Rotation3, Vector3};

use crate::params::VehicleParams;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A disturbance observer stepped once per control tick.
pub trait DisturbanceObserver: Send {
    fn observe(&mut self, input: &ObserverInput) -> ObserverOutput;

    /// Forget the internal state, the next estimate starts from zero.
    fn reset(&mut self);
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct ObserverInput {
    pub dt_s: f64,

    pub velocity_ms: Vector3<f64>,

    /// Roll, pitch and yaw.
    pub attitude_rad: Vector3<f64>,

    /// Force commanded in the body frame on the previous tick.
    pub force_body_n: Vector3<f64>,

    pub vehicle: VehicleParams
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ObserverOutput {
    /// Estimated disturbance acceleration, excluding modelled drag.
    pub disturbance_ms2: Vector3<f64>,

    /// Modelled drag acceleration.
    pub drag_ms2: Vector3<f64>
}

pub struct Ndo {
    gains: Vector3<f64>,
    z: Vector3<f64>,
    initialised: bool
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Ndo {
    pub fn new(gains: [f64; 3]) -> Self {
        Self {
            gains: Vector3::from(gains),
            z: Vector3::zeros(),
            initialised: false
        }
    }
}

impl DisturbanceObserver for Ndo {
    fn observe(&mut self, input: &ObserverInput) -> ObserverOutput {
        let v = &input.vehicle;

        // Modelled acceleration in NED
        let rot = Rotation3::from_euler_angles(
            input.attitude_rad[0], 
            input.attitude_rad[1], 
            input.attitude_rad[2]
        );
        let drag = v.drag_accel(&input.velocity_ms);
        let model = rot * input.force_body_n / v.mass_kg
            + Vector3::new(0.0, 0.0, v.gravity_ms2)
            + drag;

        let lv = self.gains.component_mul(&input.velocity_ms);

        // Start from a zero estimate
        if !self.initialised {
            self.z = -lv;
            self.initialised = true;
        }

        let d_hat = self.z + lv;
        self.z -= input.dt_s * self.gains.component_mul(&(d_hat + model));

        ObserverOutput {
            disturbance_ms2: self.z + lv,
            drag_ms2: drag
        }
    }

    fn reset(&mut self) {
        self.z = Vector3::zeros();
        self.initialised = false;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    /// Simulate a vehicle holding attitude under a constant disturbance and
    /// check the observer converges to it.
    #[test]
    fn test_converges_to_constant_disturbance() {
        let vehicle = VehicleParams::default();
        let dist = Vector3::new(0.5, -0.2, 0.1);
        let dt_s = 0.004;

        let mut ndo = Ndo::new([6.0, 6.0, 3.0]);
        let mut vel = Vector3::new(1.0, 0.0, 0.0);
        let force = Vector3::new(0.0, 0.0, -vehicle.mass_kg * vehicle.gravity_ms2);
        let mut out = ObserverOutput::default();

        for _ in 0..2500 {
            let input = ObserverInput {
                dt_s,
                velocity_ms: vel,
                attitude_rad: Vector3::zeros(),
                force_body_n: force,
                vehicle
            };
            out = ndo.observe(&input);

            // Propagate the true dynamics with the same model
            let accel = force / vehicle.mass_kg 
                + Vector3::new(0.0, 0.0, vehicle.gravity_ms2)
                + vehicle.drag_accel(&vel)
                + dist;
            vel += accel * dt_s;
        }

        assert!((out.disturbance_ms2 - dist).norm() < 1e-3);
    }

    #[test]
    fn test_first_estimate_near_zero() {
        let vehicle = VehicleParams::default();
        let mut ndo = Ndo::new([6.0, 6.0, 3.0]);

        // Hovering, nothing unmodelled
        let out = ndo.observe(&ObserverInput {
            dt_s: 0.004,
            velocity_ms: Vector3::zeros(),
            attitude_rad: Vector3::zeros(),
            force_body_n: Vector3::new(0.0, 0.0, -vehicle.mass_kg * vehicle.gravity_ms2),
            vehicle
        });

        assert!(out.disturbance_ms2.norm() < 1e-9);
        assert_eq!(out.drag_ms2, Vector3::zeros());
    }
}
