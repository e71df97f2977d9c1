//! # Pursuit guidance law
//!
//! The vehicle is steered towards a look-ahead point on the current path
//! segment at the desired speed. The resulting acceleration demand, with the
//! estimated disturbance removed, is converted into a thrust vector and from
//! there into attitude angles and a normalised thrust.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector3;
use serde::Serialize;

use super::PursuitParams;
use crate::{
    guid_adapt::GuidParams,
    params::VehicleParams,
    state_cache::VehicleState,
    waypoints::{look_ahead_point, WaypointSeq}
};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A guidance law producing one command from the current state and route.
pub trait GuidanceLaw: Send {
    fn command(&mut self, input: &GuidanceInput) -> GuidanceOutput;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

pub struct GuidanceInput<'a> {
    pub state: &'a VehicleState,
    pub waypoints: &'a WaypointSeq,

    /// Index of the current target waypoint.
    pub wp_index: usize,

    /// Disturbance acceleration to compensate, including drag.
    pub disturbance_ms2: Vector3<f64>,

    pub guid: GuidParams
}

/// Output of a guidance law.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GuidanceOutput {
    /// Normalised thrust, in [0, 1].
    pub thrust: f64,

    /// Commanded roll, pitch and yaw.
    ///
    /// Units: radians
    pub att_cmd_rad: Vector3<f64>,

    /// Point the vehicle is steering towards.
    ///
    /// Units: meters, frame: local NED
    pub target_pos_m: Vector3<f64>,

    /// Azimuth of the line of sight to the target.
    ///
    /// Units: radians
    pub los_azim_rad: f64,

    /// Commanded force.
    ///
    /// Units: Newtons, frame: body
    pub force_body_n: Vector3<f64>
}

pub struct Pursuit {
    params: PursuitParams,
    vehicle: VehicleParams
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pursuit {
    pub fn new(params: PursuitParams, vehicle: VehicleParams) -> Self {
        Self { params, vehicle }
    }
}

impl GuidanceLaw for Pursuit {
    fn command(&mut self, input: &GuidanceInput) -> GuidanceOutput {
        let pos = input.state.position_m;
        let g = self.vehicle.gravity_ms2;

        // Past the end of the route the last waypoint is held
        let last = input.waypoints.len().saturating_sub(1);
        let index = input.wp_index.min(last);
        let (start, end) = match input.waypoints.segment(index, &pos) {
            Some(s) => s,
            None => (pos, pos)
        };

        let target = look_ahead_point(&pos, &start, &end, input.guid.look_ahead_m());
        let los = target - pos;
        let los_azim_rad = los[1].atan2(los[0]);

        // Slow down inside the reach distance of the final waypoint
        let mut speed_ms = input.guid.des_speed_ms();
        if index == last {
            let reach_m = input.guid.reach_m();
            let dist_m = (end - pos).norm();
            if reach_m > 0.0 && dist_m < reach_m {
                speed_ms *= dist_m / reach_m;
            }
        }

        let vel_des = match los.try_normalize(1e-6) {
            Some(dir) => dir * speed_ms,
            None => Vector3::zeros()
        };

        // Acceleration the thrust must provide
        let accel = self.params.vel_gain * (vel_des - input.state.velocity_ms)
            - input.disturbance_ms2
            - Vector3::new(0.0, 0.0, g);

        // Thrust points up, so the vertical component is negative in NED
        let lift = (-accel[2]).max(self.params.min_lift_accel_ms2);
        let mut horiz = accel.xy();
        let max_horiz = lift * self.params.max_tilt_rad.tan();
        if horiz.norm() > max_horiz {
            horiz *= max_horiz / horiz.norm();
        }
        let accel = Vector3::new(horiz[0], horiz[1], -lift);
        let accel_mag = accel.norm();

        // Rotate into the heading frame and solve for roll and pitch
        let yaw = los_azim_rad;
        let fwd = yaw.cos() * accel[0] + yaw.sin() * accel[1];
        let right = -yaw.sin() * accel[0] + yaw.cos() * accel[1];
        let pitch = (-fwd).atan2(lift);
        let roll = (right / accel_mag).max(-1.0).min(1.0).asin();

        GuidanceOutput {
            thrust: (accel_mag / g * self.vehicle.hover_thrust).max(0.0).min(1.0),
            att_cmd_rad: Vector3::new(roll, pitch, yaw),
            target_pos_m: target,
            los_azim_rad,
            force_body_n: Vector3::new(0.0, 0.0, -self.vehicle.mass_kg * accel_mag)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn pursuit() -> Pursuit {
        Pursuit::new(
            PursuitParams {
                vel_gain: 1.0,
                max_tilt_rad: 0.5,
                min_lift_accel_ms2: 2.0
            },
            VehicleParams::default()
        )
    }

    #[test]
    fn test_hover_on_target() {
        let wps = WaypointSeq::new(vec![Vector3::new(0.0, 0.0, -5.0)]);
        let state = VehicleState {
            position_m: Vector3::new(0.0, 0.0, -5.0),
            ..Default::default()
        };

        let out = pursuit().command(&GuidanceInput {
            state: &state,
            waypoints: &wps,
            wp_index: 0,
            disturbance_ms2: Vector3::zeros(),
            guid: GuidParams::new(5.0, 3.0)
        });

        assert!((out.thrust - VehicleParams::default().hover_thrust).abs() < 1e-9);
        assert!(out.att_cmd_rad[0].abs() < 1e-9);
        assert!(out.att_cmd_rad[1].abs() < 1e-9);
    }

    #[test]
    fn test_pitches_towards_target() {
        let wps = WaypointSeq::new(vec![Vector3::new(10.0, 0.0, -5.0)]);
        let state = VehicleState {
            position_m: Vector3::new(0.0, 0.0, -5.0),
            ..Default::default()
        };

        let out = pursuit().command(&GuidanceInput {
            state: &state,
            waypoints: &wps,
            wp_index: 0,
            disturbance_ms2: Vector3::zeros(),
            guid: GuidParams::new(5.0, 3.0)
        });

        // Heading north, nose down to accelerate
        assert!(out.los_azim_rad.abs() < 1e-9);
        assert!(out.att_cmd_rad[1] < 0.0);
        assert!(out.att_cmd_rad[1] >= -0.5 - 1e-9);
        assert!((out.target_pos_m - Vector3::new(3.0, 0.0, -5.0)).norm() < 1e-9);
    }

    #[test]
    fn test_compensates_disturbance() {
        let wps = WaypointSeq::new(vec![Vector3::new(0.0, 0.0, -5.0)]);
        let state = VehicleState {
            position_m: Vector3::new(0.0, 0.0, -5.0),
            ..Default::default()
        };

        // A push to the east must be countered by rolling west
        let out = pursuit().command(&GuidanceInput {
            state: &state,
            waypoints: &wps,
            wp_index: 0,
            disturbance_ms2: Vector3::new(0.0, 1.0, 0.0),
            guid: GuidParams::new(5.0, 3.0)
        });

        assert!(out.att_cmd_rad[0] < 0.0);
    }

    #[test]
    fn test_level_when_nothing_demanded() {
        let wps = WaypointSeq::new(vec![Vector3::new(0.0, 0.0, -5.0)]);
        let state = VehicleState {
            position_m: Vector3::new(0.0, 0.0, -5.0),
            ..Default::default()
        };
        let g = VehicleParams::default().gravity_ms2;

        // Disturbance holding the vehicle up, the demanded acceleration is zero
        let out = pursuit().command(&GuidanceInput {
            state: &state,
            waypoints: &wps,
            wp_index: 0,
            disturbance_ms2: Vector3::new(0.0, 0.0, -g),
            guid: GuidParams::new(5.0, 3.0)
        });

        assert!(out.att_cmd_rad.iter().all(|a| a.is_finite() && a.abs() < 1e-9));
        assert!((out.thrust - 2.0 / g * VehicleParams::default().hover_thrust).abs() < 1e-9);
    }
}
