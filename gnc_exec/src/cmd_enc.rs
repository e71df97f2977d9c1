//! # Command encoder
//!
//! Converts arbitrated commands and mode requests into FMU messages.
//!
//! Conventions that must be kept:
//! - Unset velocity and rate fields are NaN, never zero. A zero velocity
//!   would be a valid "stop" demand.
//! - Thrust is along the body z axis which points down, so the commanded
//!   thrust magnitude is negated.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::fmu::{
    FmuSetpoint, 
    OffboardControlMode, 
    TrajectorySetpoint, 
    VehicleAttitudeSetpoint, 
    VehicleCommand,
    VEHICLE_CMD_COMPONENT_ARM_DISARM,
    VEHICLE_CMD_DO_SET_MODE
};
use util::maths::euler_to_quat;

use crate::cmd_arb::ArbCmd;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Second arm/disarm parameter, forces the request through the pre-arm
/// checks.
const ARM_DISARM_FORCE: f64 = 21196.0;

/// Custom main mode number of offboard mode.
const OFFBOARD_MAIN_MODE: f64 = 6.0;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Encode an arbitrated command as a setpoint stamped with `stamp_us`.
pub fn encode(cmd: &ArbCmd, stamp_us: u64) -> FmuSetpoint {
    match *cmd {
        ArbCmd::Position { target_m, yaw_rad } => {
            FmuSetpoint::Trajectory(TrajectorySetpoint {
                timestamp: stamp_us,
                position_m: [target_m[0], target_m[1], target_m[2]],
                velocity_ms: [std::f64::NAN; 3],
                yaw_rad
            })
        },
        ArbCmd::Attitude { att_rad, thrust, body_rate_rads, yaw_rate_rads } => {
            FmuSetpoint::Attitude(VehicleAttitudeSetpoint {
                timestamp: stamp_us,
                roll_body: body_rate_rads[0],
                pitch_body: body_rate_rads[1],
                yaw_body: body_rate_rads[2],
                q_d: euler_to_quat(att_rad[0], att_rad[1], att_rad[2]),
                thrust_body: [0.0, 0.0, -thrust],
                yaw_sp_move_rate: yaw_rate_rads
            })
        }
    }
}

/// The control mode heartbeat, asserting every channel.
pub fn heartbeat(stamp_us: u64) -> OffboardControlMode {
    OffboardControlMode {
        timestamp: stamp_us,
        position: true,
        velocity: true,
        acceleration: true,
        attitude: true,
        body_rate: true
    }
}

pub fn arm(stamp_us: u64) -> VehicleCommand {
    VehicleCommand::new(stamp_us, VEHICLE_CMD_COMPONENT_ARM_DISARM, 1.0, ARM_DISARM_FORCE)
}

pub fn disarm(stamp_us: u64) -> VehicleCommand {
    VehicleCommand::new(stamp_us, VEHICLE_CMD_COMPONENT_ARM_DISARM, 0.0, ARM_DISARM_FORCE)
}

/// Request offboard mode.
pub fn offboard(stamp_us: u64) -> VehicleCommand {
    VehicleCommand::new(stamp_us, VEHICLE_CMD_DO_SET_MODE, 1.0, OFFBOARD_MAIN_MODE)
}

#[cfg(test)]
mod test {
    use super::*;
    use nalgebra::Vector3;

    #[test]
    fn test_position_velocity_unset() {
        let sp = encode(&ArbCmd::Position {
            target_m: Vector3::new(1.0, 2.0, -5.0),
            yaw_rad: 0.5
        }, 42);

        match sp {
            FmuSetpoint::Trajectory(t) => {
                assert_eq!(t.timestamp, 42);
                assert_eq!(t.position_m, [1.0, 2.0, -5.0]);
                assert!(t.velocity_ms.iter().all(|v| v.is_nan()));
                assert_eq!(t.yaw_rad, 0.5);
            },
            _ => panic!("Expected a trajectory setpoint")
        }
    }

    #[test]
    fn test_attitude_thrust_negated() {
        let sp = encode(&ArbCmd::Attitude {
            att_rad: Vector3::new(0.1, -0.2, 0.3),
            thrust: 0.7,
            body_rate_rads: Vector3::repeat(std::f64::NAN),
            yaw_rate_rads: 0.0
        }, 7);

        match sp {
            FmuSetpoint::Attitude(a) => {
                assert_eq!(a.thrust_body, [0.0, 0.0, -0.7]);
                assert_eq!(a.q_d, euler_to_quat(0.1, -0.2, 0.3));

                // The attitude goes through the quaternion only
                assert!(a.roll_body.is_nan());
                assert!(a.pitch_body.is_nan());
                assert!(a.yaw_body.is_nan());
                assert_eq!(a.yaw_sp_move_rate, 0.0);
            },
            _ => panic!("Expected an attitude setpoint")
        }
    }

    #[test]
    fn test_quaternion_matches_euler() {
        let att = Vector3::new(0.1, -0.3, 1.2);
        let sp = encode(&ArbCmd::Attitude {
            att_rad: att,
            thrust: 0.5,
            body_rate_rads: Vector3::repeat(std::f64::NAN),
            yaw_rate_rads: 0.0
        }, 0);

        if let FmuSetpoint::Attitude(a) = sp {
            let back = util::maths::quat_to_euler(a.q_d);
            for i in 0..3 {
                assert!((back[i] - att[i]).abs() < 1e-9);
            }
        }
        else {
            panic!("Expected an attitude setpoint");
        }
    }

    #[test]
    fn test_vehicle_commands() {
        let a = arm(1);
        assert_eq!((a.command, a.param1, a.param2), (400, 1.0, 21196.0));
        assert_eq!((a.target_system, a.target_component), (1, 1));

        let d = disarm(1);
        assert_eq!((d.command, d.param1), (400, 0.0));

        let o = offboard(1);
        assert_eq!((o.command, o.param1, o.param2), (176, 1.0, 6.0));

        let h = heartbeat(3);
        assert!(h.position && h.velocity && h.acceleration && h.attitude && h.body_rate);
    }
}
