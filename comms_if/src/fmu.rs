//! # Flight management unit messages
//!
//! Setpoints and commands emitted by the core. Unset fields in setpoints are
//! `NaN`, which the FMU treats as "not controlled", so a NaN velocity means
//! "hold the position" rather than "reach zero velocity".

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Vehicle command code for arming and disarming.
pub const VEHICLE_CMD_COMPONENT_ARM_DISARM: u32 = 400;

/// Vehicle command code for setting the flight mode.
pub const VEHICLE_CMD_DO_SET_MODE: u32 = 176;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Position, velocity and heading setpoint.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct TrajectorySetpoint {
    pub timestamp: u64,

    /// Target position in the NED frame, NaN for unset
    pub position_m: [f64; 3],

    /// Target velocity in the NED frame, NaN for unset
    pub velocity_ms: [f64; 3],

    /// Target heading
    pub yaw_rad: f64,
}

/// Attitude, thrust and body rate setpoint.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct VehicleAttitudeSetpoint {
    pub timestamp: u64,

    /// Body angle feed-forward terms, NaN for unset
    pub roll_body: f64,
    pub pitch_body: f64,
    pub yaw_body: f64,

    /// Desired attitude quaternion, scalar first
    pub q_d: [f64; 4],

    /// Normalised thrust in the body frame. Upward thrust is along -z.
    pub thrust_body: [f64; 3],

    /// Yaw rate feed-forward
    pub yaw_sp_move_rate: f64,
}

/// Heartbeat asserting which setpoint channels are valid.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffboardControlMode {
    pub timestamp: u64,
    pub position: bool,
    pub velocity: bool,
    pub acceleration: bool,
    pub attitude: bool,
    pub body_rate: bool,
}

/// A discrete vehicle command.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct VehicleCommand {
    pub timestamp: u64,
    pub command: u32,
    pub param1: f64,
    pub param2: f64,
    pub target_system: u8,
    pub target_component: u8,
    pub source_system: u8,
    pub source_component: u8,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The setpoint emitted on a control tick.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub enum FmuSetpoint {
    Trajectory(TrajectorySetpoint),
    Attitude(VehicleAttitudeSetpoint),
}

/// Any message sent to the FMU, used when all outputs share a single stream.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub enum FmuOutput {
    ControlMode(OffboardControlMode),
    Setpoint(FmuSetpoint),
    Command(VehicleCommand),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl VehicleCommand {
    /// Build a command addressed to the default system and component.
    pub fn new(timestamp: u64, command: u32, param1: f64, param2: f64) -> Self {
        Self {
            timestamp,
            command,
            param1,
            param2,
            target_system: 1,
            target_component: 1,
            source_system: 1,
            source_component: 1,
        }
    }
}

impl FmuSetpoint {
    /// Returns true if this is a trajectory (position) setpoint.
    pub fn is_trajectory(&self) -> bool {
        matches!(self, FmuSetpoint::Trajectory(_))
    }

    /// Returns true if this is an attitude setpoint.
    pub fn is_attitude(&self) -> bool {
        matches!(self, FmuSetpoint::Attitude(_))
    }
}
