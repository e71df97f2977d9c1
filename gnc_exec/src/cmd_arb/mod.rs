//! # Command Arbitration
//!
//! CmdArb decides which command leaves the core on each control tick, and
//! tracks progress along the route.
//!
//! Modes:
//! - `PositionHold`: hold the initial position until the vehicle has reached
//!   it and a route is loaded.
//! - `PathFollowing`: emit the command produced by path following this tick,
//!   or a position command towards the current waypoint if there isn't one.
//!   Waypoints are accepted on planar distance.
//! - `Complete`: the route is finished. Commands are still emitted as in
//!   `PathFollowing` but no waypoint is accepted and the progress log is
//!   closed.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
pub mod progress;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{info, warn};
use nalgebra::Vector3;
use serde::Serialize;
use std::sync::Arc;
use std::convert::Infallible;
use thiserror::Error;
use util::{
    maths::{planar_bearing, planar_dist},
    module::State,
    params as util_params,
    session::{Session, SessionError}
};

pub use params::Params;
pub use progress::{ProgressLog, ProgressLogError, ProgressRecord};
use crate::{state_cache::VehicleState, waypoints::WaypointSeq};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

pub struct CmdArb {
    params: Params,

    mode: ArbMode,

    /// Index of the current target waypoint
    wp_index: usize,

    /// Command produced by path following and not yet consumed
    pending: Option<PendingCmd>,

    /// Position command emitted when there is no pending command
    fallback: ArbCmd,

    progress: ProgressLog
}

#[derive(Clone)]
pub struct InputData {
    pub state: VehicleState,
    pub waypoints: Arc<WaypointSeq>
}

/// Which kind of command is pending. At most one flag is ever set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModeFlags {
    pub position_cmd_pending: bool,
    pub attitude_cmd_pending: bool
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusReport {
    pub mode: ArbMode,
    pub wp_index: usize,

    /// Planar distance to the current waypoint, zero when there isn't one.
    ///
    /// Units: meters
    pub wp_dist_m: f64,

    /// True if a waypoint was accepted this tick
    pub wp_accepted: bool,

    /// True if the emitted command came from path following this tick
    pub fresh_cmd: bool
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ArbMode {
    PositionHold,
    PathFollowing,
    Complete
}

/// A command produced by path following, waiting for arbitration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PendingCmd {
    Position {
        /// Units: meters, frame: local NED
        target_m: Vector3<f64>,
        yaw_rad: f64
    },
    Attitude {
        /// Roll, pitch and yaw in radians
        att_rad: Vector3<f64>,
        thrust: f64
    }
}

/// The command chosen for this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArbCmd {
    Position {
        target_m: Vector3<f64>,
        yaw_rad: f64
    },
    Attitude {
        att_rad: Vector3<f64>,
        thrust: f64,

        /// NaN where the rate is not commanded.
        body_rate_rads: Vector3<f64>,
        yaw_rate_rads: f64
    }
}

#[derive(Debug, Error)]
pub enum InitError {
    #[error("Could not load CmdArb parameters: {0}")]
    ParamLoadError(util_params::LoadError),

    #[error("Invalid CmdArb parameters: {0}")]
    InvalidParams(&'static str),

    #[error("Could not open the progress log: {0}")]
    ProgressLogOpenError(SessionError)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for ArbMode {
    fn default() -> Self {
        ArbMode::PositionHold
    }
}

impl State for CmdArb {
    type InitData = String;
    type InitError = InitError;

    type InputData = InputData;
    type OutputData = ArbCmd;
    type StatusReport = StatusReport;
    type ProcError = Infallible;

    /// Load the parameters and open the progress log in the session
    /// directory.
    fn init(
        init_data: Self::InitData, 
        session: &Session
    ) -> Result<Self, Self::InitError> {
        let params: Params = util_params::load(&init_data)
            .map_err(InitError::ParamLoadError)?;

        let progress = match params.progress_log_path {
            Some(ref p) => ProgressLog::new(Box::new(
                session.open_append(p).map_err(InitError::ProgressLogOpenError)?
            )),
            None => ProgressLog::disabled()
        };

        Self::new(params, progress)
    }

    fn proc(
        &mut self, 
        input_data: &Self::InputData
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        let mut report = StatusReport::default();

        let cmd = match self.mode {
            ArbMode::PositionHold => self.mode_position_hold(input_data),
            ArbMode::PathFollowing | ArbMode::Complete => 
                self.mode_path_following(input_data, &mut report)
        };

        // Whatever was pending has now been used or superseded
        self.pending = None;

        report.mode = self.mode;
        report.wp_index = self.wp_index;

        Ok((cmd, report))
    }
}

impl CmdArb {
    pub fn new(params: Params, progress: ProgressLog) -> Result<Self, InitError> {
        if !(params.acceptance_radius_m > 0.0) {
            return Err(InitError::InvalidParams("acceptance_radius_m must be positive"))
        }
        if !(params.initial_pos_tol_m > 0.0) {
            return Err(InitError::InvalidParams("initial_pos_tol_m must be positive"))
        }

        Ok(Self {
            fallback: ArbCmd::Position {
                target_m: Vector3::from(params.initial_pos_m),
                yaw_rad: 0.0
            },
            params,
            mode: ArbMode::PositionHold,
            wp_index: 0,
            pending: None,
            progress
        })
    }

    /// Hand over the command produced by path following this tick.
    pub fn set_pending(&mut self, cmd: PendingCmd) {
        self.pending = Some(cmd);
    }

    pub fn mode_flags(&self) -> ModeFlags {
        ModeFlags {
            position_cmd_pending: matches!(self.pending, Some(PendingCmd::Position { .. })),
            attitude_cmd_pending: matches!(self.pending, Some(PendingCmd::Attitude { .. }))
        }
    }

    pub fn mode(&self) -> ArbMode {
        self.mode
    }

    pub fn wp_index(&self) -> usize {
        self.wp_index
    }

    pub fn progress(&self) -> &ProgressLog {
        &self.progress
    }

    /// Close the progress log, used on shutdown.
    pub fn shutdown(&mut self) {
        self.progress.close();
    }

    /// Mode position hold.
    ///
    /// Commands the initial position. Moves to path following once the
    /// altitude is within tolerance and a route is loaded.
    fn mode_position_hold(&mut self, input: &InputData) -> ArbCmd {
        let init_pos = Vector3::from(self.params.initial_pos_m);
        let cmd = ArbCmd::Position {
            target_m: init_pos,
            yaw_rad: 0.0
        };

        let alt_err_m = (input.state.position_m[2] - init_pos[2]).abs();
        if alt_err_m < self.params.initial_pos_tol_m && !input.waypoints.is_empty() {
            info!(
                "Initial position reached, following a route of {} waypoints", 
                input.waypoints.len()
            );
            self.mode = ArbMode::PathFollowing;
        }

        cmd
    }

    /// Mode path following (and complete).
    fn mode_path_following(
        &mut self, 
        input: &InputData, 
        report: &mut StatusReport
    ) -> ArbCmd {
        let pos = input.state.position_m;

        // ---- WAYPOINT MANAGEMENT ----

        if let Some(wp) = input.waypoints.get(self.wp_index).copied() {
            self.fallback = ArbCmd::Position {
                target_m: wp,
                yaw_rad: planar_bearing(&pos, &wp)
            };

            report.wp_dist_m = planar_dist(&pos, &wp);
            if report.wp_dist_m < self.params.acceptance_radius_m {
                let rec = ProgressRecord {
                    index: self.wp_index,
                    wp_x_m: wp[0],
                    wp_y_m: wp[1],
                    pos_x_m: pos[0],
                    pos_y_m: pos[1]
                };
                if let Err(e) = self.progress.record(&rec) {
                    warn!("{}", e);
                }

                info!(
                    "Waypoint {} accepted at {:.2} m", 
                    self.wp_index, report.wp_dist_m
                );
                self.wp_index += 1;
                report.wp_accepted = true;
            }
        }

        if self.wp_index >= input.waypoints.len() && self.mode != ArbMode::Complete {
            info!("Route complete");
            self.mode = ArbMode::Complete;
            self.progress.close();
        }

        // ---- COMMAND SELECTION ----

        // While the route is unfinished position commands face the current
        // waypoint, whatever heading path following asked for
        let wp_bearing = input.waypoints.get(self.wp_index)
            .map(|wp| planar_bearing(&pos, wp));

        match self.pending {
            Some(PendingCmd::Position { target_m, yaw_rad }) => {
                report.fresh_cmd = true;
                ArbCmd::Position { 
                    target_m, 
                    yaw_rad: wp_bearing.unwrap_or(yaw_rad) 
                }
            },
            Some(PendingCmd::Attitude { att_rad, thrust }) => {
                report.fresh_cmd = true;
                ArbCmd::Attitude {
                    att_rad,
                    thrust,
                    body_rate_rads: Vector3::repeat(std::f64::NAN),
                    yaw_rate_rads: 0.0
                }
            },
            None => self.fallback
        }
    }
}
