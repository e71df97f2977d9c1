//! # Path Following
//!
//! PathFollow keeps the mission clock and runs the guidance law to produce
//! the command for the current waypoint.
//!
//! The mission clock starts on the first tick after the initial position has
//! been reached, and advances by one control period every tick after that.
//! The guidance law runs on every `tick_divider`-th tick of the mission
//! clock. Before the clock starts no command is generated.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
pub mod pursuit;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::info;
use std::{convert::Infallible, sync::Arc};
use thiserror::Error;
use util::{module::State, params as util_params, session::Session};

pub use params::{Params, PursuitParams};
pub use pursuit::{GuidanceInput, GuidanceLaw, GuidanceOutput, Pursuit};
use crate::{
    cmd_arb::PendingCmd,
    dist_est::DistEstimate,
    guid_adapt::GuidParams,
    params::{CtrlMode, VehicleParams},
    shared::Shared,
    state_cache::VehicleState,
    waypoints::WaypointSeq
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

pub struct PathFollow {
    params: Params,
    dt_s: f64,

    law: Box<dyn GuidanceLaw>,

    /// Guidance parameters, written by the adaptation task
    guid: Shared<GuidParams>,

    /// Number of ticks since the mission clock started
    num_ticks: u64,

    started: bool
}

pub struct InitData {
    pub params_path: String,
    pub vehicle: VehicleParams,
    pub dt_s: f64,
    pub guid: Shared<GuidParams>
}

#[derive(Clone)]
pub struct InputData {
    pub state: VehicleState,
    pub dist: DistEstimate,
    pub waypoints: Arc<WaypointSeq>,

    /// Index of the current target waypoint
    pub wp_index: usize,

    /// Set once the vehicle has reached the initial position
    pub initial_pos_reached: bool
}

/// A generated command and the conditions it was generated with.
#[derive(Debug, Clone, Copy)]
pub struct PfOutput {
    pub mission_time_s: f64,
    pub guid: GuidParams,
    pub cmd: GuidanceOutput
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StatusReport {
    pub mission_time_s: f64,

    /// True if the guidance law ran this tick
    pub law_executed: bool
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum InitError {
    #[error("Could not load PathFollow parameters: {0}")]
    ParamLoadError(util_params::LoadError),

    #[error("The tick divider must be at least 1")]
    InvalidTickDivider,

    #[error("The minimum lift acceleration must be positive, got {0} m/s^2")]
    InvalidMinLift(f64),

    #[error("The control period must be positive, got {0} s")]
    InvalidPeriod(f64)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for PathFollow {
    type InitData = InitData;
    type InitError = InitError;

    type InputData = InputData;
    type OutputData = Option<PfOutput>;
    type StatusReport = StatusReport;
    type ProcError = Infallible;

    fn init(
        init_data: Self::InitData, 
        _session: &Session
    ) -> Result<Self, Self::InitError> {
        let params: Params = util_params::load(&init_data.params_path)
            .map_err(InitError::ParamLoadError)?;

        let law = Box::new(Pursuit::new(params.pursuit, init_data.vehicle));

        Self::new(params, init_data.dt_s, law, init_data.guid)
    }

    fn proc(
        &mut self, 
        input_data: &Self::InputData
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        if !input_data.initial_pos_reached || input_data.waypoints.is_empty() {
            return Ok((None, StatusReport::default()))
        }

        if !self.started {
            info!("Mission clock started");
            self.started = true;
        }

        let report = StatusReport {
            mission_time_s: self.mission_time_s(),
            law_executed: self.num_ticks % self.params.tick_divider == 0
        };
        self.num_ticks += 1;

        if !report.law_executed {
            return Ok((None, report))
        }

        let guid = self.guid.get();
        let cmd = self.law.command(&GuidanceInput {
            state: &input_data.state,
            waypoints: &input_data.waypoints,
            wp_index: input_data.wp_index,
            disturbance_ms2: input_data.dist.total,
            guid
        });

        Ok((
            Some(PfOutput {
                mission_time_s: report.mission_time_s,
                guid,
                cmd
            }),
            report
        ))
    }
}

impl PathFollow {
    pub fn new(
        params: Params,
        dt_s: f64,
        law: Box<dyn GuidanceLaw>,
        guid: Shared<GuidParams>
    ) -> Result<Self, InitError> {
        if params.tick_divider == 0 {
            return Err(InitError::InvalidTickDivider)
        }
        if !(params.pursuit.min_lift_accel_ms2 > 0.0) {
            return Err(InitError::InvalidMinLift(params.pursuit.min_lift_accel_ms2))
        }
        if !(dt_s > 0.0) {
            return Err(InitError::InvalidPeriod(dt_s))
        }

        Ok(Self {
            params,
            dt_s,
            law,
            guid,
            num_ticks: 0,
            started: false
        })
    }

    /// Time since the mission clock started.
    ///
    /// Units: seconds
    pub fn mission_time_s(&self) -> f64 {
        self.num_ticks as f64 * self.dt_s
    }

    /// Number of control ticks since the mission clock started.
    pub fn num_ticks(&self) -> u64 {
        self.num_ticks
    }
}

impl PfOutput {
    /// Choose the type of command to hand to arbitration.
    ///
    /// Position commands are produced once the route is finished or when
    /// position control is selected, otherwise attitude commands are.
    pub fn select_cmd(
        &self, 
        wp_index: usize, 
        num_wps: usize, 
        ctrl_mode: CtrlMode
    ) -> PendingCmd {
        if wp_index >= num_wps || ctrl_mode != CtrlMode::Attitude {
            PendingCmd::Position {
                target_m: self.cmd.target_pos_m,
                yaw_rad: self.cmd.los_azim_rad
            }
        }
        else {
            PendingCmd::Attitude {
                att_rad: self.cmd.att_cmd_rad,
                thrust: self.cmd.thrust
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use nalgebra::Vector3;

    struct FixedLaw {
        calls: usize
    }

    impl GuidanceLaw for FixedLaw {
        fn command(&mut self, _input: &GuidanceInput) -> GuidanceOutput {
            self.calls += 1;
            GuidanceOutput {
                thrust: 0.5,
                att_cmd_rad: Vector3::new(0.1, -0.1, 0.0),
                target_pos_m: Vector3::new(1.0, 2.0, -5.0),
                los_azim_rad: 0.3,
                force_body_n: Vector3::zeros()
            }
        }
    }

    fn path_follow(divider: u64) -> PathFollow {
        PathFollow::new(
            Params {
                tick_divider: divider,
                pursuit: PursuitParams {
                    vel_gain: 1.0,
                    max_tilt_rad: 0.5,
                    min_lift_accel_ms2: 2.0
                }
            },
            0.004,
            Box::new(FixedLaw { calls: 0 }),
            Shared::new(GuidParams::new(5.0, 3.0))
        ).unwrap()
    }

    fn input(reached: bool) -> InputData {
        InputData {
            state: VehicleState::default(),
            dist: DistEstimate::default(),
            waypoints: Arc::new(WaypointSeq::new(vec![Vector3::new(10.0, 0.0, -5.0)])),
            wp_index: 0,
            initial_pos_reached: reached
        }
    }

    #[test]
    fn test_mission_clock() {
        let mut pf = path_follow(1);

        // Nothing before the initial position is reached
        for _ in 0..10 {
            let (out, rpt) = pf.proc(&input(false)).unwrap();
            assert!(out.is_none());
            assert_eq!(rpt.mission_time_s, 0.0);
        }

        let (out, _) = pf.proc(&input(true)).unwrap();
        assert_eq!(out.unwrap().mission_time_s, 0.0);

        for _ in 0..9 {
            pf.proc(&input(true)).unwrap();
        }
        let (out, _) = pf.proc(&input(true)).unwrap();
        assert!((out.unwrap().mission_time_s - 0.04).abs() < 1e-12);
    }

    #[test]
    fn test_tick_divider() {
        let mut pf = path_follow(4);

        let executed = (0..12)
            .filter(|_| pf.proc(&input(true)).unwrap().0.is_some())
            .count();

        assert_eq!(executed, 3);
        assert_eq!(pf.num_ticks(), 12);
    }

    #[test]
    fn test_select_cmd() {
        let mut pf = path_follow(1);
        let out = pf.proc(&input(true)).unwrap().0.unwrap();

        assert!(matches!(
            out.select_cmd(0, 2, CtrlMode::Attitude), 
            PendingCmd::Attitude { .. }
        ));
        assert!(matches!(
            out.select_cmd(0, 2, CtrlMode::Position), 
            PendingCmd::Position { .. }
        ));
        // Route finished, position commands regardless of the mode
        assert!(matches!(
            out.select_cmd(2, 2, CtrlMode::Attitude), 
            PendingCmd::Position { .. }
        ));
    }

    #[test]
    fn test_invalid_divider() {
        assert!(matches!(
            PathFollow::new(
                Params {
                    tick_divider: 0,
                    pursuit: PursuitParams {
                        vel_gain: 1.0,
                        max_tilt_rad: 0.5,
                        min_lift_accel_ms2: 2.0
                    }
                },
                0.004,
                Box::new(FixedLaw { calls: 0 }),
                Shared::new(GuidParams::new(5.0, 3.0))
            ),
            Err(InitError::InvalidTickDivider)
        ));
    }

    #[test]
    fn test_invalid_min_lift() {
        for &min_lift in &[0.0, -1.0, std::f64::NAN] {
            let res = PathFollow::new(
                Params {
                    tick_divider: 1,
                    pursuit: PursuitParams {
                        vel_gain: 1.0,
                        max_tilt_rad: 0.5,
                        min_lift_accel_ms2: min_lift
                    }
                },
                0.004,
                Box::new(FixedLaw { calls: 0 }),
                Shared::new(GuidParams::new(5.0, 3.0))
            );
            assert!(matches!(res, Err(InitError::InvalidMinLift(_))), "min lift {}", min_lift);
        }
    }
}
