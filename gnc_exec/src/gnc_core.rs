//! # Guidance and control core
//!
//! GncCore runs the control tick. Each tick is a fixed pipeline:
//!
//! 1. Read a snapshot of the vehicle state, the route and the stamp.
//! 2. Estimate the disturbance.
//! 3. Run path following, handing any command to arbitration.
//! 4. Arbitrate the command for this tick.
//! 5. Encode the command, with the heartbeat and any mode requests.
//!
//! A tick always produces a setpoint, whatever state the inputs are in.
//!
//! Inputs arrive on other threads through [`GncInputs`], and the slower
//! adaptation and learning tasks read the [`ControlStatus`] published at the
//! end of each tick.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{info, warn};
use nalgebra::Vector3;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use comms_if::{
    fmu::{FmuOutput, FmuSetpoint, OffboardControlMode, VehicleCommand},
    plan::{PlanError, WaypointMsg},
    tlm::{AvoidanceData, TlmInput}
};
use util::{module::State, session::Session};

use crate::{
    cmd_arb::{self, ArbMode, CmdArb},
    cmd_enc,
    dist_est::{self, DistEst, DistEstimate, DistSource},
    guid_adapt::{AdaptInput, GuidParams},
    learn::Forecast,
    params::{CtrlMode, GncExecParams},
    path_follow::{self, PathFollow},
    shared::Shared,
    state_cache::StateCache,
    waypoints::WaypointSeq
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

pub const DIST_EST_PARAMS: &str = "dist_est.toml";
pub const PATH_FOLLOW_PARAMS: &str = "path_follow.toml";
pub const CMD_ARB_PARAMS: &str = "cmd_arb.toml";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

pub struct GncCore {
    params: GncExecParams,
    ctrl_mode: CtrlMode,

    dist_est: DistEst,
    path_follow: PathFollow,
    cmd_arb: CmdArb,

    inputs: GncInputs,
    status: Shared<ControlStatus>,
    guid: Shared<GuidParams>,
    forecast: Shared<Forecast>,

    /// Body force commanded on the previous tick, fed to the observer
    force_cmd_body_n: Vector3<f64>,

    num_ticks: u64
}

/// Handles used to feed inputs into the core from any thread.
#[derive(Debug, Clone, Default)]
pub struct GncInputs {
    state_cache: StateCache,
    waypoints: Shared<Arc<WaypointSeq>>,
    avoidance: Shared<Option<AvoidanceData>>,

    /// Timestamp applied to outgoing messages
    stamp_us: Shared<u64>
}

/// Every handle shared between the core and the periodic tasks.
#[derive(Debug, Clone)]
pub struct CoreHandles {
    pub inputs: GncInputs,
    pub status: Shared<ControlStatus>,
    pub guid: Shared<GuidParams>,
    pub forecast: Shared<Forecast>
}

/// Status published at the end of every control tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ControlStatus {
    pub initial_pos_reached: bool,

    /// Control ticks since the mission clock started
    pub ticks_since_start: u64,

    /// Units: seconds
    pub mission_time_s: f64,

    /// Model-based disturbance estimate of this tick.
    ///
    /// Units: meters/second^2
    pub disturbance_ms2: Vector3<f64>,

    pub wp_index: usize,

    pub mode: ArbMode,

    /// Control ticks since start up
    pub num_ticks: u64
}

/// Everything produced by one control tick.
#[derive(Debug, Clone)]
pub struct TickOutput {
    pub control_mode: OffboardControlMode,
    pub setpoint: FmuSetpoint,

    /// Mode requests, only on the tick the warm-up ends
    pub vehicle_cmds: Vec<VehicleCommand>,

    pub arb: cmd_arb::StatusReport
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum InitError {
    #[error("The control period must be positive, got {0} s")]
    InvalidPeriod(f64),

    #[error("Could not initialise DistEst: {0}")]
    DistEstInitError(#[from] dist_est::InitError),

    #[error("Could not initialise PathFollow: {0}")]
    PathFollowInitError(#[from] path_follow::InitError),

    #[error("Could not initialise CmdArb: {0}")]
    CmdArbInitError(#[from] cmd_arb::InitError)
}

#[derive(Debug, Error)]
pub enum WaypointError {
    #[error("A route of {0} waypoints is already loaded")]
    AlreadyLoaded(usize),

    #[error("Attempted to load an empty route")]
    Empty,

    #[error("Invalid route: {0}")]
    Invalid(#[from] PlanError)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl GncInputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a telemetry input. Never blocks on the control tick beyond the
    /// time taken to copy the value in.
    pub fn handle_tlm(&self, tlm: &TlmInput) {
        match tlm {
            TlmInput::EstimatorStates(e) => self.state_cache.update_estimator(e),
            TlmInput::AngularVelocity(a) => self.state_cache.update_rates(a),
            TlmInput::Timesync(t) => self.stamp_us.set(t.timestamp),
            TlmInput::Avoidance(a) => self.avoidance.set(Some(*a))
        }
    }

    /// Load the route from a plan message.
    ///
    /// The route can only be loaded once.
    pub fn set_waypoints(&self, msg: &WaypointMsg) -> Result<usize, WaypointError> {
        self.set_waypoint_seq(WaypointSeq::from_msg(msg)?)
    }

    pub fn set_waypoint_seq(&self, seq: WaypointSeq) -> Result<usize, WaypointError> {
        if seq.is_empty() {
            return Err(WaypointError::Empty)
        }

        let len = seq.len();
        self.waypoints.update(|current| {
            if !current.is_empty() {
                return Err(WaypointError::AlreadyLoaded(current.len()))
            }
            *current = Arc::new(seq);
            Ok(())
        })?;
        info!("Loaded a route of {} waypoints", len);

        Ok(len)
    }

    pub fn waypoints(&self) -> Arc<WaypointSeq> {
        self.waypoints.get()
    }

    pub fn state_cache(&self) -> &StateCache {
        &self.state_cache
    }

    /// Latest collision avoidance data.
    ///
    /// Avoidance is not used by arbitration, it is only kept for inspection.
    pub fn avoidance(&self) -> Option<AvoidanceData> {
        self.avoidance.get()
    }

    pub fn stamp_us(&self) -> u64 {
        self.stamp_us.get()
    }
}

impl CoreHandles {
    /// Snapshot the inputs of one adaptation tick.
    pub fn adapt_input(&self) -> AdaptInput {
        AdaptInput {
            state: self.inputs.state_cache.read(),
            status: self.status.get(),
            waypoints: self.inputs.waypoints()
        }
    }
}

impl TickOutput {
    /// Flatten into the messages to send, in sending order.
    pub fn into_outputs(self) -> Vec<FmuOutput> {
        let mut outputs: Vec<FmuOutput> = self.vehicle_cmds
            .into_iter()
            .map(FmuOutput::Command)
            .collect();

        outputs.push(FmuOutput::ControlMode(self.control_mode));
        outputs.push(FmuOutput::Setpoint(self.setpoint));

        outputs
    }
}

impl GncCore {
    /// Initialise the core, loading the parameters of each per-tick module.
    ///
    /// `nominal` is the guidance used until adaptation publishes its own.
    pub fn init(
        params: GncExecParams, 
        nominal: GuidParams, 
        session: &Session
    ) -> Result<Self, InitError> {
        let dt_s = params.control_period_s;
        if !(dt_s > 0.0) {
            return Err(InitError::InvalidPeriod(dt_s))
        }

        let guid = Shared::new(nominal);
        let forecast = Shared::new(Forecast::default());

        let dist_est = DistEst::init(
            dist_est::InitData {
                params_path: DIST_EST_PARAMS.into(),
                vehicle: params.vehicle,
                source: Self::dist_source(&params),
                dt_s,
                forecast: forecast.clone()
            },
            session
        )?;

        let path_follow = PathFollow::init(
            path_follow::InitData {
                params_path: PATH_FOLLOW_PARAMS.into(),
                vehicle: params.vehicle,
                dt_s,
                guid: guid.clone()
            },
            session
        )?;

        let cmd_arb = CmdArb::init(CMD_ARB_PARAMS.into(), session)?;

        Ok(Self::new(params, dist_est, path_follow, cmd_arb, guid, forecast))
    }

    /// Build the core from initialised modules.
    ///
    /// `guid` and `forecast` must be the cells the modules were built with.
    pub fn new(
        params: GncExecParams,
        dist_est: DistEst,
        path_follow: PathFollow,
        cmd_arb: CmdArb,
        guid: Shared<GuidParams>,
        forecast: Shared<Forecast>
    ) -> Self {
        let hover_force = Vector3::new(
            0.0, 
            0.0, 
            -params.vehicle.mass_kg * params.vehicle.gravity_ms2
        );

        Self {
            ctrl_mode: params.ctrl_mode,
            params,
            dist_est,
            path_follow,
            cmd_arb,
            inputs: GncInputs::new(),
            status: Shared::new(ControlStatus::default()),
            guid,
            forecast,
            force_cmd_body_n: hover_force,
            num_ticks: 0
        }
    }

    /// The disturbance source selected by the parameters.
    pub fn dist_source(params: &GncExecParams) -> DistSource {
        if params.use_learning {
            DistSource::Learned
        }
        else {
            DistSource::Model
        }
    }

    pub fn handles(&self) -> CoreHandles {
        CoreHandles {
            inputs: self.inputs.clone(),
            status: self.status.clone(),
            guid: self.guid.clone(),
            forecast: self.forecast.clone()
        }
    }

    pub fn inputs(&self) -> &GncInputs {
        &self.inputs
    }

    pub fn status(&self) -> ControlStatus {
        self.status.get()
    }

    pub fn ctrl_mode(&self) -> CtrlMode {
        self.ctrl_mode
    }

    /// Change the type of command produced while following the path. Takes
    /// effect on the next tick.
    pub fn set_ctrl_mode(&mut self, ctrl_mode: CtrlMode) {
        if ctrl_mode != self.ctrl_mode {
            info!("Control mode changed from {:?} to {:?}", self.ctrl_mode, ctrl_mode);
            self.ctrl_mode = ctrl_mode;
        }
    }

    /// Run one control tick.
    pub fn control_tick(&mut self) -> TickOutput {
        let state = self.inputs.state_cache.read();
        let waypoints = self.inputs.waypoints();
        let stamp_us = self.inputs.stamp_us();

        // ---- MODE REQUESTS ----

        let mut vehicle_cmds = Vec::new();
        if self.num_ticks == self.params.offboard_warmup_ticks {
            info!("Warm-up complete, requesting offboard mode and arming");
            vehicle_cmds.push(cmd_enc::offboard(stamp_us));
            vehicle_cmds.push(cmd_enc::arm(stamp_us));
        }

        // ---- DISTURBANCE ESTIMATION ----

        let dist = match self.dist_est.proc(&dist_est::InputData {
            state,
            force_cmd_body_n: self.force_cmd_body_n
        }) {
            Ok((d, _)) => d,
            Err(e) => {
                warn!("{}", e);
                DistEstimate::default()
            }
        };

        // ---- PATH FOLLOWING ----

        let wp_index = self.cmd_arb.wp_index();
        let (pf_out, pf_report) = match self.path_follow.proc(&path_follow::InputData {
            state,
            dist,
            waypoints: waypoints.clone(),
            wp_index,
            initial_pos_reached: self.cmd_arb.mode() != ArbMode::PositionHold
        }) {
            Ok(o) => o,
            Err(e) => match e {}
        };

        if let Some(out) = pf_out {
            self.force_cmd_body_n = out.cmd.force_body_n;
            self.cmd_arb.set_pending(out.select_cmd(wp_index, waypoints.len(), self.ctrl_mode));
        }

        // ---- ARBITRATION ----

        let (cmd, arb_report) = match self.cmd_arb.proc(&cmd_arb::InputData {
            state,
            waypoints
        }) {
            Ok(o) => o,
            Err(e) => match e {}
        };

        self.status.set(ControlStatus {
            initial_pos_reached: arb_report.mode != ArbMode::PositionHold,
            ticks_since_start: self.path_follow.num_ticks(),
            mission_time_s: pf_report.mission_time_s,
            disturbance_ms2: dist.model,
            wp_index: arb_report.wp_index,
            mode: arb_report.mode,
            num_ticks: self.num_ticks
        });

        // ---- ENCODING ----

        let output = TickOutput {
            control_mode: cmd_enc::heartbeat(stamp_us),
            setpoint: cmd_enc::encode(&cmd, stamp_us),
            vehicle_cmds,
            arb: arb_report
        };

        self.num_ticks = self.num_ticks.saturating_add(1);

        output
    }

    /// Close the progress log.
    pub fn shutdown(&mut self) {
        self.cmd_arb.shutdown();
    }
}
