//! End to end scenarios of the control tick pipeline.

use comms_if::{
    fmu::{FmuOutput, FmuSetpoint},
    tlm::{EstimatorStates, TlmInput}
};
use gnc_lib::{
    cmd_arb::{self, ArbMode, CmdArb, ProgressLog},
    dist_est::{self, DistEst, DistSource},
    gnc_core::GncCore,
    guid_adapt::{self, GuidAdapt, GuidParams, Mppi, MppiParams},
    learn::{self, Forecast, GprParams, Gpr, OnlineLearn},
    params::{CtrlMode, GncExecParams, VehicleParams},
    path_follow::{self, PathFollow, Pursuit, PursuitParams},
    sched::{self, Tasks},
    shared::Shared,
    waypoints::WaypointSeq
};
use nalgebra::Vector3;
use std::{thread, time::Duration};

const DT_S: f64 = 0.004;

fn pursuit_params() -> PursuitParams {
    PursuitParams {
        vel_gain: 1.5,
        max_tilt_rad: 0.6,
        min_lift_accel_ms2: 2.0
    }
}

fn build_core(ctrl_mode: CtrlMode, warmup_ticks: u64) -> GncCore {
    let vehicle = VehicleParams::default();
    let params = GncExecParams {
        control_period_s: DT_S,
        adapt_period_s: 0.1,
        learn_period_s: 0.1,
        offboard_warmup_ticks: warmup_ticks,
        ctrl_mode,
        use_adaptation: false,
        use_learning: false,
        vehicle
    };

    let guid = Shared::new(GuidParams::new(3.0, 3.0));
    let forecast = Shared::new(Forecast::default());

    let dist_est = DistEst::new(
        dist_est::Params {
            ndo_gains: [6.0, 6.0, 3.0],
            max_disturbance_ms2: 30.0
        },
        vehicle,
        DistSource::Model,
        DT_S,
        forecast.clone()
    ).unwrap();

    let path_follow = PathFollow::new(
        path_follow::Params {
            tick_divider: 1,
            pursuit: pursuit_params()
        },
        DT_S,
        Box::new(Pursuit::new(pursuit_params(), vehicle)),
        guid.clone()
    ).unwrap();

    let cmd_arb = CmdArb::new(
        cmd_arb::Params {
            initial_pos_m: [0.0, 0.0, -5.0],
            initial_pos_tol_m: 0.3,
            acceptance_radius_m: 3.0,
            progress_log_path: None
        },
        ProgressLog::disabled()
    ).unwrap();

    GncCore::new(params, dist_est, path_follow, cmd_arb, guid, forecast)
}

fn estimator(stamp_us: u64, pos: [f64; 3], vel: [f64; 3]) -> TlmInput {
    TlmInput::EstimatorStates(EstimatorStates {
        timestamp: stamp_us,
        attitude_q: [1.0, 0.0, 0.0, 0.0],
        velocity_ms: vel,
        position_m: pos,
        wind_ne_ms: [0.0, 0.0]
    })
}

fn load_route(core: &GncCore, points: Vec<Vector3<f64>>) {
    core.inputs().set_waypoint_seq(WaypointSeq::new(points)).unwrap();
}

#[test]
fn single_waypoint_accepted_once() {
    let mut core = build_core(CtrlMode::Position, 100);
    load_route(&core, vec![Vector3::new(10.0, 0.0, -5.0)]);

    let speed_ms = 2.0;
    let mut accepted_at = None;

    for k in 0..5000u64 {
        let x = speed_ms * k as f64 * DT_S;
        core.inputs().handle_tlm(&estimator(k * 4000, [x, 0.0, -5.0], [speed_ms, 0.0, 0.0]));

        let out = core.control_tick();
        let dist_m = (10.0 - x).abs();

        match accepted_at {
            None if dist_m < 3.0 => {
                assert_eq!(out.arb.wp_index, 1, "not accepted at x = {}", x);
                assert!(out.arb.wp_accepted);
                accepted_at = Some(k);
            },
            None => {
                assert_eq!(out.arb.wp_index, 0, "accepted early at x = {}", x);
                assert_ne!(out.arb.mode, ArbMode::Complete);
            },
            Some(_) => {
                // No further advancement once the route is exhausted
                assert_eq!(out.arb.wp_index, 1);
                assert!(!out.arb.wp_accepted);
                assert_eq!(out.arb.mode, ArbMode::Complete);
            }
        }

        // Always exactly one setpoint, a position one in position mode
        assert!(out.setpoint.is_trajectory());
    }

    assert!(accepted_at.is_some());
    assert_eq!(core.status().mode, ArbMode::Complete);
}

#[test]
fn position_hold_before_initial_position() {
    let mut core = build_core(CtrlMode::Attitude, 100);
    load_route(&core, vec![Vector3::new(10.0, 0.0, -5.0)]);

    // Climbing, directly under the waypoint
    for k in 0..200u64 {
        let z = -4.0 * k as f64 / 200.0;
        core.inputs().handle_tlm(&estimator(k * 4000, [10.0, 0.0, z], [0.0, 0.0, -1.0]));

        let out = core.control_tick();

        assert_eq!(out.arb.mode, ArbMode::PositionHold);
        assert_eq!(out.arb.wp_index, 0);
        match out.setpoint {
            FmuSetpoint::Trajectory(t) => {
                assert_eq!(t.position_m, [0.0, 0.0, -5.0]);
                assert_eq!(t.yaw_rad, 0.0);
            },
            _ => panic!("Expected a position setpoint while holding")
        }

        let status = core.status();
        assert!(!status.initial_pos_reached);
        assert_eq!(status.mission_time_s, 0.0);
    }
}

#[test]
fn mission_time_starts_at_zero() {
    let mut core = build_core(CtrlMode::Attitude, 100);
    load_route(&core, vec![Vector3::new(50.0, 0.0, -5.0)]);

    let mut times = Vec::new();
    for k in 0..50u64 {
        core.inputs().handle_tlm(&estimator(k * 4000, [0.0, 0.0, -5.0], [0.0, 0.0, 0.0]));
        core.control_tick();

        let status = core.status();
        if status.ticks_since_start > 0 {
            times.push(status.mission_time_s);
        }
    }

    assert_eq!(times[0], 0.0);
    assert!(times.windows(2).all(|w| w[1] >= w[0]));
    assert!((times[times.len() - 1] - (times.len() - 1) as f64 * DT_S).abs() < 1e-9);
}

#[test]
fn control_mode_switch_is_clean() {
    let mut core = build_core(CtrlMode::Attitude, 100);
    load_route(&core, vec![Vector3::new(50.0, 0.0, -5.0)]);

    let tick = |core: &mut GncCore, k: u64| {
        core.inputs().handle_tlm(&estimator(k * 4000, [0.0, 0.0, -5.0], [0.0, 0.0, 0.0]));
        core.control_tick()
    };

    // The first tick reaches the initial position, path following starts on
    // the next one
    tick(&mut core, 0);

    for k in 1..20 {
        let out = tick(&mut core, k);
        assert!(out.setpoint.is_attitude());

        if let FmuSetpoint::Attitude(a) = out.setpoint {
            assert!(a.thrust_body[2] < 0.0);
            assert_eq!(a.thrust_body[0], 0.0);
            assert_eq!(a.thrust_body[1], 0.0);
        }
    }

    core.set_ctrl_mode(CtrlMode::Position);

    for k in 20..40 {
        let outputs = tick(&mut core, k).into_outputs();
        let setpoints: Vec<&FmuSetpoint> = outputs.iter()
            .filter_map(|o| match o {
                FmuOutput::Setpoint(s) => Some(s),
                _ => None
            })
            .collect();

        assert_eq!(setpoints.len(), 1);
        assert!(setpoints[0].is_trajectory());
    }
}

#[test]
fn mode_requests_sent_once_after_warmup() {
    let mut core = build_core(CtrlMode::Position, 10);

    for k in 0..30u64 {
        let out = core.control_tick();

        if k == 10 {
            let codes: Vec<u32> = out.vehicle_cmds.iter().map(|c| c.command).collect();
            assert_eq!(codes, vec![176, 400]);
        }
        else {
            assert!(out.vehicle_cmds.is_empty());
        }

        // The heartbeat goes out every tick, even without telemetry or route
        assert!(out.control_mode.position);
        assert!(out.setpoint.is_trajectory());
    }
}

#[test]
fn scheduled_tasks_run_and_stop() {
    let core = build_core(CtrlMode::Attitude, 10);
    let handles = core.handles();

    let adapt_params = guid_adapt::Params {
        horizon_len: 10,
        horizon_dt_s: 0.02,
        update_cycle: 2,
        warmup_ticks: 5,
        lpf_tau_s: 0.04,
        lpf_num_shifts: 1,
        min_speed_ms: 1.0,
        min_look_ahead_m: 1.5,
        nominal_speed_ms: 3.0,
        nominal_look_ahead_m: 3.0,
        mppi: MppiParams {
            num_samples: 16,
            lambda: 5.0,
            speed_noise_ms: 1.0,
            look_ahead_noise_m: 1.0,
            path_weight: 1.0,
            speed_weight: 0.2,
            ref_speed_ms: 4.0,
            vel_tau_s: 0.6,
            acceptance_radius_m: 3.0,
            seed: 1
        }
    };
    let adapt = GuidAdapt::new(
        adapt_params.clone(),
        DistSource::Model,
        Box::new(Mppi::new(adapt_params.mppi.clone())),
        handles.guid.clone(),
        handles.forecast.clone()
    ).unwrap();

    let learn_params = learn::Params {
        estimate_cycle: 1,
        update_cycle: 2,
        window_len: 50,
        min_fit_samples: 3,
        gpr: GprParams {
            length_scale_s: 1.0,
            signal_var: 1.0,
            noise_var: 0.01
        }
    };
    let learn = OnlineLearn::new(
        learn_params.clone(),
        adapt_params.horizon_len,
        adapt_params.horizon_dt_s,
        Box::new(Gpr::new(learn_params.gpr)),
        handles.forecast.clone()
    ).unwrap();

    let (tx, rx) = crossbeam::channel::unbounded();
    let sched = sched::spawn(
        Tasks {
            core,
            control_period_s: DT_S,
            adapt: Some((adapt, 0.02)),
            learn: Some((learn, 0.02))
        },
        tx
    ).unwrap();

    handles.inputs.set_waypoint_seq(WaypointSeq::new(vec![Vector3::new(50.0, 0.0, -5.0)])).unwrap();
    for k in 0..100u64 {
        handles.inputs.handle_tlm(&estimator(k * 4000, [0.0, 0.0, -5.0], [0.0, 0.0, 0.0]));
        thread::sleep(Duration::from_millis(4));
    }

    let core = sched.stop().unwrap();
    let outputs: Vec<FmuOutput> = rx.try_iter().collect();

    assert!(core.status().initial_pos_reached);
    assert!(outputs.iter().any(|o| matches!(o, FmuOutput::Setpoint(_))));
    assert_eq!(
        outputs.iter().filter(|o| matches!(o, FmuOutput::Command(_))).count(),
        2
    );

    let guid = handles.guid.get();
    assert!(guid.des_speed_ms() >= 1.0);
    assert!(guid.look_ahead_m() >= 1.5);
    assert_eq!(guid.reach_m(), guid.look_ahead_m());
}
