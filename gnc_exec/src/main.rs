//! Main guidance and control executable entry point.
//! 
//! # Architecture
//! 
//! The general execution methodology consists of:
//! 
//!     - Initialise the session, logging and parameters
//!     - Initialise the core and the adaptation and learning tasks
//!     - Start the periodic tasks:
//!         - Control tick, at the control period
//!         - Guidance parameter adaptation, at the adaptation period
//!         - Online learning, at the learning period
//!     - Load the route
//!     - Feed telemetry into the core until the stream ends
//!     - Stop the tasks and flush the logs
//! 
//! # Usage
//! 
//!     gnc_exec <route file> [telemetry file]
//! 
//! The route file is a TOML or JSON (`.json`) `WaypointMsg`. Telemetry is JSON
//! lines of `TlmInput`, replayed from the file if given or read live from
//! stdin otherwise. Every FMU output is recorded in the session directory.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{Report, eyre::{WrapErr, eyre}};
use log::{debug, info, warn};
use std::env;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter};
use std::thread;

// Internal
use comms_if::plan::WaypointMsg;
use gnc_lib::{
    cmd_sink::CmdSink,
    gnc_core::{GncCore, GncInputs},
    guid_adapt::{self, GuidAdapt, Mppi},
    learn::OnlineLearn,
    params::GncExecParams,
    sched::{self, Tasks},
    tlm_client::{TlmClient, TlmClientError}
};
use util::{
    host,
    logger::{logger_init, LevelFilter},
    session::Session
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

const EXEC_PARAMS: &str = "gnc_exec.toml";
const GUID_ADAPT_PARAMS: &str = "guid_adapt.toml";
const LEARN_PARAMS: &str = "learn.toml";

/// Record of every FMU output, relative to the session directory.
const CMD_RECORD_FILE: &str = "fmu_out.jsonl";

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new(
        "gnc_exec", 
        "sessions"
    ).wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, LevelFilter::Info, &session)
        .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Guidance and Control Executable\n");
    info!(
        "Running on: {:#?}", 
        host::get_uname().wrap_err("Failed to get host information")?
    );
    info!("Session directory: {:?}\n", session.session_root);

    // ---- ARGUMENTS ----

    let args: Vec<String> = env::args().collect();

    debug!("CLI arguments: {:?}", args);

    if args.len() < 2 || args.len() > 3 {
        return Err(eyre!(
            "Expected a route file and optionally a telemetry file, found {} arguments", 
            args.len() - 1
        ));
    }

    // ---- LOAD PARAMETERS ----

    let exec_params: GncExecParams = util::params::load(EXEC_PARAMS)
        .wrap_err("Could not load exec params")?;
    let adapt_params: guid_adapt::Params = util::params::load(GUID_ADAPT_PARAMS)
        .wrap_err("Could not load guidance adaptation params")?;

    info!("Exec parameters loaded");

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let core = GncCore::init(exec_params.clone(), adapt_params.nominal(), &session)
        .wrap_err("Failed to initialise the core")?;
    let handles = core.handles();
    info!("Core init complete, control mode {:?}", core.ctrl_mode());

    let adapt = if exec_params.use_adaptation {
        let a = GuidAdapt::new(
            adapt_params.clone(),
            GncCore::dist_source(&exec_params),
            Box::new(Mppi::new(adapt_params.mppi.clone())),
            handles.guid.clone(),
            handles.forecast.clone()
        ).wrap_err("Failed to initialise GuidAdapt")?;
        info!("GuidAdapt init complete");
        Some((a, exec_params.adapt_period_s))
    }
    else {
        info!("Adaptation disabled, nominal guidance parameters will be used");
        None
    };

    let learn = if exec_params.use_learning {
        let l = OnlineLearn::init(
            LEARN_PARAMS,
            adapt_params.horizon_len,
            adapt_params.horizon_dt_s,
            handles.forecast.clone()
        ).wrap_err("Failed to initialise OnlineLearn")?;
        info!("OnlineLearn init complete");
        Some((l, exec_params.learn_period_s))
    }
    else {
        info!("Learning disabled, the model-based disturbance will be used");
        None
    };

    info!("Module initialisation complete\n");

    // ---- OUTPUT RECORDING ----

    let (output_tx, output_rx) = crossbeam::channel::unbounded();
    let mut sink = CmdSink::new(BufWriter::new(
        session.open_append(CMD_RECORD_FILE)
            .wrap_err("Failed to open the output record")?
    ));

    let sink_thread = thread::Builder::new()
        .name("cmd_sink".into())
        .spawn(move || {
            for msg in output_rx.iter() {
                if let Err(e) = sink.send(&msg) {
                    warn!("{}", e);
                }
            }
            if let Err(e) = sink.flush() {
                warn!("{}", e);
            }
            sink.num_sent()
        })
        .wrap_err("Failed to start the output thread")?;

    // ---- START TASKS ----

    info!("Starting periodic tasks\n");

    let sched = sched::spawn(
        Tasks {
            core,
            control_period_s: exec_params.control_period_s,
            adapt,
            learn
        },
        output_tx
    ).wrap_err("Failed to start the periodic tasks")?;

    // ---- ROUTE ----

    let route = load_route(&args[1])
        .wrap_err_with(|| format!("Failed to load the route from {}", args[1]))?;
    handles.inputs.set_waypoints(&route)
        .wrap_err("Failed to set the route")?;

    // ---- TELEMETRY ----

    let num_tlm = match args.get(2) {
        Some(path) => {
            info!("Replaying telemetry from \"{}\"", path);
            let file = File::open(path)
                .wrap_err_with(|| format!("Could not open {}", path))?;
            feed_tlm(TlmClient::replay(BufReader::new(file)), &handles.inputs)?
        },
        None => {
            info!("Reading telemetry from stdin");
            let stdin = std::io::stdin();
            feed_tlm(TlmClient::new(stdin.lock()), &handles.inputs)?
        }
    };

    info!("Telemetry stream ended after {} inputs", num_tlm);

    // ---- SHUTDOWN ----

    let core = sched.stop().wrap_err("Failed to stop the periodic tasks")?;
    let num_sent = sink_thread.join()
        .map_err(|_| eyre!("The output thread panicked"))?;

    info!("Final status: {:#?}", core.status());
    info!("{} outputs recorded", num_sent);
    info!("End of execution");

    Ok(())
}

/// Pass every telemetry input from the client into the core.
fn feed_tlm<R: BufRead>(
    mut client: TlmClient<R>, 
    inputs: &GncInputs
) -> Result<u64, Report> {
    let mut num_tlm = 0;

    loop {
        match client.recv() {
            Ok(Some(tlm)) => {
                inputs.handle_tlm(&tlm);
                num_tlm += 1;
            },
            Ok(None) => break,
            Err(e @ TlmClientError::ParseError(..)) => warn!("{}", e),
            Err(e) => return Err(e).wrap_err("Telemetry stream failed")
        }
    }

    Ok(num_tlm)
}

/// Load the route from a TOML or JSON file.
fn load_route(path: &str) -> Result<WaypointMsg, Report> {
    if path.ends_with(".json") {
        let s = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&s)?)
    }
    else {
        Ok(util::params::load_from_path(path)?)
    }
}
