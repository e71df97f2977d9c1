//! # Scheduler
//!
//! Each periodic task runs on its own thread, in a fixed period loop which
//! sleeps for the remainder of the period and warns when the period is
//! overrun. The tasks only communicate through the shared cells of the core,
//! and outputs of the control tick leave through a channel.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crossbeam::channel::Sender;
use log::{debug, info, warn};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc
};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;
use comms_if::fmu::FmuOutput;

use crate::{
    gnc_core::GncCore,
    guid_adapt::GuidAdapt,
    learn::OnlineLearn
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The tasks to schedule and their periods.
pub struct Tasks {
    pub core: GncCore,

    /// Units: seconds
    pub control_period_s: f64,

    pub adapt: Option<(GuidAdapt, f64)>,
    pub learn: Option<(OnlineLearn, f64)>
}

/// Handle to the running tasks.
pub struct SchedHandle {
    run: Arc<AtomicBool>,
    control: JoinHandle<GncCore>,
    others: Vec<(&'static str, JoinHandle<()>)>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SchedError {
    #[error("Task period must be positive, got {0} s")]
    InvalidPeriod(f64),

    #[error("Could not spawn the {0} thread: {1}")]
    SpawnError(&'static str, std::io::Error),

    #[error("The {0} thread panicked")]
    TaskPanicked(&'static str)
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Start all tasks. Every output of the control tick is sent on `output_tx`.
pub fn spawn(tasks: Tasks, output_tx: Sender<FmuOutput>) -> Result<SchedHandle, SchedError> {
    let Tasks { core, control_period_s, adapt, learn } = tasks;

    for period_s in [Some(control_period_s), adapt.as_ref().map(|a| a.1), learn.as_ref().map(|l| l.1)]
        .iter()
        .flatten()
    {
        if !(*period_s > 0.0) {
            return Err(SchedError::InvalidPeriod(*period_s))
        }
    }

    let run = Arc::new(AtomicBool::new(true));
    let handles = core.handles();
    let mut others = Vec::new();

    if let Some((mut adapt, period_s)) = adapt {
        let run = run.clone();
        let handles = handles.clone();
        let h = thread::Builder::new()
            .name("guid_adapt".into())
            .spawn(move || {
                run_periodic("GuidAdapt", period_s, &run, || {
                    adapt.cycle(&handles.adapt_input());
                });
            })
            .map_err(|e| SchedError::SpawnError("guid_adapt", e))?;
        others.push(("guid_adapt", h));
        info!("GuidAdapt task started at {:.3} s", period_s);
    }

    if let Some((mut learn, period_s)) = learn {
        let task_run = run.clone();
        let handles = handles.clone();
        let h = match thread::Builder::new()
            .name("learn".into())
            .spawn(move || {
                run_periodic("OnlineLearn", period_s, &task_run, || {
                    learn.cycle(&handles.status.get());
                });
            })
        {
            Ok(h) => h,
            Err(e) => return Err(abort_started(&run, others, SchedError::SpawnError("learn", e)))
        };
        others.push(("learn", h));
        info!("OnlineLearn task started at {:.3} s", period_s);
    }

    let control = {
        let task_run = run.clone();
        thread::Builder::new()
            .name("control".into())
            .spawn(move || {
                let mut core = core;
                let mut output_lost = false;

                run_periodic("Control", control_period_s, &task_run, || {
                    for msg in core.control_tick().into_outputs() {
                        if output_tx.send(msg).is_err() && !output_lost {
                            warn!("Output channel closed, control outputs are being dropped");
                            output_lost = true;
                        }
                    }
                });

                core
            })
    };
    let control = match control {
        Ok(h) => h,
        Err(e) => return Err(abort_started(&run, others, SchedError::SpawnError("control", e)))
    };
    info!("Control task started at {:.3} s", control_period_s);

    Ok(SchedHandle { run, control, others })
}

/// Stop and join the tasks already started when a later one fails to
/// start, then hand back `err`.
fn abort_started(
    run: &AtomicBool, 
    others: Vec<(&'static str, JoinHandle<()>)>, 
    err: SchedError
) -> SchedError {
    warn!("{}, stopping the tasks already started", err);
    run.store(false, Ordering::Relaxed);

    for (name, h) in others {
        if h.join().is_err() {
            warn!("The {} thread panicked while stopping", name);
        }
    }

    err
}

/// Run `f` every `period_s` seconds until `run` is cleared.
pub fn run_periodic<F>(name: &str, period_s: f64, run: &AtomicBool, mut f: F)
where
    F: FnMut()
{
    let period = Duration::from_secs_f64(period_s);
    let mut num_consec_overruns: u64 = 0;

    while run.load(Ordering::Relaxed) {
        let cycle_start = Instant::now();

        f();

        let cycle_dur = Instant::now() - cycle_start;
        match period.checked_sub(cycle_dur) {
            Some(d) => {
                num_consec_overruns = 0;
                thread::sleep(d);
            },
            None => {
                num_consec_overruns += 1;
                warn!(
                    "{} cycle overran by {:.06} s ({} consecutive)", 
                    name,
                    (cycle_dur - period).as_secs_f64(),
                    num_consec_overruns
                );
            }
        }
    }

    debug!("{} task stopped", name);
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SchedHandle {
    /// Stop scheduling, wait for every task to finish its current cycle and
    /// close the core's progress log.
    pub fn stop(self) -> Result<GncCore, SchedError> {
        self.run.store(false, Ordering::Relaxed);

        for (name, h) in self.others {
            h.join().map_err(|_| SchedError::TaskPanicked(name))?;
        }

        let mut core = self.control.join()
            .map_err(|_| SchedError::TaskPanicked("control"))?;
        core.shutdown();

        info!("All tasks stopped");

        Ok(core)
    }
}
