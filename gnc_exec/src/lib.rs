//! # Guidance and control library.
//!
//! This library holds the multi-rate guidance and control core, so that the
//! executable and the integration tests share the same modules.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

/// Executable parameters - control periods, control mode and adapter switches
pub mod params;

/// Shared cells - lock-guarded copy-on-read values passed between periodic tasks
pub mod shared;

/// Waypoint sequence - the planned route consumed by the core
pub mod waypoints;

/// Vehicle state cache - latest estimated vehicle state, written by telemetry
pub mod state_cache;

/// Disturbance estimation - model based or learned disturbance estimate for each tick
pub mod dist_est;

/// Path following - mission clock and guidance law command generation
pub mod path_follow;

/// Guidance parameter adaptation - receding horizon optimisation of speed and look-ahead
pub mod guid_adapt;

/// Online learning - disturbance forecasting from the sampled disturbance history
pub mod learn;

/// Command arbitration - flight mode state machine and waypoint progress
pub mod cmd_arb;

/// Command encoder - converts arbitrated commands into FMU messages
pub mod cmd_enc;

/// Guidance and control core - the strictly ordered control tick pipeline
pub mod gnc_core;

/// Scheduler - periodic threads for the control, adaptation and learning tasks
pub mod sched;

/// Telemetry client - reads telemetry inputs from a JSON lines stream
pub mod tlm_client;

/// Command sink - records FMU outputs as JSON lines
pub mod cmd_sink;
