//! # Communications interface crate.
//!
//! Provides the message definitions exchanged between the guidance and control
//! core and its external collaborators. The transport itself is not defined
//! here, all messages are plain serde structures.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Telemetry received from the flight management unit and sensing collaborators
pub mod tlm;

/// Setpoints and commands sent to the flight management unit
pub mod fmu;

/// Waypoint sequences delivered by the path planner
pub mod plan;
