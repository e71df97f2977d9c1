//! # Command Sink
//!
//! Records every message sent to the FMU as one JSON line.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::fmu::FmuOutput;
use std::io::Write;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct CmdSink<W: Write> {
    writer: W,
    num_sent: u64
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CmdSinkError {
    #[error("Could not serialize the output: {0}")]
    SerializationError(serde_json::Error),

    #[error("Could not write the output: {0}")]
    WriteError(std::io::Error)
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<W: Write> CmdSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            num_sent: 0
        }
    }

    /// Write one output.
    ///
    /// Unset (NaN) fields are written as `null`.
    pub fn send(&mut self, output: &FmuOutput) -> Result<(), CmdSinkError> {
        serde_json::to_writer(&mut self.writer, output)
            .map_err(CmdSinkError::SerializationError)?;
        self.writer.write_all(b"\n")
            .map_err(CmdSinkError::WriteError)?;

        self.num_sent += 1;

        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), CmdSinkError> {
        self.writer.flush().map_err(CmdSinkError::WriteError)
    }

    pub fn num_sent(&self) -> u64 {
        self.num_sent
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::fmu::{FmuSetpoint, TrajectorySetpoint};

    #[test]
    fn test_writes_json_lines() {
        let mut sink = CmdSink::new(Vec::new());

        sink.send(&FmuOutput::Setpoint(FmuSetpoint::Trajectory(TrajectorySetpoint {
            timestamp: 1,
            position_m: [1.0, 2.0, -5.0],
            velocity_ms: [std::f64::NAN; 3],
            yaw_rad: 0.0
        }))).unwrap();

        let text = String::from_utf8(sink.writer.clone()).unwrap();
        assert_eq!(sink.num_sent(), 1);
        assert!(text.ends_with('\n'));
        assert!(text.contains(r#""velocity_ms":[null,null,null]"#));
    }
}
