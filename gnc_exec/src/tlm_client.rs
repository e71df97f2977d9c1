//! # Telemetry Client
//!
//! Reads telemetry inputs from a stream of JSON lines, one `TlmInput` per
//! line. Blank lines are skipped.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::tlm::TlmInput;
use std::io::BufRead;
use std::thread;
use std::time::{Duration, Instant};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Telemetry client
pub struct TlmClient<R: BufRead> {
    reader: R,

    /// Line number of the last line read
    line_num: usize,

    /// If set, estimator samples are released at the rate they were recorded
    pacing: Option<Pacing>
}

/// Replay pacing, anchors the first estimator timestamp to a wall clock time.
struct Pacing {
    anchor: Option<(u64, Instant)>
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TlmClientError {
    #[error("Could not read from the telemetry stream: {0}")]
    ReadError(std::io::Error),

    #[error("Could not parse telemetry on line {0}: {1}")]
    ParseError(usize, serde_json::Error)
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<R: BufRead> TlmClient<R> {

    /// Create a new client reading from a live stream.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_num: 0,
            pacing: None
        }
    }

    /// Create a new client replaying a recording.
    ///
    /// `recv` blocks so that estimator samples are returned at the same
    /// relative times as their timestamps.
    pub fn replay(reader: R) -> Self {
        Self {
            reader,
            line_num: 0,
            pacing: Some(Pacing { anchor: None })
        }
    }

    /// Receive the next telemetry input.
    ///
    /// Returns `Ok(None)` at the end of the stream. A line which can't be
    /// parsed is reported as an error, and the next call continues from the
    /// following line.
    pub fn recv(&mut self) -> Result<Option<TlmInput>, TlmClientError> {
        let mut line = String::new();

        loop {
            line.clear();
            let num_bytes = self.reader.read_line(&mut line)
                .map_err(TlmClientError::ReadError)?;
            self.line_num += 1;

            if num_bytes == 0 {
                return Ok(None)
            }
            if !line.trim().is_empty() {
                break
            }
        }

        let tlm = TlmInput::from_json(line.trim())
            .map_err(|e| TlmClientError::ParseError(self.line_num, e))?;

        if let (Some(p), TlmInput::EstimatorStates(e)) = (self.pacing.as_mut(), &tlm) {
            p.wait_until(e.timestamp);
        }

        Ok(Some(tlm))
    }
}

impl Pacing {
    fn wait_until(&mut self, stamp_us: u64) {
        let (first_us, start) = *self.anchor.get_or_insert((stamp_us, Instant::now()));
        let target = start + Duration::from_micros(stamp_us.saturating_sub(first_us));
        let now = Instant::now();

        if target > now {
            thread::sleep(target - now);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_recv_lines() {
        let stream = concat!(
            r#"{"Timesync":{"timestamp":10}}"#, "\n",
            "\n",
            "not json\n",
            r#"{"AngularVelocity":{"timestamp":11,"xyz_rads":[0.0,0.1,0.2]}}"#, "\n"
        );
        let mut client = TlmClient::new(Cursor::new(stream));

        assert!(matches!(client.recv(), Ok(Some(TlmInput::Timesync(_)))));
        assert!(matches!(client.recv(), Err(TlmClientError::ParseError(3, _))));
        assert!(matches!(client.recv(), Ok(Some(TlmInput::AngularVelocity(_)))));
        assert!(matches!(client.recv(), Ok(None)));
    }

    #[test]
    fn test_replay_pacing() {
        let stream = concat!(
            r#"{"EstimatorStates":{"timestamp":0,"attitude_q":[1,0,0,0],"velocity_ms":[0,0,0],"position_m":[0,0,0]}}"#, "\n",
            r#"{"EstimatorStates":{"timestamp":50000,"attitude_q":[1,0,0,0],"velocity_ms":[0,0,0],"position_m":[0,0,0]}}"#, "\n"
        );
        let mut client = TlmClient::replay(Cursor::new(stream));

        let start = Instant::now();
        client.recv().unwrap();
        client.recv().unwrap();

        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}
