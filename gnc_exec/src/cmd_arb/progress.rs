//! # Progress log
//!
//! Append-only record of accepted waypoints. Each line is
//!
//! ```text
//! <index> <waypoint x> <waypoint y> <vehicle x> <vehicle y>
//! ```
//!
//! The log is closed once the route is finished, after which records are
//! ignored.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::warn;
use serde::Serialize;
use std::io::Write;
use thiserror::Error;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One accepted waypoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressRecord {
    pub index: usize,
    pub wp_x_m: f64,
    pub wp_y_m: f64,
    pub pos_x_m: f64,
    pub pos_y_m: f64
}

pub struct ProgressLog {
    writer: Option<csv::Writer<Box<dyn Write + Send>>>,
    num_records: usize,
    closed: bool
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ProgressLogError {
    #[error("Could not write the progress record: {0}")]
    WriteError(csv::Error),

    #[error("Could not flush the progress log: {0}")]
    FlushError(std::io::Error)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ProgressLog {
    /// Create a log writing into `writer`.
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Some(
                csv::WriterBuilder::new()
                    .delimiter(b' ')
                    .has_headers(false)
                    .terminator(csv::Terminator::Any(b'\n'))
                    .from_writer(writer)
            ),
            num_records: 0,
            closed: false
        }
    }

    /// A log which counts records but writes nothing.
    pub fn disabled() -> Self {
        Self {
            writer: None,
            num_records: 0,
            closed: false
        }
    }

    /// Append a record. Records after the log is closed are dropped.
    pub fn record(&mut self, rec: &ProgressRecord) -> Result<(), ProgressLogError> {
        if self.closed {
            return Ok(())
        }

        if let Some(w) = self.writer.as_mut() {
            w.serialize(rec).map_err(ProgressLogError::WriteError)?;
            w.flush().map_err(ProgressLogError::FlushError)?;
        }
        self.num_records += 1;

        Ok(())
    }

    /// Flush and close the log permanently.
    pub fn close(&mut self) {
        if self.closed {
            return
        }

        if let Some(mut w) = self.writer.take() {
            if let Err(e) = w.flush() {
                warn!("Could not flush the progress log on close: {}", e);
            }
        }
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn num_records(&self) -> usize {
        self.num_records
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    #[test]
    fn test_records_and_close() {
        let path = std::env::temp_dir()
            .join(format!("gnc_progress_log_test_{}.txt", std::process::id()));
        let file = fs::File::create(&path).unwrap();

        let mut log = ProgressLog::new(Box::new(file));
        log.record(&ProgressRecord {
            index: 0,
            wp_x_m: 10.0,
            wp_y_m: 0.0,
            pos_x_m: 7.5,
            pos_y_m: 0.25
        }).unwrap();
        log.close();

        // Dropped once closed
        log.record(&ProgressRecord {
            index: 1,
            wp_x_m: 0.0,
            wp_y_m: 0.0,
            pos_x_m: 0.0,
            pos_y_m: 0.0
        }).unwrap();

        assert!(log.is_closed());
        assert_eq!(log.num_records(), 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), "0 10.0 0.0 7.5 0.25\n");

        fs::remove_file(&path).ok();
    }
}
