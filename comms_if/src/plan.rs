//! # Planner messages
//!
//! The path planner delivers a waypoint sequence once planning completes. The
//! sequence may be planar, in which case every point is flown at a fixed
//! altitude, or spatial.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A waypoint sequence as delivered by the planner.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum WaypointMsg {
    /// Points in the horizontal plane, all flown at `altitude_m` (NED z).
    Planar {
        points: Vec<[f64; 2]>,
        altitude_m: f64,
    },

    /// Points in the NED frame.
    Spatial {
        points: Vec<[f64; 3]>,
    },
}

/// Errors in a delivered waypoint message.
#[derive(Debug, Error, PartialEq)]
pub enum PlanError {
    #[error("Waypoint {0} contains a non-finite coordinate")]
    NonFinitePoint(usize),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl WaypointMsg {
    /// Get the points of the message in the NED frame.
    pub fn to_points(&self) -> Result<Vec<[f64; 3]>, PlanError> {
        let points: Vec<[f64; 3]> = match self {
            WaypointMsg::Planar { points, altitude_m } => points
                .iter()
                .map(|p| [p[0], p[1], *altitude_m])
                .collect(),
            WaypointMsg::Spatial { points } => points.clone(),
        };

        match points.iter().position(|p| p.iter().any(|c| !c.is_finite())) {
            Some(i) => Err(PlanError::NonFinitePoint(i)),
            None => Ok(points),
        }
    }

    /// Number of points in the message.
    pub fn len(&self) -> usize {
        match self {
            WaypointMsg::Planar { points, .. } => points.len(),
            WaypointMsg::Spatial { points } => points.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_planar_points() {
        let msg = WaypointMsg::Planar {
            points: vec![[1.0, 2.0], [3.0, 4.0]],
            altitude_m: -5.0,
        };

        assert_eq!(msg.len(), 2);
        assert_eq!(
            msg.to_points().unwrap(),
            vec![[1.0, 2.0, -5.0], [3.0, 4.0, -5.0]]
        );
    }

    #[test]
    fn test_non_finite_rejected() {
        let msg = WaypointMsg::Spatial {
            points: vec![[0.0, 0.0, -5.0], [f64::NAN, 0.0, -5.0]],
        };

        assert_eq!(msg.to_points(), Err(PlanError::NonFinitePoint(1)));
    }
}
