//! # Waypoint sequence
//!
//! The route is an ordered, immutable sequence of points in the local NED
//! frame. A new route replaces the old one wholesale, it is never edited in
//! place, so consumers can hold on to an `Arc<WaypointSeq>` for as long as
//! they need.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector3;
use comms_if::plan::{WaypointMsg, PlanError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaypointSeq {
    points: Vec<Vector3<f64>>
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl WaypointSeq {
    pub fn new(points: Vec<Vector3<f64>>) -> Self {
        Self { points }
    }

    /// Build a sequence from a plan message, rejecting non-finite points.
    pub fn from_msg(msg: &WaypointMsg) -> Result<Self, PlanError> {
        Ok(Self::new(
            msg.to_points()?
                .into_iter()
                .map(Vector3::from)
                .collect()
        ))
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Vector3<f64>> {
        self.points.get(index)
    }

    /// The segment leading to the waypoint at `index`.
    ///
    /// The first waypoint has no predecessor, so its segment starts at
    /// `origin`, which is normally the vehicle position.
    pub fn segment(
        &self, 
        index: usize, 
        origin: &Vector3<f64>
    ) -> Option<(Vector3<f64>, Vector3<f64>)> {
        let end = *self.points.get(index)?;
        let start = match index {
            0 => *origin,
            i => self.points[i - 1]
        };

        Some((start, end))
    }
}

/// Calculate the look-ahead point on the segment from `start` to `end`.
///
/// The point lies `look_ahead_m` along the segment ahead of the closest point
/// to `pos`, and never beyond `end`.
pub fn look_ahead_point(
    pos: &Vector3<f64>,
    start: &Vector3<f64>,
    end: &Vector3<f64>,
    look_ahead_m: f64
) -> Vector3<f64> {
    let seg = end - start;
    let seg_len = seg.norm();

    if seg_len <= std::f64::EPSILON {
        return *end
    }

    let (_, t) = util::maths::dist_to_segment(pos, start, end);
    let along_m = t * seg_len + look_ahead_m;

    if along_m >= seg_len {
        *end
    }
    else {
        start + seg * (along_m / seg_len)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_segment_origin() {
        let seq = WaypointSeq::new(vec![
            Vector3::new(10.0, 0.0, -5.0),
            Vector3::new(10.0, 10.0, -5.0)
        ]);
        let origin = Vector3::new(0.0, 0.0, -5.0);

        assert_eq!(seq.segment(0, &origin), Some((origin, Vector3::new(10.0, 0.0, -5.0))));
        assert_eq!(
            seq.segment(1, &origin), 
            Some((Vector3::new(10.0, 0.0, -5.0), Vector3::new(10.0, 10.0, -5.0)))
        );
        assert_eq!(seq.segment(2, &origin), None);
    }

    #[test]
    fn test_look_ahead_point() {
        let start = Vector3::new(0.0, 0.0, -5.0);
        let end = Vector3::new(10.0, 0.0, -5.0);

        // Offset from the segment, look-ahead is measured along the segment
        let p = look_ahead_point(&Vector3::new(2.0, 1.0, -5.0), &start, &end, 3.0);
        assert!((p - Vector3::new(5.0, 0.0, -5.0)).norm() < 1e-9);

        // Clamped at the segment end
        let p = look_ahead_point(&Vector3::new(9.0, 0.0, -5.0), &start, &end, 3.0);
        assert_eq!(p, end);
    }
}
