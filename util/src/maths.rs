//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector3;

/// Distance between two points projected onto the horizontal (XY) plane,
/// ignoring altitude.
pub fn planar_dist(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    (a.xy() - b.xy()).norm()
}

/// Bearing in the horizontal plane from `from` to `to`, measured from the
/// positive X axis.
pub fn planar_bearing(from: &Vector3<f64>, to: &Vector3<f64>) -> f64 {
    (to[1] - from[1]).atan2(to[0] - from[0])
}

/// Shortest distance from `point` to the segment between `start` and `end`,
/// together with the parameter in [0, 1] of the closest point on the segment.
pub fn dist_to_segment(
    point: &Vector3<f64>,
    start: &Vector3<f64>,
    end: &Vector3<f64>
) -> (f64, f64) {
    let seg = end - start;
    let len_sq = seg.norm_squared();

    // Degenerate segment, both ends coincide
    if len_sq <= std::f64::EPSILON {
        return ((point - start).norm(), 0.0)
    }

    let t = ((point - start).dot(&seg) / len_sq).max(0.0).min(1.0);
    ((start + seg * t - point).norm(), t)
}

/// Convert a quaternion (scalar first) into roll, pitch and yaw angles in
/// radians.
///
/// The pitch asin argument is clamped to [-1, 1], so quaternions at or
/// slightly beyond gimbal lock give +/- pi/2 rather than NaN.
pub fn quat_to_euler(q: [f64; 4]) -> [f64; 3] {
    let [w, x, y, z] = q;

    let t0 = 2.0 * (w * x + y * z);
    let t1 = 1.0 - 2.0 * (x * x + y * y);
    let roll = t0.atan2(t1);

    let t2 = (2.0 * (w * y - z * x)).max(-1.0).min(1.0);
    let pitch = t2.asin();

    let t3 = 2.0 * (w * z + x * y);
    let t4 = 1.0 - 2.0 * (y * y + z * z);
    let yaw = t3.atan2(t4);

    [roll, pitch, yaw]
}

/// Convert roll, pitch and yaw angles in radians into a quaternion (scalar
/// first) using the ZYX rotation sequence.
pub fn euler_to_quat(roll: f64, pitch: f64, yaw: f64) -> [f64; 4] {
    let (sr, cr) = (roll * 0.5).sin_cos();
    let (sp, cp) = (pitch * 0.5).sin_cos();
    let (sy, cy) = (yaw * 0.5).sin_cos();

    [
        cr * cp * cy + sr * sp * sy,
        sr * cp * cy - cr * sp * sy,
        cr * sp * cy + sr * cp * sy,
        cr * cp * sy - sr * sp * cy,
    ]
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_euler_quat_round_trip() {
        let angles = [-1.5, -0.9, -0.3, 0.0, 0.4, 1.1, 1.5];

        for &roll in angles.iter() {
            for &pitch in angles.iter() {
                for &yaw in [-3.0, -1.2, 0.0, 0.7, 3.0].iter() {
                    let q = euler_to_quat(roll, pitch, yaw);
                    let [r, p, y] = quat_to_euler(q);

                    assert!((r - roll).abs() < 1e-3, "roll {} -> {}", roll, r);
                    assert!((p - pitch).abs() < 1e-3, "pitch {} -> {}", pitch, p);
                    assert!((y - yaw).sin().abs() < 1e-3 && (y - yaw).cos() > 0.0, "yaw {} -> {}", yaw, y);
                }
            }
        }
    }

    #[test]
    fn test_quat_to_euler_gimbal_clamp() {
        // Slightly non-unit quaternion right at gimbal lock, the asin argument
        // would be above 1 without clamping.
        let s = 0.5f64.sqrt() * 1.001;
        let [_, pitch, _] = quat_to_euler([s, 0.0, s, 0.0]);

        assert!(!pitch.is_nan());
        assert!((pitch - FRAC_PI_2).abs() < 1e-9);
    }

    #[test]
    fn test_identity_quat() {
        assert_eq!(euler_to_quat(0.0, 0.0, 0.0), [1.0, 0.0, 0.0, 0.0]);
        assert_eq!(quat_to_euler([1.0, 0.0, 0.0, 0.0]), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_planar_helpers() {
        let a = Vector3::new(0.0, 0.0, -5.0);
        let b = Vector3::new(3.0, 4.0, -20.0);

        assert_eq!(planar_dist(&a, &b), 5.0);
        assert!((planar_bearing(&a, &Vector3::new(0.0, 1.0, 0.0)) - FRAC_PI_2).abs() < 1e-12);

        let (d, t) = dist_to_segment(
            &Vector3::new(5.0, 2.0, 0.0),
            &Vector3::new(0.0, 0.0, 0.0),
            &Vector3::new(10.0, 0.0, 0.0)
        );
        assert!((d - 2.0).abs() < 1e-12);
        assert!((t - 0.5).abs() < 1e-12);
    }
}
