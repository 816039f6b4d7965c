//! Interior joint angles.

use squatcount_pose_model::Point2D;

/// Angle in degrees at vertex `b` formed by the segments `b→a` and `b→c`.
///
/// Uses the four-quadrant arctangent of each segment and folds the
/// difference into `[0°, 180°]`. The result is symmetric in `a` and `c`.
///
/// Returns `None` when either segment has zero length or a coordinate is
/// not finite; callers treat such frames like a detection miss.
pub fn joint_angle(a: Point2D, b: Point2D, c: Point2D) -> Option<f64> {
    if ![a.x, a.y, b.x, b.y, c.x, c.y].iter().all(|v| v.is_finite()) {
        return None;
    }
    if a.distance(&b) <= f64::EPSILON || c.distance(&b) <= f64::EPSILON {
        return None;
    }

    let radians = (c.y - b.y).atan2(c.x - b.x) - (a.y - b.y).atan2(a.x - b.x);
    let mut angle = radians.to_degrees().abs();
    if angle > 180.0 {
        angle = 360.0 - angle;
    }
    Some(angle)
}
