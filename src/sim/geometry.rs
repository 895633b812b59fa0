//! Poses and circle-collision predicates
//!
//! All field entities are circles with a pose and a radius. The general
//! collision rule compares center distance against the larger of the two
//! radii; the front/rear variants project a probe point out of an entity's
//! perimeter along (or against) its heading to disambiguate which side of
//! a robot an adjacent entity is on.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::heading_vector;

/// A position plus heading within the field's 2D coordinate frame.
///
/// Heading is in radians, mapping to a unit circle based on the positive
/// x-axis. Poses are plain values; nothing mutates one in place.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub pos: Vec2,
    pub heading: f32,
}

impl Pose {
    pub fn new(x: f32, y: f32, heading: f32) -> Self {
        Self {
            pos: Vec2::new(x, y),
            heading,
        }
    }

    /// Euclidean distance to another pose, ignoring heading
    #[inline]
    pub fn dist_to(&self, other: &Pose) -> f32 {
        self.pos.distance(other.pos)
    }
}

/// Standard 2D rotation of a vector by `angle` radians
#[inline]
pub fn rotate_vector(angle: f32, v: Vec2) -> Vec2 {
    let (sin, cos) = angle.sin_cos();
    Vec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}

/// General collision check between two circles.
///
/// Collides when the center distance is strictly under the larger of the
/// two radii. Note: the larger radius, not the sum. Two bodies of similar
/// size therefore tolerate more overlap than geometric intuition suggests;
/// this is the rule the game runs on and scoring/placement are tuned to it.
#[inline]
pub fn is_colliding(a: &Pose, a_radius: f32, b: &Pose, b_radius: f32) -> bool {
    a.dist_to(b) < a_radius.max(b_radius)
}

/// Check whether `target` sits in front of `a`.
///
/// The probe point lies on `a`'s perimeter along its heading; the target
/// is "in front" when its center falls within `collision_radius` of that
/// probe point (inclusive).
#[inline]
pub fn is_colliding_front(a: &Pose, a_radius: f32, target: &Pose, collision_radius: f32) -> bool {
    let probe = a.pos + heading_vector(a.heading) * a_radius;
    probe.distance(target.pos) <= collision_radius
}

/// Check whether `target` sits behind `a`. Mirror of [`is_colliding_front`].
#[inline]
pub fn is_colliding_rear(a: &Pose, a_radius: f32, target: &Pose, collision_radius: f32) -> bool {
    let probe = a.pos - heading_vector(a.heading) * a_radius;
    probe.distance(target.pos) <= collision_radius
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_distance() {
        let a = Pose::new(0.0, 0.0, 0.0);
        let b = Pose::new(3.0, 4.0, PI);
        assert!((a.dist_to(&b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_rotate_vector_quarter_turn() {
        let v = rotate_vector(FRAC_PI_2, Vec2::new(1.0, 0.0));
        assert!(v.x.abs() < 1e-6);
        assert!((v.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_collision_uses_larger_radius() {
        let a = Pose::new(0.0, 0.0, 0.0);
        let b = Pose::new(7.0, 0.0, 0.0);

        // Larger radius 8 covers the 7in gap; the sum rule would too, but
        // a pair of 4in bodies must NOT collide under the max rule.
        assert!(is_colliding(&a, 8.0, &b, 2.0));
        assert!(!is_colliding(&a, 4.0, &b, 4.0));
    }

    #[test]
    fn test_collision_boundary_is_strict() {
        let radius = 2.0;
        let just_inside = Pose::new(radius * 0.99, 0.0, 0.0);
        let just_outside = Pose::new(radius * 1.01, 0.0, 0.0);
        let origin = Pose::new(0.0, 0.0, 0.0);

        assert!(is_colliding(&origin, radius, &just_inside, radius));
        assert!(!is_colliding(&origin, radius, &just_outside, radius));
        // Exactly at the threshold: strictly-less-than means no collision
        let at_edge = Pose::new(radius, 0.0, 0.0);
        assert!(!is_colliding(&origin, radius, &at_edge, radius));
    }

    #[test]
    fn test_front_probe_tracks_heading() {
        // Robot at origin facing +x with radius 9: probe sits at (9, 0)
        let robot = Pose::new(0.0, 0.0, 0.0);
        let ahead = Pose::new(14.0, 0.0, 0.0);
        let behind = Pose::new(-14.0, 0.0, 0.0);

        assert!(is_colliding_front(&robot, 9.0, &ahead, 7.0));
        assert!(!is_colliding_front(&robot, 9.0, &behind, 7.0));
        assert!(is_colliding_rear(&robot, 9.0, &behind, 7.0));
        assert!(!is_colliding_rear(&robot, 9.0, &ahead, 7.0));
    }

    #[test]
    fn test_front_probe_rotated() {
        // Facing +y: front probe moves to (0, 9)
        let robot = Pose::new(0.0, 0.0, FRAC_PI_2);
        let above = Pose::new(0.0, 14.0, 0.0);
        assert!(is_colliding_front(&robot, 9.0, &above, 7.0));
        assert!(!is_colliding_rear(&robot, 9.0, &above, 7.0));
    }

    #[test]
    fn test_front_probe_radius_is_inclusive() {
        let robot = Pose::new(0.0, 0.0, 0.0);
        // Probe at (9, 0); target exactly collision_radius away
        let target = Pose::new(16.0, 0.0, 0.0);
        assert!(is_colliding_front(&robot, 9.0, &target, 7.0));
    }
}
