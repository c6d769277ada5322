//! Magnetic tracking: piecewise attraction toward a moving target.
//!
//! The target orbits a circle in the XY plane; the device is pulled toward
//! it with a magnitude that ramps logarithmically near the target,
//! continues linearly at mid range, and saturates beyond that. The two
//! breakpoints are chosen so the magnitude curve has no jumps.

use serde::{Deserialize, Serialize};

use tactus_core::Vec3;

use crate::ForceField;

/// Magnet-like pull toward a point orbiting a circle.
///
/// The only stateful model: the target advances by `angular_rate` radians
/// on every invocation, so the field must live for the whole session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrackingField {
    /// Radius of the tracked circle.
    pub radius: f64,
    /// Gain applied to the piecewise magnitude.
    pub stiffness: f64,
    /// Angle accumulated per tick, in radians.
    pub angular_rate: f64,
    /// Base of the logarithmic ramp near the target.
    pub log_base: f64,
    /// Slope of the linear mid-range branch.
    pub slope: f64,
    /// Breakpoint between the logarithmic and linear branches.
    pub range1: f64,
    /// Breakpoint where the magnitude saturates.
    pub range2: f64,
    /// Ticks elapsed since the session started.
    tick: u64,
}

impl TrackingField {
    /// Create a tracking model with explicit gains.
    #[must_use]
    pub const fn new(radius: f64, stiffness: f64, angular_rate: f64) -> Self {
        Self {
            radius,
            stiffness,
            angular_rate,
            log_base: 1.05,
            slope: -1.0,
            range1: 0.01,
            range2: 0.02,
            tick: 0,
        }
    }

    /// The target position at the current tick.
    #[must_use]
    pub fn target(&self) -> Vec3 {
        let angle = self.angular_rate * self.tick as f64;
        Vec3::new(self.radius * angle.cos(), self.radius * angle.sin(), 0.0)
    }

    /// Ticks elapsed so far.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Piecewise pull magnitude as a function of distance to the target.
    ///
    /// Logarithmic below `range1`, linear up to `range2`, then clamped to
    /// the linear branch's value at `range2`. The linear branch's
    /// intercept is chosen so the curve is continuous at `range1`.
    #[must_use]
    pub fn magnitude(&self, distance: f64) -> f64 {
        let log_branch_at = |d: f64| (d + 1.0).ln() / self.log_base.ln();
        let linear_branch_at =
            |d: f64| self.slope * d + log_branch_at(self.range1) - self.slope * self.range1;

        if distance < self.range1 {
            log_branch_at(distance)
        } else if distance < self.range2 {
            linear_branch_at(distance)
        } else {
            linear_branch_at(self.range2)
        }
    }
}

impl Default for TrackingField {
    fn default() -> Self {
        Self::new(0.04, 100.0, 0.005)
    }
}

impl ForceField for TrackingField {
    fn update(&mut self, position: Vec3) -> Vec3 {
        let target = self.target();
        let offset = target - position;
        let distance = offset.magnitude();

        // Device sitting exactly on the target: no pull direction exists,
        // normalized() yields zero and so does the force.
        let force = offset
            .normalized()
            .scaled(self.stiffness * self.magnitude(distance));

        self.tick += 1;
        force
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_orbits_circle() {
        let mut field = TrackingField::default();
        let start = field.target();
        assert!((start.x - field.radius).abs() < 1e-12);
        assert_eq!(start.y, 0.0);

        for _ in 0..100 {
            field.update(Vec3::zero());
            let target = field.target();
            assert!((target.magnitude() - field.radius).abs() < 1e-9);
            assert_eq!(target.z, 0.0);
        }
        assert_eq!(field.tick(), 100);
    }

    #[test]
    fn test_magnitude_continuous_at_range1() {
        let field = TrackingField::default();
        let below = field.magnitude(field.range1 - 1e-9);
        let above = field.magnitude(field.range1 + 1e-9);
        assert!((below - above).abs() < 1e-6);
    }

    #[test]
    fn test_magnitude_continuous_at_range2() {
        let field = TrackingField::default();
        let below = field.magnitude(field.range2 - 1e-9);
        let above = field.magnitude(field.range2 + 1e-9);
        assert!((below - above).abs() < 1e-6);
    }

    #[test]
    fn test_continuity_holds_for_other_gains() {
        let mut field = TrackingField::new(0.03, 250.0, 0.01);
        field.log_base = 1.2;
        field.slope = -0.5;
        field.range1 = 0.005;
        field.range2 = 0.03;

        for (a, b) in [(field.range1, field.range1), (field.range2, field.range2)] {
            let below = field.magnitude(a - 1e-9);
            let above = field.magnitude(b + 1e-9);
            assert!((below - above).abs() < 1e-6);
        }
    }

    #[test]
    fn test_magnitude_saturates_beyond_range2() {
        let field = TrackingField::default();
        let cap = field.magnitude(field.range2);
        assert!((field.magnitude(0.05) - cap).abs() < 1e-12);
        assert!((field.magnitude(1.0) - cap).abs() < 1e-12);
    }

    #[test]
    fn test_force_points_toward_target() {
        let mut field = TrackingField::default();
        // Target starts at (radius, 0, 0); device sits at the origin.
        let force = field.update(Vec3::zero());
        assert!(force.x > 0.0);
        assert!(force.y.abs() < 1e-12);
    }

    #[test]
    fn test_on_target_singularity_yields_zero() {
        let mut field = TrackingField::default();
        let on_target = field.target();
        let force = field.update(on_target);
        assert_eq!(force, Vec3::zero());
    }

    #[test]
    fn test_tick_advances_per_invocation() {
        let mut field = TrackingField::default();
        let before = field.target();
        field.update(Vec3::zero());
        field.update(Vec3::zero());
        let after = field.target();
        assert_ne!(before, after);
        assert_eq!(field.tick(), 2);
    }
}
