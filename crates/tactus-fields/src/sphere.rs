//! Virtual sphere contact: penalty-based elastic repulsion.

use serde::{Deserialize, Serialize};

use tactus_core::Vec3;

use crate::{ForceField, DEFAULT_STIFFNESS};

/// Elastic repulsion out of a sphere centered at the origin.
///
/// While the device is inside the sphere, it is pushed back out along the
/// line from the center to the device, proportionally to the penetration
/// depth. Outside the sphere the force is zero.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SphereField {
    /// Sphere radius in device units.
    pub radius: f64,
    /// Penetration-to-force gain.
    pub stiffness: f64,
}

impl SphereField {
    /// Create a sphere contact model.
    #[must_use]
    pub const fn new(radius: f64, stiffness: f64) -> Self {
        Self { radius, stiffness }
    }
}

impl Default for SphereField {
    fn default() -> Self {
        Self::new(0.04, DEFAULT_STIFFNESS)
    }
}

impl ForceField for SphereField {
    fn update(&mut self, position: Vec3) -> Vec3 {
        let distance = position.magnitude();
        if distance >= self.radius {
            return Vec3::zero();
        }

        // Device exactly at the center has no defined push direction;
        // normalized() collapses it to zero force.
        position
            .normalized()
            .scaled(self.stiffness * (self.radius - distance))
    }
}

// ============================================================================
// Tests
// ============================================================================
