//! Virtual wall contact: one-sided half-space penalty along Z.

use serde::{Deserialize, Serialize};

use tactus_core::Vec3;

use crate::{ForceField, DEFAULT_STIFFNESS};

/// One-sided spring against the half-space below a Z plane.
///
/// Pressing below the plane pushes back along +Z proportionally to the
/// penetration; the device moves freely above it. X and Y are never
/// constrained by this model.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct WallField {
    /// Z coordinate of the wall plane.
    pub plane_z: f64,
    /// Penetration-to-force gain.
    pub stiffness: f64,
}

impl WallField {
    /// Create a wall contact model.
    #[must_use]
    pub const fn new(plane_z: f64, stiffness: f64) -> Self {
        Self { plane_z, stiffness }
    }
}

impl Default for WallField {
    fn default() -> Self {
        Self::new(0.0, DEFAULT_STIFFNESS)
    }
}

impl ForceField for WallField {
    fn update(&mut self, position: Vec3) -> Vec3 {
        if position.z < self.plane_z {
            Vec3::new(0.0, 0.0, self.stiffness * (self.plane_z - position.z))
        } else {
            Vec3::zero()
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
