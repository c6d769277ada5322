//! Scene-graph contact: penalty forces against a small set of shapes.
//!
//! A lighter-weight alternative to the single-shape models: the field
//! holds a list of placed shapes and sums the contact response of each.
//! Shapes use the same penalty gains as the dedicated models; this module
//! exists to drive a rendered scene, not to be a full collision engine.

use serde::{Deserialize, Serialize};

use tactus_core::Vec3;

use crate::{ForceField, DEFAULT_STIFFNESS};

/// A shape placed in the scene.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub enum SceneShape {
    /// A solid sphere the device is pushed out of.
    Sphere {
        /// Sphere center.
        center: Vec3,
        /// Sphere radius.
        radius: f64,
    },
    /// Axis-aligned one-sided planes through a corner point: each axis
    /// pushes back independently when the device falls below it.
    Plane {
        /// Corner the three planes pass through.
        origin: Vec3,
    },
    /// An axis-aligned box the device is pushed out of through the
    /// nearest face.
    Cube {
        /// Minimum corner.
        min: Vec3,
        /// Maximum corner.
        max: Vec3,
    },
}

/// Result of testing one shape, for renderers that want contact state.
#[derive(Clone, Copy, Debug)]
pub struct ContactResponse {
    /// Whether the device is in contact with the shape.
    pub hit: bool,
    /// Penalty force contributed by the shape.
    pub force: Vec3,
}

impl ContactResponse {
    fn miss() -> Self {
        Self {
            hit: false,
            force: Vec3::zero(),
        }
    }
}

/// Contact against every shape in a scene, responses summed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SceneField {
    /// Shapes in the scene.
    pub shapes: Vec<SceneShape>,
    /// Penetration-to-force gain shared by all shapes.
    pub stiffness: f64,
}

impl SceneField {
    /// Create a scene contact model.
    #[must_use]
    pub fn new(shapes: Vec<SceneShape>, stiffness: f64) -> Self {
        Self { shapes, stiffness }
    }

    /// Test a single shape against a device position.
    #[must_use]
    pub fn check(&self, position: Vec3, shape: &SceneShape) -> ContactResponse {
        match *shape {
            SceneShape::Sphere { center, radius } => {
                let offset = position - center;
                let distance = offset.magnitude();
                if distance >= radius {
                    return ContactResponse::miss();
                }
                ContactResponse {
                    hit: true,
                    force: offset
                        .normalized()
                        .scaled(self.stiffness * (radius - distance)),
                }
            }
            SceneShape::Plane { origin } => {
                let mut force = Vec3::zero();
                if position.x < origin.x {
                    force.x = self.stiffness * (origin.x - position.x);
                }
                if position.y < origin.y {
                    force.y = self.stiffness * (origin.y - position.y);
                }
                if position.z < origin.z {
                    force.z = self.stiffness * (origin.z - position.z);
                }
                ContactResponse {
                    hit: !force.is_zero(),
                    force,
                }
            }
            SceneShape::Cube { min, max } => {
                let inside = position.x > min.x
                    && position.x < max.x
                    && position.y > min.y
                    && position.y < max.y
                    && position.z > min.z
                    && position.z < max.z;
                if !inside {
                    return ContactResponse::miss();
                }

                // Push out through the nearest face.
                let exits = [
                    Vec3::new(-(position.x - min.x), 0.0, 0.0),
                    Vec3::new(max.x - position.x, 0.0, 0.0),
                    Vec3::new(0.0, -(position.y - min.y), 0.0),
                    Vec3::new(0.0, max.y - position.y, 0.0),
                    Vec3::new(0.0, 0.0, -(position.z - min.z)),
                    Vec3::new(0.0, 0.0, max.z - position.z),
                ];
                let nearest = exits
                    .into_iter()
                    .min_by(|a, b| {
                        a.magnitude()
                            .partial_cmp(&b.magnitude())
                            .unwrap_or(std::cmp::Ordering::Equal)
                    })
                    .unwrap_or_else(Vec3::zero);

                ContactResponse {
                    hit: true,
                    force: nearest.scaled(self.stiffness),
                }
            }
        }
    }
}

impl Default for SceneField {
    fn default() -> Self {
        Self::new(
            vec![
                SceneShape::Sphere {
                    center: Vec3::new(0.02, 0.0, 0.0),
                    radius: 0.015,
                },
                SceneShape::Plane {
                    origin: Vec3::new(-0.05, -0.05, -0.04),
                },
            ],
            DEFAULT_STIFFNESS,
        )
    }
}

impl ForceField for SceneField {
    fn update(&mut self, position: Vec3) -> Vec3 {
        let mut total = Vec3::zero();
        for shape in &self.shapes {
            total = total + self.check(position, shape).force;
        }
        total
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_sphere_contact() {
        let field = SceneField::default();
        let shape = SceneShape::Sphere {
            center: Vec3::new(0.02, 0.0, 0.0),
            radius: 0.015,
        };

        let outside = field.check(Vec3::new(-0.02, 0.0, 0.0), &shape);
        assert!(!outside.hit);
        assert_eq!(outside.force, Vec3::zero());

        // 0.005 inside the surface, on the -x side of the center.
        let inside = field.check(Vec3::new(0.01, 0.0, 0.0), &shape);
        assert!(inside.hit);
        assert!(inside.force.x < 0.0);
        assert!((inside.force.magnitude() - 1000.0 * 0.005).abs() < 1e-9);
    }

    #[test]
    fn test_plane_pushes_per_axis() {
        let field = SceneField::new(vec![], 1000.0);
        let shape = SceneShape::Plane {
            origin: Vec3::zero(),
        };

        let response = field.check(Vec3::new(-0.01, 0.02, -0.005), &shape);
        assert!(response.hit);
        assert!((response.force.x - 10.0).abs() < 1e-9);
        assert_eq!(response.force.y, 0.0);
        assert!((response.force.z - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_cube_pushes_through_nearest_face() {
        let field = SceneField::new(vec![], 1000.0);
        let shape = SceneShape::Cube {
            min: Vec3::new(-0.02, -0.02, -0.02),
            max: Vec3::new(0.02, 0.02, 0.02),
        };

        assert!(!field.check(Vec3::new(0.03, 0.0, 0.0), &shape).hit);

        // Just inside the +x face: expelled along +x.
        let response = field.check(Vec3::new(0.018, 0.0, 0.0), &shape);
        assert!(response.hit);
        assert!(response.force.x > 0.0);
        assert_eq!(response.force.y, 0.0);
        assert_eq!(response.force.z, 0.0);
    }

    #[test]
    fn test_field_sums_shape_responses() {
        let mut field = SceneField::new(
            vec![
                SceneShape::Plane {
                    origin: Vec3::zero(),
                },
                SceneShape::Sphere {
                    center: Vec3::zero(),
                    radius: 0.02,
                },
            ],
            1000.0,
        );

        // Below the plane corner and inside the sphere at once.
        let force = field.update(Vec3::new(0.01, 0.01, -0.005));
        assert!(force.z > 0.0);
        // Clear of everything.
        assert_eq!(field.update(Vec3::new(0.04, 0.04, 0.04)), Vec3::zero());
    }
}
