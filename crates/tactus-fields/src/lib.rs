//! Tactus Fields - Force Field Models
//!
//! A force field model maps a device position sample to the force the
//! device should render, implementing one simulated physical effect:
//!
//! - [`SphereField`]: elastic repulsion out of a virtual sphere
//! - [`WallField`]: one-sided penalty against a half-space wall
//! - [`TrackingField`]: magnetic pull toward a point orbiting a circle
//! - [`scene::SceneField`]: contact against a small scene graph of shapes
//!
//! Models are pure except for [`TrackingField`], which advances an
//! internal tick counter on every invocation. All positions are in device
//! coordinates (workspace ≈ ±0.05 per axis); forces are in the units the
//! device binding expects.

#![warn(missing_docs)]

pub mod scene;
pub mod sphere;
pub mod tracking;
pub mod wall;

pub use scene::SceneField;
pub use sphere::SphereField;
pub use tracking::TrackingField;
pub use wall::WallField;

use tactus_core::Vec3;

/// Default stiffness gain for contact models.
pub const DEFAULT_STIFFNESS: f64 = 1000.0;

/// A force field model: one simulated physical effect.
///
/// The simulation worker owns exactly one implementation and calls
/// [`ForceField::update`] once per position sample, in sample order.
pub trait ForceField: Send {
    /// Compute the feedback force for the given device position.
    fn update(&mut self, position: Vec3) -> Vec3;
}
