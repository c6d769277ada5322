//! Capability traits for the device and the rendering surface.
//!
//! The supervisor owns both resources exclusively; workers never see them.
//! Platform bindings implement these traits; the crate itself ships only
//! the simulated implementations in [`crate::sim`].

use serde::{Deserialize, Serialize};

use tactus_core::{Vec3, WORKSPACE_HALF_EXTENT};

/// A force-feedback device: a readable position and a write-only force.
pub trait DeviceBinding: Send + Sync {
    /// Current device position in device coordinates.
    fn position(&self) -> Vec3;

    /// Write a force to the device.
    ///
    /// Infallible by contract: a binding must accept any finite 3-vector
    /// without panicking, because this is called from the control path.
    fn send_force(&self, force: Vec3);
}

/// A clearable 2-D surface the render loop draws the device proxy on.
pub trait RenderSurface: Send {
    /// Erase the previous frame.
    fn clear(&mut self);

    /// Draw the device proxy marker.
    fn draw_marker(&mut self, marker: Marker);
}

/// One frame's device proxy: a circle positioned and sized on the surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Marker {
    /// Horizontal center in surface pixels.
    pub x: f64,
    /// Vertical center in surface pixels.
    pub y: f64,
    /// Circle radius in surface pixels.
    pub radius: f64,
    /// Fill opacity, 0.0 to 1.0.
    pub opacity: f64,
}

/// Device-space → surface-space transform used by the render loop.
///
/// X/Y map linearly onto the surface; depth (Z) drives marker size and
/// opacity so pushing in reads as the proxy receding.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct DrawConfig {
    /// Surface width in pixels.
    pub width: f64,
    /// Surface height in pixels.
    pub height: f64,
    /// Device workspace half-extent mapped to the surface half-size.
    pub workspace_extent: f64,
    /// Marker radius at z = 0.
    pub base_radius: f64,
}

impl DrawConfig {
    /// Build the proxy marker for a device position.
    #[must_use]
    pub fn marker_for(&self, position: Vec3) -> Marker {
        let half_w = self.width / 2.0;
        let half_h = self.height / 2.0;
        let unit_x = (position.x / self.workspace_extent).clamp(-1.0, 1.0);
        // Surface Y grows downward.
        let unit_y = (-position.y / self.workspace_extent).clamp(-1.0, 1.0);
        let unit_z = (position.z / self.workspace_extent).clamp(-1.0, 1.0);

        Marker {
            x: half_w + unit_x * half_w,
            y: half_h + unit_y * half_h,
            radius: (self.base_radius * (1.0 + unit_z)).max(1.0),
            opacity: (1.0 - unit_z.abs() * 0.5).clamp(0.0, 1.0),
        }
    }
}

impl Default for DrawConfig {
    fn default() -> Self {
        Self {
            width: 640.0,
            height: 480.0,
            workspace_extent: WORKSPACE_HALF_EXTENT,
            base_radius: 20.0,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
