//! Simulated device and surface for development and tests.
//!
//! Stands in for real hardware: the position is scriptable from outside
//! and every force write is recorded for inspection.

use std::sync::Mutex;

use tactus_core::Vec3;

use crate::device::{DeviceBinding, Marker, RenderSurface};

/// An in-memory device: settable position, recorded force writes.
#[derive(Debug, Default)]
pub struct SimulatedDevice {
    position: Mutex<Vec3>,
    forces: Mutex<Vec<Vec3>>,
}

impl SimulatedDevice {
    /// Create a device resting at the workspace origin.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the simulated device.
    pub fn set_position(&self, position: Vec3) {
        if let Ok(mut p) = self.position.lock() {
            *p = position;
        }
    }

    /// Every force written so far, oldest first.
    #[must_use]
    pub fn forces(&self) -> Vec<Vec3> {
        self.forces.lock().map(|f| f.clone()).unwrap_or_default()
    }

    /// The most recent force write, if any.
    #[must_use]
    pub fn last_force(&self) -> Option<Vec3> {
        self.forces.lock().ok().and_then(|f| f.last().copied())
    }
}

impl DeviceBinding for SimulatedDevice {
    fn position(&self) -> Vec3 {
        self.position.lock().map(|p| *p).unwrap_or_default()
    }

    fn send_force(&self, force: Vec3) {
        if let Ok(mut forces) = self.forces.lock() {
            forces.push(force);
        }
    }
}

/// A render surface that logs draws instead of rasterizing them.
#[derive(Debug, Default)]
pub struct TraceSurface {
    frames: u64,
}

impl TraceSurface {
    /// Create a trace surface.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames drawn so far.
    #[must_use]
    pub const fn frames(&self) -> u64 {
        self.frames
    }
}

impl RenderSurface for TraceSurface {
    fn clear(&mut self) {}

    fn draw_marker(&mut self, marker: Marker) {
        self.frames += 1;
        tracing::debug!(
            x = marker.x,
            y = marker.y,
            radius = marker.radius,
            opacity = marker.opacity,
            frame = self.frames,
            "draw proxy"
        );
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_roundtrip() {
        let device = SimulatedDevice::new();
        assert_eq!(device.position(), Vec3::zero());

        device.set_position(Vec3::new(0.01, -0.02, 0.03));
        assert_eq!(device.position(), Vec3::new(0.01, -0.02, 0.03));
    }

    #[test]
    fn test_trace_surface_counts_frames() {
        let mut surface = TraceSurface::new();
        assert_eq!(surface.frames(), 0);

        surface.draw_marker(Marker {
            x: 320.0,
            y: 240.0,
            radius: 20.0,
            opacity: 1.0,
        });
        surface.clear();
        surface.draw_marker(Marker {
            x: 0.0,
            y: 0.0,
            radius: 1.0,
            opacity: 0.5,
        });
        assert_eq!(surface.frames(), 2);
    }

    #[test]
    fn test_forces_recorded_in_order() {
        let device = SimulatedDevice::new();
        assert!(device.last_force().is_none());

        device.send_force(Vec3::new(1.0, 0.0, 0.0));
        device.send_force(Vec3::zero());

        let forces = device.forces();
        assert_eq!(forces.len(), 2);
        assert_eq!(forces[0], Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(device.last_force(), Some(Vec3::zero()));
    }
}
