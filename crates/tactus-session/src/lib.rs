//! Tactus Session - Simulation Supervisor and Worker
//!
//! This crate coordinates two independently-timed control loops around a
//! single haptic device that must never be left applying unintended force:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                           Supervisor                             │
//! │                                                                  │
//! │  force loop (1 ms)           render loop (30 ms)                 │
//! │  read position ──┐           read last position ─▶ draw marker   │
//! │                  │                                               │
//! │                  ▼ update                         ▲              │
//! │  ┌───────────────────────────┐     force          │              │
//! │  │   Worker (isolated task)  │ ──────────▶ send_force(device)    │
//! │  │   owns one ForceField     │                                   │
//! │  └───────────────────────────┘                                   │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Simulation logic runs in a spawned worker task reachable only through
//! message channels, so a slow or broken field can never stall the control
//! path. The supervisor enforces the single-active-session invariant and
//! guarantees the device force is driven to zero on every teardown path.

#![warn(missing_docs)]

pub mod device;
pub mod registry;
pub mod sim;
pub mod supervisor;
pub mod worker;

pub use device::{DeviceBinding, DrawConfig, Marker, RenderSurface};
pub use registry::{FieldFactory, SimulationRegistry};
pub use sim::{SimulatedDevice, TraceSurface};
pub use supervisor::{SessionError, SessionState, Supervisor, SupervisorConfig};
pub use worker::WorkerHandle;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
