//! Tactus Core - Shared Types and Wire Protocol
//!
//! This crate provides the types shared by every part of the tactus haptic
//! session engine: the 3-D vector used for device position samples and force
//! vectors, and the tagged message protocol spoken across the
//! supervisor↔worker boundary.
//!
//! The protocol is deliberately tiny. A simulation worker understands three
//! commands (`start`, `stop`, `update`) and emits four replies (`started`,
//! `stopped`, `force`, `unknown`). Payloads are plain 3-element arrays so the
//! wire format stays JSON-serializable end to end.

#![warn(missing_docs)]

pub mod protocol;
pub mod types;

pub use protocol::{Message, ProtocolError};
pub use types::Vec3;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Half-extent of the device workspace along each axis, in device units.
///
/// Positions reported by the device fall roughly within ±this value.
pub const WORKSPACE_HALF_EXTENT: f64 = 0.05;
