//! Message protocol for the supervisor↔worker boundary.
//!
//! Every message crossing the boundary is a tagged record
//! `{"cmd": <name>, ...}` with an optional 3-element array payload:
//!
//! - Host → worker: `start`, `stop`, `update` (carries `position`)
//! - Worker → host: `started`, `stopped`, `force` (carries `force`),
//!   `unknown`
//!
//! Messages are delivered asynchronously and order-preserving per
//! direction. The two sides share no memory; the protocol is the entire
//! contract.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Vec3;

// ============================================================================
// Error Types
// ============================================================================

/// Errors produced while decoding a wire message.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The `cmd` tag names no known command. Recoverable: the receiver
    /// reports it and keeps running.
    #[error("unrecognized command: {0}")]
    UnknownCommand(String),

    /// The record carries no `cmd` tag at all.
    #[error("message has no cmd tag")]
    MissingCommand,

    /// The record is not valid JSON, or its payload has the wrong shape.
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
}

// ============================================================================
// Message
// ============================================================================

/// Command tags understood by either side of the boundary.
const COMMANDS: [&str; 7] = [
    "start", "stop", "update", "started", "stopped", "force", "unknown",
];

/// A message crossing the supervisor↔worker boundary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "lowercase")]
pub enum Message {
    /// Begin the session (host → worker).
    Start,
    /// End the session (host → worker).
    Stop,
    /// A fresh device position sample (host → worker).
    Update {
        /// Current device position.
        position: Vec3,
    },
    /// Start acknowledged; no simulation computation has occurred yet
    /// (worker → host).
    Started,
    /// Stop acknowledged; the worker sends nothing after this
    /// (worker → host).
    Stopped,
    /// Force computed from the most recent update (worker → host).
    Force {
        /// Force to write to the device.
        force: Vec3,
    },
    /// The worker received a tag it does not handle (worker → host).
    Unknown,
}

impl Message {
    /// The wire tag of this message, for diagnostics.
    #[must_use]
    pub const fn command(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Update { .. } => "update",
            Self::Started => "started",
            Self::Stopped => "stopped",
            Self::Force { .. } => "force",
            Self::Unknown => "unknown",
        }
    }

    /// True for messages the supervisor sends to the worker.
    #[must_use]
    pub const fn is_command(&self) -> bool {
        matches!(self, Self::Start | Self::Stop | Self::Update { .. })
    }

    /// True for messages the worker sends back to the supervisor.
    #[must_use]
    pub const fn is_reply(&self) -> bool {
        !self.is_command()
    }

    /// Encode to the JSON wire format.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Malformed`] if serialization fails, which
    /// cannot happen for any value of this closed type in practice.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from the JSON wire format.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::UnknownCommand`] when the `cmd` tag is present but
    /// unrecognized, [`ProtocolError::MissingCommand`] when it is absent,
    /// and [`ProtocolError::Malformed`] for anything else.
    pub fn decode(json: &str) -> Result<Self, ProtocolError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let cmd = value
            .get("cmd")
            .and_then(serde_json::Value::as_str)
            .ok_or(ProtocolError::MissingCommand)?;

        if !COMMANDS.contains(&cmd) {
            return Err(ProtocolError::UnknownCommand(cmd.to_string()));
        }

        Ok(serde_json::from_value(value)?)
    }
}

// ============================================================================
// Tests
// ============================================================================
