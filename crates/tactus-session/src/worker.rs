//! Isolated simulation worker.
//!
//! A worker is one spawned task owning exactly one force field and a pair
//! of channel endpoints. It has no access to the device or the rendering
//! surface, so simulation logic cannot stall or corrupt the control path.
//!
//! Protocol (commands in, replies out, order-preserving per direction):
//!
//! - `start` ⇒ `started`, before any computation
//! - `update(position)` ⇒ exactly one `force(vector)` per update, in
//!   receive order, never buffered or coalesced
//! - `stop` ⇒ `stopped`, then the task exits
//! - anything else ⇒ `unknown`, and the worker keeps running

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use tactus_core::Message;
use tactus_fields::ForceField;

/// Handle to a spawned worker: its command channel and task handle.
pub struct WorkerHandle {
    pub(crate) cmd_tx: mpsc::Sender<Message>,
    pub(crate) join: JoinHandle<()>,
}

impl WorkerHandle {
    /// A clone of the command-channel sender, for the force loop.
    #[must_use]
    pub fn sender(&self) -> mpsc::Sender<Message> {
        self.cmd_tx.clone()
    }

    /// Forcibly terminate the worker task.
    ///
    /// Only used when the worker fails to acknowledge a lifecycle command;
    /// the normal exit path is the `stop`/`stopped` handshake.
    pub fn abort(&self) {
        self.join.abort();
    }
}

/// Spawn a worker bound to the given force field.
///
/// Replies flow into `reply_tx`; the returned handle carries the command
/// channel. Binding happens here, at spawn time; the field cannot be
/// swapped for the lifetime of the worker.
#[must_use]
pub fn spawn(
    mut field: Box<dyn ForceField>,
    reply_tx: mpsc::Sender<Message>,
    channel_capacity: usize,
) -> WorkerHandle {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Message>(channel_capacity);

    let join = tokio::spawn(async move {
        while let Some(message) = cmd_rx.recv().await {
            match message {
                Message::Start => {
                    if reply_tx.send(Message::Started).await.is_err() {
                        break;
                    }
                }
                Message::Update { position } => {
                    let force = field.update(position);
                    if reply_tx.send(Message::Force { force }).await.is_err() {
                        break;
                    }
                }
                Message::Stop => {
                    let _ = reply_tx.send(Message::Stopped).await;
                    break;
                }
                _ => {
                    if reply_tx.send(Message::Unknown).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    WorkerHandle { cmd_tx, join }
}

// ============================================================================
// Tests
// ============================================================================
