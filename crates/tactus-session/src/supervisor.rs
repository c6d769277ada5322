//! Simulation supervisor.
//!
//! Owns the device binding, the rendering surface, and the registry of
//! simulation kinds; enforces the single-active-session invariant; runs
//! the two periodic loops and brokers every message to and from the
//! active worker.
//!
//! Session lifecycle:
//!
//! ```text
//! Idle ── run(kind) ──▶ Starting ── started ──▶ Running
//!   ▲                                              │
//!   └────── stopped ◀── Stopping ◀── stop() ───────┘
//! ```
//!
//! Every path out of a session (the `stopped` handshake, a handshake
//! timeout, or a dead worker channel) cancels both loops and writes the
//! zero force vector to the device before the supervisor reports `Idle`.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use tactus_core::{Message, Vec3};

use crate::device::{DeviceBinding, DrawConfig, RenderSurface};
use crate::registry::{FieldFactory, SimulationRegistry};
use crate::worker::{self, WorkerHandle};
use crate::SessionResult;

// ============================================================================
// Error Types
// ============================================================================

/// Errors reported by supervisor operations.
///
/// None of these are fatal: the supervisor is always left in a
/// well-defined state, and the caller may retry.
#[derive(Debug, Error)]
pub enum SessionError {
    /// `run` while another simulation is active; the active session is
    /// untouched.
    #[error("cannot run [{requested}]: [{active}] is still running")]
    Busy {
        /// The kind that was requested.
        requested: String,
        /// The kind that is currently running.
        active: String,
    },

    /// `stop` or `post` while no session exists.
    #[error("no simulation is running")]
    NoActiveSession,

    /// `run` with a kind the registry does not know.
    #[error("unknown simulation kind: [{0}]")]
    UnknownSimulation(String),

    /// The worker never acknowledged a lifecycle command; the session was
    /// torn down and the device force zeroed.
    #[error("worker failed to acknowledge while {phase} (waited {timeout_ms} ms)")]
    HandshakeTimeout {
        /// The transitional state the supervisor was waiting in.
        phase: SessionState,
        /// How long it waited.
        timeout_ms: u64,
    },

    /// The worker task died without completing the stop handshake; the
    /// session was torn down and the device force zeroed.
    #[error("worker terminated unexpectedly")]
    WorkerGone,
}

// ============================================================================
// Session State
// ============================================================================

/// Lifecycle state of the supervisor's session slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// No session exists; the device force output is zero.
    Idle,
    /// A worker was spawned; waiting for `started`.
    Starting,
    /// Both periodic loops are scheduled and forces flow to the device.
    Running,
    /// `stop` was sent; waiting for `stopped`.
    Stopping,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
        };
        write!(f, "{name}")
    }
}

/// Run-time record of the active simulation. At most one exists.
struct Session {
    kind: String,
    state: SessionState,
    worker: WorkerHandle,
    reply_rx: mpsc::Receiver<Message>,
    /// Written by the force loop, read by the render loop.
    last_position: Arc<RwLock<Option<Vec3>>>,
    force_task: Option<JoinHandle<()>>,
    render_task: Option<JoinHandle<()>>,
}

// ============================================================================
// Configuration
// ============================================================================

/// Timing and sizing knobs for the supervisor.
#[derive(Clone, Copy, Debug)]
pub struct SupervisorConfig {
    /// Period of the force loop (position sample → worker update).
    pub force_period: Duration,

    /// Period of the render loop (proxy redraw).
    pub render_period: Duration,

    /// How long to wait for a `started`/`stopped` acknowledgement before
    /// tearing the session down.
    pub handshake_timeout: Duration,

    /// Capacity of each direction of the worker message channel.
    pub channel_capacity: usize,

    /// Device-space → surface-space transform for the render loop.
    pub draw: DrawConfig,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            force_period: Duration::from_millis(1),
            render_period: Duration::from_millis(30),
            handshake_timeout: Duration::from_secs(1),
            channel_capacity: 64,
            draw: DrawConfig::default(),
        }
    }
}

// ============================================================================
// Supervisor
// ============================================================================

/// Coordinates one simulation session around the shared haptic device.
///
/// All operations run on the caller's task; the worker and the two
/// periodic loops are spawned tasks that communicate only through
/// channels and the shared last-position cell.
pub struct Supervisor {
    config: SupervisorConfig,
    registry: SimulationRegistry,
    device: Arc<dyn DeviceBinding>,
    surface: Arc<Mutex<Box<dyn RenderSurface>>>,
    session: Option<Session>,
}

impl Supervisor {
    /// Create a supervisor with default configuration and the built-in
    /// simulation kinds.
    #[must_use]
    pub fn new(device: Arc<dyn DeviceBinding>, surface: Box<dyn RenderSurface>) -> Self {
        Self::with_config(device, surface, SupervisorConfig::default())
    }

    /// Create a supervisor with custom configuration.
    #[must_use]
    pub fn with_config(
        device: Arc<dyn DeviceBinding>,
        surface: Box<dyn RenderSurface>,
        config: SupervisorConfig,
    ) -> Self {
        Self {
            config,
            registry: SimulationRegistry::standard(),
            device,
            surface: Arc::new(Mutex::new(surface)),
            session: None,
        }
    }

    /// Replace the registry of simulation kinds wholesale.
    pub fn register(&mut self, entries: HashMap<String, FieldFactory>) {
        self.registry.register(entries);
    }

    /// Names of the registered simulation kinds.
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        self.registry.list()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.session
            .as_ref()
            .map_or(SessionState::Idle, |session| session.state)
    }

    /// Kind of the active session, if any.
    #[must_use]
    pub fn active_kind(&self) -> Option<&str> {
        self.session.as_ref().map(|session| session.kind.as_str())
    }

    /// Start a simulation session.
    ///
    /// Spawns a worker bound to the kind's force field and sends `start`;
    /// the session reaches [`SessionState::Running`] once [`Self::pump`]
    /// processes the worker's `started` acknowledgement.
    ///
    /// # Errors
    ///
    /// [`SessionError::Busy`] if a session already exists (it is left
    /// untouched), [`SessionError::UnknownSimulation`] if the kind is not
    /// registered.
    pub async fn run(&mut self, kind: &str) -> SessionResult<()> {
        if let Some(session) = &self.session {
            return Err(SessionError::Busy {
                requested: kind.to_string(),
                active: session.kind.clone(),
            });
        }

        let field = self
            .registry
            .resolve(kind)
            .ok_or_else(|| SessionError::UnknownSimulation(kind.to_string()))?;

        let (reply_tx, reply_rx) = mpsc::channel(self.config.channel_capacity);
        let worker = worker::spawn(field, reply_tx, self.config.channel_capacity);

        self.session = Some(Session {
            kind: kind.to_string(),
            state: SessionState::Starting,
            worker,
            reply_rx,
            last_position: Arc::new(RwLock::new(None)),
            force_task: None,
            render_task: None,
        });

        info!(kind, "starting simulation session");
        self.post(Message::Start).await
    }

    /// Stop the active session.
    ///
    /// Sends `stop`; teardown (loop cancellation, zero-force write,
    /// session disposal) happens when [`Self::pump`] processes the
    /// worker's `stopped` acknowledgement. Calling this again while
    /// already stopping is a no-op.
    ///
    /// # Errors
    ///
    /// [`SessionError::NoActiveSession`] when idle.
    pub async fn stop(&mut self) -> SessionResult<()> {
        {
            let session = self
                .session
                .as_mut()
                .ok_or(SessionError::NoActiveSession)?;
            if session.state == SessionState::Stopping {
                return Ok(());
            }
            session.state = SessionState::Stopping;
            info!(kind = %session.kind, "stopping simulation session");
        }
        self.post(Message::Stop).await
    }

    /// Forward a message to the active worker.
    ///
    /// # Errors
    ///
    /// [`SessionError::NoActiveSession`] when idle;
    /// [`SessionError::WorkerGone`] if the worker's channel is closed, in
    /// which case the session is torn down with the force zeroed.
    pub async fn post(&mut self, message: Message) -> SessionResult<()> {
        let cmd_tx = self
            .session
            .as_ref()
            .map(|session| session.worker.sender())
            .ok_or(SessionError::NoActiveSession)?;

        if cmd_tx.send(message).await.is_err() {
            self.teardown();
            return Err(SessionError::WorkerGone);
        }
        Ok(())
    }

    /// Receive and handle one message from the worker.
    ///
    /// - `started`: schedules the force and render loops, transitions to
    ///   [`SessionState::Running`].
    /// - `stopped`: cancels the loops, zeroes the device force, discards
    ///   the session.
    /// - `force`: forwards the carried vector to the device.
    /// - anything else: logged as an unknown-command diagnostic.
    ///
    /// While the session is in a transitional state the wait is bounded by
    /// [`SupervisorConfig::handshake_timeout`].
    ///
    /// # Errors
    ///
    /// [`SessionError::NoActiveSession`] when idle;
    /// [`SessionError::HandshakeTimeout`] or [`SessionError::WorkerGone`]
    /// after a teardown that has already zeroed the device force.
    pub async fn pump(&mut self) -> SessionResult<Message> {
        let in_handshake = matches!(
            self.state(),
            SessionState::Starting | SessionState::Stopping
        );
        let timeout = self.config.handshake_timeout;

        let outcome = match self.session.as_mut() {
            None => return Err(SessionError::NoActiveSession),
            Some(session) => {
                if in_handshake {
                    tokio::time::timeout(timeout, session.reply_rx.recv()).await
                } else {
                    Ok(session.reply_rx.recv().await)
                }
            }
        };

        match outcome {
            Err(_elapsed) => {
                let phase = self.state();
                warn!(%phase, "worker handshake timed out, tearing session down");
                self.teardown();
                Err(SessionError::HandshakeTimeout {
                    phase,
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
            Ok(None) => {
                warn!("worker channel closed, tearing session down");
                self.teardown();
                Err(SessionError::WorkerGone)
            }
            Ok(Some(message)) => {
                self.handle_reply(&message);
                Ok(message)
            }
        }
    }

    fn handle_reply(&mut self, message: &Message) {
        match message {
            Message::Started => {
                let Some(session) = self.session.as_mut() else {
                    return;
                };
                if session.state != SessionState::Starting {
                    warn!(state = %session.state, "ignoring started outside of handshake");
                    return;
                }
                session.state = SessionState::Running;
                self.spawn_loops();
                if let Some(session) = &self.session {
                    info!(kind = %session.kind, "simulation session running");
                }
            }
            Message::Stopped => {
                if let Some(session) = &self.session {
                    info!(kind = %session.kind, "simulation session stopped");
                }
                self.teardown();
            }
            Message::Force { force } => {
                self.device.send_force(*force);
            }
            other => {
                warn!(command = other.command(), "unknown reply from worker");
            }
        }
    }

    /// Schedule the 1 ms force loop and the ~30 ms render loop.
    fn spawn_loops(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.force_task = Some(Self::force_loop(
            Arc::clone(&self.device),
            session.worker.sender(),
            Arc::clone(&session.last_position),
            self.config.force_period,
        ));
        session.render_task = Some(Self::render_loop(
            Arc::clone(&self.surface),
            Arc::clone(&session.last_position),
            self.config.draw,
            self.config.render_period,
        ));
    }

    /// Force loop: sample position, remember it, forward it. try_send
    /// keeps the loop from ever blocking on the worker: a full queue
    /// skips the tick and the next one carries a fresher sample.
    fn force_loop(
        device: Arc<dyn DeviceBinding>,
        cmd_tx: mpsc::Sender<Message>,
        last_position: Arc<RwLock<Option<Vec3>>>,
        period: Duration,
    ) -> JoinHandle<()> {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::spawn(async move {
            loop {
                ticker.tick().await;
                let position = device.position();
                if let Ok(mut last) = last_position.write() {
                    *last = Some(position);
                }
                match cmd_tx.try_send(Message::Update { position }) {
                    Ok(()) | Err(TrySendError::Full(_)) => {}
                    Err(TrySendError::Closed(_)) => break,
                }
            }
        })
    }

    /// Render loop: redraw the proxy from the last observed position.
    /// Rendering is advisory, so a sample one force-tick stale is fine;
    /// before the first sample arrives nothing is drawn at all.
    fn render_loop(
        surface: Arc<Mutex<Box<dyn RenderSurface>>>,
        last_position: Arc<RwLock<Option<Vec3>>>,
        draw: DrawConfig,
        period: Duration,
    ) -> JoinHandle<()> {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::spawn(async move {
            loop {
                ticker.tick().await;
                let position = match last_position.read() {
                    Ok(last) => *last,
                    Err(_) => None,
                };
                let Some(position) = position else {
                    continue;
                };
                if let Ok(mut surface) = surface.lock() {
                    surface.clear();
                    surface.draw_marker(draw.marker_for(position));
                }
            }
        })
    }

    /// Dispose of the session: cancel both loops, stop the worker, and
    /// drive the device force to zero. Safe on every exit path; aborting
    /// a task that already finished is a no-op.
    fn teardown(&mut self) {
        if let Some(session) = self.session.take() {
            session.worker.abort();
            if let Some(task) = session.force_task {
                task.abort();
            }
            if let Some(task) = session.render_task {
                task.abort();
            }
            self.device.send_force(Vec3::zero());
        }
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        // A supervisor dropped mid-session must not leave force applied.
        self.teardown();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::device::Marker;
    use crate::sim::{SimulatedDevice, TraceSurface};

    /// Render surface that records every drawn marker.
    struct RecordingSurface {
        markers: Arc<Mutex<Vec<Marker>>>,
    }

    impl RenderSurface for RecordingSurface {
        fn clear(&mut self) {}

        fn draw_marker(&mut self, marker: Marker) {
            if let Ok(mut markers) = self.markers.lock() {
                markers.push(marker);
            }
        }
    }

    fn new_supervisor() -> (Arc<SimulatedDevice>, Supervisor) {
        let device = Arc::new(SimulatedDevice::new());
        let supervisor = Supervisor::new(
            Arc::clone(&device) as Arc<dyn DeviceBinding>,
            Box::new(TraceSurface::new()),
        );
        (device, supervisor)
    }

    async fn pump_until_force(supervisor: &mut Supervisor) -> Vec3 {
        loop {
            if let Message::Force { force } = supervisor.pump().await.unwrap() {
                return force;
            }
        }
    }

    async fn pump_until_stopped(supervisor: &mut Supervisor) {
        loop {
            if let Message::Stopped = supervisor.pump().await.unwrap() {
                return;
            }
        }
    }

    #[tokio::test]
    async fn test_unknown_kind_rejected() {
        let (_, mut supervisor) = new_supervisor();
        let err = supervisor.run("magnet").await.unwrap_err();
        assert!(matches!(err, SessionError::UnknownSimulation(k) if k == "magnet"));
        assert_eq!(supervisor.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_stop_and_post_while_idle() {
        let (_, mut supervisor) = new_supervisor();
        assert!(matches!(
            supervisor.stop().await,
            Err(SessionError::NoActiveSession)
        ));
        assert!(matches!(
            supervisor.post(Message::Start).await,
            Err(SessionError::NoActiveSession)
        ));
    }

    #[tokio::test]
    async fn test_run_while_busy_leaves_session_untouched() {
        let (_, mut supervisor) = new_supervisor();
        supervisor.run("sphere").await.unwrap();
        assert_eq!(supervisor.pump().await.unwrap(), Message::Started);
        assert_eq!(supervisor.state(), SessionState::Running);

        let err = supervisor.run("wall").await.unwrap_err();
        match err {
            SessionError::Busy { requested, active } => {
                assert_eq!(requested, "wall");
                assert_eq!(active, "sphere");
            }
            other => panic!("expected busy error, got {other}"),
        }
        assert_eq!(supervisor.active_kind(), Some("sphere"));
        assert_eq!(supervisor.state(), SessionState::Running);

        supervisor.stop().await.unwrap();
        pump_until_stopped(&mut supervisor).await;
    }

    #[tokio::test]
    async fn test_wall_session_end_to_end() {
        let (device, mut supervisor) = new_supervisor();
        device.set_position(Vec3::new(0.0, 0.0, -0.01));

        supervisor.run("wall").await.unwrap();
        assert_eq!(supervisor.pump().await.unwrap(), Message::Started);

        let force = pump_until_force(&mut supervisor).await;
        assert!((force.z - 10.0).abs() < 1e-9);
        assert!((device.last_force().unwrap().z - 10.0).abs() < 1e-9);

        supervisor.stop().await.unwrap();
        pump_until_stopped(&mut supervisor).await;
        assert_eq!(supervisor.state(), SessionState::Idle);
        assert_eq!(device.last_force(), Some(Vec3::zero()));
    }

    #[tokio::test]
    async fn test_sphere_session_end_to_end() {
        let (device, mut supervisor) = new_supervisor();
        device.set_position(Vec3::new(0.02, 0.0, 0.0));

        supervisor.run("sphere").await.unwrap();
        assert_eq!(supervisor.pump().await.unwrap(), Message::Started);

        let force = pump_until_force(&mut supervisor).await;
        assert!((force.x - 20.0).abs() < 1e-9);
        assert_eq!(force.y, 0.0);
        assert_eq!(force.z, 0.0);

        supervisor.stop().await.unwrap();
        pump_until_stopped(&mut supervisor).await;

        // The safety invariant: the very last write is the zero vector.
        let forces = device.forces();
        assert_eq!(*forces.last().unwrap(), Vec3::zero());
        assert!(forces.iter().any(|f| (f.x - 20.0).abs() < 1e-9));
        assert_eq!(supervisor.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent_while_stopping() {
        let (_, mut supervisor) = new_supervisor();
        supervisor.run("tracking").await.unwrap();
        assert_eq!(supervisor.pump().await.unwrap(), Message::Started);

        supervisor.stop().await.unwrap();
        supervisor.stop().await.unwrap();
        pump_until_stopped(&mut supervisor).await;
        assert!(matches!(
            supervisor.stop().await,
            Err(SessionError::NoActiveSession)
        ));
    }

    #[tokio::test]
    async fn test_handshake_timeout_zeroes_force_and_idles() {
        let (device, mut supervisor) = new_supervisor();
        supervisor.config.handshake_timeout = Duration::from_millis(50);

        // A worker that never acknowledges anything.
        let (reply_tx, reply_rx) = mpsc::channel(8);
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let join = tokio::spawn(async move {
            let _keep_alive = (cmd_rx, reply_tx);
            std::future::pending::<()>().await
        });
        supervisor.session = Some(Session {
            kind: "stuck".to_string(),
            state: SessionState::Starting,
            worker: WorkerHandle { cmd_tx, join },
            reply_rx,
            last_position: Arc::new(RwLock::new(None)),
            force_task: None,
            render_task: None,
        });

        let err = supervisor.pump().await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::HandshakeTimeout {
                phase: SessionState::Starting,
                ..
            }
        ));
        assert_eq!(supervisor.state(), SessionState::Idle);
        assert_eq!(device.last_force(), Some(Vec3::zero()));
    }

    #[tokio::test]
    async fn test_force_loop_feeds_worker_continuously() {
        let (device, mut supervisor) = new_supervisor();
        device.set_position(Vec3::new(0.0, 0.0, -0.005));

        supervisor.run("wall").await.unwrap();
        assert_eq!(supervisor.pump().await.unwrap(), Message::Started);

        // Each pump forwards one pipelined force reply to the device.
        for _ in 0..5 {
            pump_until_force(&mut supervisor).await;
        }
        assert!(device.forces().len() >= 5);

        supervisor.stop().await.unwrap();
        pump_until_stopped(&mut supervisor).await;
        assert_eq!(device.last_force(), Some(Vec3::zero()));
    }

    #[tokio::test]
    async fn test_render_loop_draws_nothing_before_first_sample() {
        let markers = Arc::new(Mutex::new(Vec::new()));
        let surface: Arc<Mutex<Box<dyn RenderSurface>>> = Arc::new(Mutex::new(Box::new(
            RecordingSurface {
                markers: Arc::clone(&markers),
            },
        )));
        let last_position = Arc::new(RwLock::new(None));

        let task = Supervisor::render_loop(
            surface,
            Arc::clone(&last_position),
            DrawConfig::default(),
            Duration::from_millis(1),
        );

        // Several render periods with no position sample: no draws.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(markers.lock().unwrap().is_empty());

        *last_position.write().unwrap() = Some(Vec3::zero());
        tokio::time::sleep(Duration::from_millis(20)).await;
        task.abort();

        let drawn = markers.lock().unwrap();
        assert!(!drawn.is_empty());
        assert_eq!(drawn[0].x, 320.0);
        assert_eq!(drawn[0].y, 240.0);
    }

    #[tokio::test]
    async fn test_running_session_renders_markers() {
        let device = Arc::new(SimulatedDevice::new());
        let markers = Arc::new(Mutex::new(Vec::new()));
        let config = SupervisorConfig {
            render_period: Duration::from_millis(2),
            ..SupervisorConfig::default()
        };
        let mut supervisor = Supervisor::with_config(
            Arc::clone(&device) as Arc<dyn DeviceBinding>,
            Box::new(RecordingSurface {
                markers: Arc::clone(&markers),
            }),
            config,
        );
        device.set_position(Vec3::new(0.0, 0.0, 0.01));

        supervisor.run("wall").await.unwrap();
        assert_eq!(supervisor.pump().await.unwrap(), Message::Started);

        // Let the force loop feed positions and the render loop observe them.
        tokio::time::sleep(Duration::from_millis(20)).await;
        supervisor.stop().await.unwrap();
        pump_until_stopped(&mut supervisor).await;

        assert!(!markers.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_reply_leaves_session_running() {
        let (device, mut supervisor) = new_supervisor();

        // A session whose reply channel the test feeds directly.
        let (reply_tx, reply_rx) = mpsc::channel(8);
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let join = tokio::spawn(async move {
            let _keep_alive = cmd_rx;
            std::future::pending::<()>().await
        });
        supervisor.session = Some(Session {
            kind: "stub".to_string(),
            state: SessionState::Running,
            worker: WorkerHandle { cmd_tx, join },
            reply_rx,
            last_position: Arc::new(RwLock::new(None)),
            force_task: None,
            render_task: None,
        });

        reply_tx.send(Message::Unknown).await.unwrap();
        assert_eq!(supervisor.pump().await.unwrap(), Message::Unknown);
        assert_eq!(supervisor.state(), SessionState::Running);
        assert!(device.last_force().is_none());

        // A stray `started` outside the handshake is ignored too.
        reply_tx.send(Message::Started).await.unwrap();
        assert_eq!(supervisor.pump().await.unwrap(), Message::Started);
        assert_eq!(supervisor.state(), SessionState::Running);
    }

    #[tokio::test]
    async fn test_default_registry_listing() {
        let (_, supervisor) = new_supervisor();
        let mut kinds = supervisor.list();
        kinds.sort();
        assert_eq!(kinds, ["scene", "sphere", "tracking", "wall"]);
    }
}
