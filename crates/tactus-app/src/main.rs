//! Tactus Application
//!
//! Command-line host for the haptic session engine. Runs a named
//! simulation against the simulated device, driving it along a scripted
//! path through the workspace while the supervisor's control loops do the
//! real work.
//!
//! # Usage
//!
//! ```bash
//! # List the registered simulation kinds
//! tactus list
//!
//! # Run the virtual wall for ten seconds
//! tactus run wall --duration 10
//! ```

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::time::interval;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use tactus_core::{Message, Vec3};
use tactus_session::{
    DeviceBinding, SessionState, SimulatedDevice, SimulationRegistry, Supervisor,
    SupervisorConfig, TraceSurface,
};

/// Tactus haptic session engine
#[derive(Parser, Debug)]
#[command(name = "tactus")]
#[command(author, version, about = "Haptic force-feedback session engine", long_about = None)]
struct Cli {
    /// Logging verbosity level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a simulation session against the simulated device
    Run {
        /// Simulation kind (see `tactus list`)
        kind: String,

        /// How long to run, in seconds
        #[arg(short, long, default_value = "10")]
        duration: u64,

        /// Force loop period, in milliseconds
        #[arg(long, default_value = "1")]
        force_period_ms: u64,

        /// Render loop period, in milliseconds
        #[arg(long, default_value = "30")]
        render_period_ms: u64,
    },

    /// List the registered simulation kinds
    List,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("tactus v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::List => {
            let mut kinds = SimulationRegistry::standard().list();
            kinds.sort();
            for kind in kinds {
                println!("{kind}");
            }
            Ok(())
        }
        Commands::Run {
            kind,
            duration,
            force_period_ms,
            render_period_ms,
        } => {
            let config = SupervisorConfig {
                force_period: Duration::from_millis(force_period_ms),
                render_period: Duration::from_millis(render_period_ms),
                ..SupervisorConfig::default()
            };
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_session(&kind, Duration::from_secs(duration), config))
        }
    }
}

/// Run one simulation session to completion.
async fn run_session(kind: &str, duration: Duration, config: SupervisorConfig) -> anyhow::Result<()> {
    let device = Arc::new(SimulatedDevice::new());
    let mut supervisor = Supervisor::with_config(
        Arc::clone(&device) as Arc<dyn DeviceBinding>,
        Box::new(TraceSurface::new()),
        config,
    );

    let motion = tokio::spawn(sweep_device(Arc::clone(&device)));

    if let Err(err) = supervisor.run(kind).await {
        motion.abort();
        return Err(err.into());
    }

    let deadline = tokio::time::sleep(duration);
    tokio::pin!(deadline);

    let mut forwarded: u64 = 0;
    loop {
        tokio::select! {
            _ = &mut deadline => {
                info!("session duration elapsed");
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
            result = supervisor.pump() => {
                match result {
                    Ok(Message::Force { .. }) => forwarded += 1,
                    Ok(_) => {}
                    Err(err) => {
                        warn!(%err, "session ended abnormally");
                        break;
                    }
                }
            }
        }
    }

    if let Err(err) = supervisor.stop().await {
        warn!(%err, "stop request failed");
    }
    while supervisor.state() != SessionState::Idle {
        if supervisor.pump().await.is_err() {
            break;
        }
    }
    motion.abort();

    info!(
        forwarded,
        last_force = ?device.last_force(),
        "session closed"
    );
    Ok(())
}

/// Sweep the simulated device through the workspace on a Lissajous path,
/// standing in for a person moving the physical stylus.
async fn sweep_device(device: Arc<SimulatedDevice>) {
    let mut ticker = interval(Duration::from_millis(2));
    let mut t: f64 = 0.0;
    loop {
        ticker.tick().await;
        t += 0.002;
        device.set_position(Vec3::new(
            0.03 * (0.7 * t).sin(),
            0.03 * (1.1 * t).cos(),
            0.03 * (1.3 * t).sin(),
        ));
    }
}
