//! `raywarden-cli` – Raywarden process driver
//!
//! This binary is the entry point for the collision avoidance service. It:
//!
//! 1. Loads and validates the TOML configuration (`--config`).
//! 2. Starts the health endpoint and the WebSocket bridge.
//! 3. Builds one tick loop per work area, tracking the worker named by
//!    `--id`, and feeds each from the bridge's telemetry.
//! 4. Rebuilds every tick loop from a fresh config read on **SIGHUP**.
//! 5. Intercepts **Ctrl-C** / SIGTERM to stop the tick loops and exit.
//!
//! Any fatal error (bad configuration, failed tick, server bind failure) is
//! logged and ends the process with a non-zero status.

mod config;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{error, info, warn};

use raywarden_health::HealthServer;
use raywarden_middleware::{BusTransport, EventBus, Transport, WsBridge};
use raywarden_runtime::{InboundFilter, TickLoop, ingest, init_tracing};
use raywarden_types::RayError;
use raywarden_types::config::RaywardenConfig;

/// CLI arguments
#[derive(Parser, Debug, Clone)]
#[command(name = "raywarden")]
#[command(about = "Raycasting collision avoidance between workers and robot arms")]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long, default_value_os_t = config::default_config_path())]
    config: PathBuf,

    /// Id of the tracked worker
    #[arg(short, long)]
    id: String,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Tracing is installed before the Tokio runtime exists; the OTLP exporter
    // is built for that order.
    let _guard = init_tracing("raywarden");

    print_banner();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "failed to start async runtime");
            return ExitCode::FAILURE;
        }
    };

    // ── Ctrl-C / SIGTERM handler ──────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);
    let shutdown_ctrlc = Arc::clone(&shutdown_tx);
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Shutdown requested – stopping tick loops …".yellow().bold());
        let _ = shutdown_ctrlc.send(true);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; graceful shutdown on Ctrl-C will not be available");
    }

    match runtime.block_on(run(args, shutdown_rx)) {
        Ok(()) => {
            println!("{}", "  ✓ Raywarden stopped.".green());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "fatal error; exiting");
            eprintln!("{}: {}", "Fatal".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Supervisor
// ─────────────────────────────────────────────────────────────────────────────

enum Wake {
    EngineExited(Result<(), RayError>),
    ServerExited(&'static str, Result<Result<(), RayError>, tokio::task::JoinError>),
    Reload,
    Shutdown,
}

async fn run(args: Args, mut shutdown: watch::Receiver<bool>) -> Result<(), RayError> {
    let mut cfg = config::load_from(&args.config)?;
    println!(
        "  Config loaded from {} ({} work area(s))",
        args.config.display().to_string().bold(),
        cfg.workareas.len()
    );

    let bus = Arc::new(EventBus::default());

    // Servers bind once and survive reloads.
    let mut health: JoinHandle<Result<(), RayError>> =
        tokio::spawn(HealthServer::new().with_port(cfg.health.port).run());
    let bridge_addr = SocketAddr::from(([0, 0, 0, 0], cfg.bridge.port));
    let mut bridge: JoinHandle<Result<(), RayError>> =
        tokio::spawn(WsBridge::new(Arc::clone(&bus)).run_ws_server(bridge_addr));
    let mut reload = ReloadSignal::new()?;

    let outcome = loop {
        let mut engine = Engine::start(&cfg, &args.id, &bus).await?;

        let wake = tokio::select! {
            res = engine.next_failure() => Wake::EngineExited(res),
            res = &mut health => Wake::ServerExited("health", res),
            res = &mut bridge => Wake::ServerExited("bridge", res),
            _ = reload.recv() => Wake::Reload,
            _ = shutdown.changed() => Wake::Shutdown,
        };

        match wake {
            Wake::Reload => {
                info!("reload signal received; rebuilding tick loops");
                engine.stop().await;
                cfg = config::load_from(&args.config)?;
            }
            Wake::Shutdown => {
                engine.stop().await;
                break Ok(());
            }
            Wake::EngineExited(res) => break res,
            Wake::ServerExited(name, res) => {
                engine.stop().await;
                break match res {
                    Ok(Ok(())) => Err(RayError::Transport(format!("{name} server stopped"))),
                    Ok(Err(e)) => Err(e),
                    Err(e) => Err(RayError::Channel(format!("{name} server task failed: {e}"))),
                };
            }
        }
    };

    health.abort();
    bridge.abort();
    outcome
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine: every tick loop and ingestion task built from one config read
// ─────────────────────────────────────────────────────────────────────────────

struct Engine {
    stop: watch::Sender<bool>,
    ticks: JoinSet<Result<(), RayError>>,
    ingest: JoinSet<usize>,
}

impl Engine {
    async fn start(cfg: &RaywardenConfig, personnel_id: &str, bus: &Arc<EventBus>) -> Result<Self, RayError> {
        let (stop, stop_rx) = watch::channel(false);
        let mut ticks = JoinSet::new();
        let mut ingest_tasks = JoinSet::new();

        for workarea in &cfg.workareas {
            let protocol = workarea
                .protocol
                .as_ref()
                .ok_or_else(|| RayError::Config(format!("workarea '{}': missing protocol section", workarea.id)))?;
            let publisher = protocol
                .control_publisher()
                .cloned()
                .ok_or_else(|| RayError::Config(format!("workarea '{}': no control publisher", workarea.id)))?;

            let transport = Arc::new(BusTransport::new(Arc::clone(bus), publisher));
            transport.connect().await?;
            // Subscribe before the tick loop exists so no frame is missed.
            let frames = transport.frames().await;

            let (tick_loop, handle) = TickLoop::from_config(workarea, personnel_id, transport)?;
            let filter = InboundFilter::from_protocol(protocol, personnel_id);
            info!(
                workarea = %workarea.id,
                obstacles = tick_loop.detector().scene().len(),
                interval = ?tick_loop.interval(),
                "work area ready"
            );

            ingest_tasks.spawn(ingest(frames, filter, handle));
            ticks.spawn(tick_loop.run(stop_rx.clone()));
        }

        Ok(Self {
            stop,
            ticks,
            ingest: ingest_tasks,
        })
    }

    /// Resolve when a tick loop fails or every tick loop has finished.
    async fn next_failure(&mut self) -> Result<(), RayError> {
        while let Some(joined) = self.ticks.join_next().await {
            match joined {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => return Err(e),
                Err(e) => return Err(RayError::Channel(format!("tick loop task failed: {e}"))),
            }
        }
        Ok(())
    }

    /// Signal every tick loop, wait for them, then drop ingestion.
    async fn stop(mut self) {
        let _ = self.stop.send(true);
        while let Some(joined) = self.ticks.join_next().await {
            if let Ok(Err(e)) = joined {
                warn!(error = %e, "tick loop failed while stopping");
            }
        }
        self.ingest.abort_all();
        while self.ingest.join_next().await.is_some() {}
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Reload signal
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(unix)]
struct ReloadSignal(tokio::signal::unix::Signal);

#[cfg(unix)]
impl ReloadSignal {
    fn new() -> Result<Self, RayError> {
        use tokio::signal::unix::{SignalKind, signal};
        signal(SignalKind::hangup())
            .map(Self)
            .map_err(|e| RayError::Io(format!("failed to install SIGHUP handler: {e}")))
    }

    async fn recv(&mut self) {
        if self.0.recv().await.is_none() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
struct ReloadSignal;

#[cfg(not(unix))]
impl ReloadSignal {
    fn new() -> Result<Self, RayError> {
        Ok(Self)
    }

    async fn recv(&mut self) {
        std::future::pending::<()>().await;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("  {} {}",
        "Raywarden".bold().cyan(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Raycasting collision avoidance");
    println!();
}
