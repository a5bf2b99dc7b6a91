use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use testbed_protocol::{BackendKind, SolverControl, TransportError, WorldDescription};
use testbed_runtime::{WorkerHandle, spawn_worker};
use testbed_session::{DebugTextPresenter, SessionConfig, SessionController, SessionError};
use tracing_subscriber::EnvFilter;

type Controller = SessionController<WorkerHandle, DebugTextPresenter>;

#[derive(Parser)]
#[command(name = "testbed-cli", about = "Headless physics testbed")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a demo against a background worker
    Run(RunArgs),
    /// List demos and backends
    List,
    /// Print a demo's world description as JSON
    Describe {
        /// Demo name
        #[arg(short, long)]
        demo: String,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Session configuration file (JSON); flags override its values
    #[arg(long)]
    config: Option<PathBuf>,
    /// Demo name
    #[arg(short, long)]
    demo: Option<String>,
    /// Backend id
    #[arg(short, long)]
    backend: Option<BackendKind>,
    #[arg(long)]
    velocity_iterations: Option<u32>,
    #[arg(long)]
    position_iterations: Option<u32>,
    /// Request debug info with every step
    #[arg(long)]
    debug_infos: bool,
    /// Restart the worker after waiting this long for a result
    #[arg(long)]
    unresponsive_ms: Option<u64>,
    /// Number of render frames to run
    #[arg(short, long, default_value = "120")]
    frames: u64,
    /// Render cadence in milliseconds
    #[arg(long, default_value = "16")]
    frame_ms: u64,
    /// Print the scene every N frames (0: only at the end)
    #[arg(long, default_value = "0")]
    print_every: u64,
    #[arg(long)]
    snapshot_at: Option<u64>,
    #[arg(long)]
    restore_at: Option<u64>,
    #[arg(long)]
    pause_at: Option<u64>,
    #[arg(long)]
    step_at: Option<u64>,
    #[arg(long)]
    resume_at: Option<u64>,
}

impl RunArgs {
    fn session_config(&self) -> anyhow::Result<SessionConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("parsing {}", path.display()))?
            }
            None => SessionConfig::default(),
        };
        if let Some(demo) = &self.demo {
            config.demo = Some(demo.clone());
        }
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
        if let Some(n) = self.velocity_iterations {
            config.velocity_iterations = n;
        }
        if let Some(n) = self.position_iterations {
            config.position_iterations = n;
        }
        if self.debug_infos {
            config.debug_infos = true;
        }
        if self.unresponsive_ms.is_some() {
            config.unresponsive_after_ms = self.unresponsive_ms;
        }
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Run(args) => run(&args)?,
        Commands::List => list(),
        Commands::Describe { demo } => describe(&demo)?,
    }

    Ok(())
}

fn run(args: &RunArgs) -> anyhow::Result<()> {
    let config = args.session_config()?;
    let worker = spawn_worker().context("starting worker")?;
    let mut controller = SessionController::new(
        worker,
        DebugTextPresenter::new(),
        testbed_demos::registry(),
        config,
        Instant::now(),
    )?;
    println!(
        "Running {} on {} for {} frames",
        current_demo(&controller),
        controller.session().backend,
        args.frames
    );

    let frame = Duration::from_millis(args.frame_ms);
    for n in 0..args.frames {
        let now = Instant::now();
        apply_controls(&mut controller, args, n)?;

        match controller.poll(now) {
            Ok(_) => {}
            Err(SessionError::Transport(TransportError::Disconnected)) => {
                tracing::warn!(frame = n, "worker gone, restarting");
                restart(&mut controller, now)?;
            }
            Err(err) => return Err(err.into()),
        }
        if controller.is_unresponsive() {
            restart(&mut controller, now)?;
        }

        if args.print_every > 0 && n % args.print_every == 0 {
            print!("{}", controller.presenter().render());
        }
        thread::sleep(frame.saturating_sub(now.elapsed()));
    }

    print!("{}", controller.presenter().render());
    let timings = controller.timings();
    println!(
        "Steps: {} advanced, {} sampled, avg {:.3} ms, max {:.3} ms",
        timings.steps(),
        timings.count(),
        timings.average_ms(),
        timings.max_ms()
    );

    let (worker, _) = controller.into_parts();
    worker.shutdown()?;
    Ok(())
}

fn apply_controls(controller: &mut Controller, args: &RunArgs, n: u64) -> anyhow::Result<()> {
    let at = |frame: Option<u64>| frame == Some(n);
    if at(args.snapshot_at) {
        controller.take_snapshot()?;
        println!("[frame {n}] snapshot");
    }
    if at(args.restore_at) {
        controller.restore_snapshot()?;
        println!("[frame {n}] restore");
    }
    if at(args.pause_at) {
        controller.pause();
        println!("[frame {n}] pause");
    }
    if at(args.step_at) {
        controller.step_once();
        println!("[frame {n}] step");
    }
    if at(args.resume_at) {
        controller.resume();
        println!("[frame {n}] resume");
    }
    Ok(())
}

/// Replace the background with a fresh worker. The old one is detached, not
/// joined, since it may never return.
fn restart(controller: &mut Controller, now: Instant) -> anyhow::Result<()> {
    let worker = spawn_worker().context("restarting worker")?;
    let old = controller.replace_port(worker, now)?;
    drop(old);
    println!("Worker restarted (token {})", controller.active_token().0);
    Ok(())
}

fn current_demo(controller: &Controller) -> &str {
    let index = controller.session().demo;
    controller
        .demos()
        .get(index)
        .map(|d| d.name())
        .unwrap_or("?")
}

fn list() {
    println!("Demos:");
    for (i, name) in testbed_demos::registry().names().enumerate() {
        println!("  {i}: {name}");
    }
    println!("Backends:");
    for kind in BackendKind::ALL {
        let caps = kind.capabilities();
        println!(
            "  {kind}: velocity iterations {}, position iterations {}",
            describe_control(caps.velocity_iterations),
            describe_control(caps.position_iterations)
        );
    }
}

fn describe_control(control: SolverControl) -> String {
    match control {
        SolverControl::Adjustable { min, max } => format!("{min}..={max}"),
        SolverControl::Fixed(n) => format!("fixed at {n}"),
    }
}

fn describe(name: &str) -> anyhow::Result<()> {
    let registry = testbed_demos::registry();
    let index = registry
        .find(name)
        .with_context(|| format!("unknown demo `{name}`"))?;
    let demo = registry
        .get(index)
        .with_context(|| format!("unknown demo `{name}`"))?;
    let built = demo.build()?;
    let description = WorldDescription::encode(&built.world);
    println!("{}", serde_json::to_string_pretty(&description)?);
    Ok(())
}
