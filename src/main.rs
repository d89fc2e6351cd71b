//! Binary entrypoint for image-cadence.
//!
//! Wires a stdin control surface and a stdout display sink around the library.

use std::io::{self, BufRead};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{Level, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use image_cadence::config::Configuration;
use image_cadence::events::DisplayEvent;
use image_cadence::scheduler::Scheduler;
use image_cadence::tasks::{self, control::ControlCommand};

#[derive(Debug, Parser)]
#[command(
    name = "image-cadence",
    version,
    about = "Show a random image from a folder at a steady rate"
)]
struct Cli {
    /// Optional YAML config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the image directory
    #[arg(long, value_name = "DIR")]
    image_dir: Option<PathBuf>,

    /// Deterministic RNG seed for image selection
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    // map -v to log level
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env().add_directive(
        format!("image_cadence={level}")
            .parse()
            .context("building log filter")?,
    );
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();
    Ok(())
}

fn load_config(cli: &Cli) -> Result<Configuration> {
    let mut cfg = match &cli.config {
        Some(path) => Configuration::from_yaml_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Configuration::default(),
    };
    if let Some(dir) = &cli.image_dir {
        cfg.image_dir = Some(dir.clone());
    }
    if cli.seed.is_some() {
        cfg.rng_seed = cli.seed;
    }
    cfg.validated().context("validating configuration")
}

// Blocking stdin reader on its own thread so a pending read never holds up
// runtime shutdown.
fn spawn_stdin_reader(to_control: mpsc::Sender<ControlCommand>) -> Result<()> {
    std::thread::Builder::new()
        .name("stdin-control".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(err) => {
                        warn!("stdin read failed: {err}");
                        break;
                    }
                };
                match tasks::control::parse_command(&line) {
                    Ok(cmd) => {
                        if to_control.blocking_send(cmd).is_err() {
                            break;
                        }
                    }
                    Err(err) => warn!("{err}"),
                }
            }
        })
        .context("spawning stdin reader")?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let cfg = load_config(&cli)?;
    let catalog = cfg.catalog();
    info!(dir = %catalog.dir().display(), "watching image directory");

    let (display_tx, display_rx) = mpsc::channel::<DisplayEvent>(cfg.sink_capacity); // Scheduler -> Viewer
    let (control_tx, control_rx) = mpsc::channel::<ControlCommand>(16); // Stdin -> Control

    let cancel = CancellationToken::new();

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!("ctrl-c handler failed: {err}");
                return;
            }
            info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    spawn_stdin_reader(control_tx)?;
    println!("commands: start <images per minute> | stop | exclude <file name> | status | list | quit");

    let scheduler = Scheduler::new(
        catalog,
        display_tx,
        cfg.scheduler_options(),
        cancel.clone(),
    );

    let mut tasks = JoinSet::new();

    // Control surface
    tasks.spawn({
        let cancel = cancel.clone();
        async move {
            tasks::control::run(scheduler, control_rx, cancel)
                .await
                .context("control task failed")
        }
    });

    // Display sink
    tasks.spawn({
        let cancel = cancel.clone();
        async move {
            tasks::viewer::run(display_rx, cancel)
                .await
                .context("viewer task failed")
        }
    });

    while let Some(res) = tasks.join_next().await {
        match res {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("task error: {e:?}"),
            Err(e) => tracing::error!("join error: {e}"),
        }
        // Either task ending means the session is over.
        cancel.cancel();
    }

    Ok(())
}
