use anyhow::Result;
use thiserror::Error;
use tokio::select;
use tokio::sync::mpsc::Receiver;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::scheduler::Scheduler;

/// One user action from the control surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    /// Raw rate text; validated by the scheduler.
    Start(String),
    Stop,
    Exclude(String),
    Status,
    List,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command {0:?} (try: start <rate>, stop, exclude <name>, status, list, quit)")]
    Unknown(String),
    #[error("{0} needs an argument")]
    MissingArgument(&'static str),
}

/// Parse a text line such as `start 30` or `exclude beach.jpg`.
///
/// The verb is case-insensitive; the argument is kept verbatim (trimmed) so
/// filenames with spaces survive.
pub fn parse_command(line: &str) -> Result<ControlCommand, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(CommandError::Empty);
    }
    let (verb, arg) = match line.split_once(char::is_whitespace) {
        Some((verb, arg)) => (verb, arg.trim()),
        None => (line, ""),
    };
    let required = |what: &'static str| {
        if arg.is_empty() {
            Err(CommandError::MissingArgument(what))
        } else {
            Ok(arg.to_owned())
        }
    };
    match verb.to_ascii_lowercase().as_str() {
        "start" => required("start").map(ControlCommand::Start),
        "exclude" => required("exclude").map(ControlCommand::Exclude),
        "stop" => Ok(ControlCommand::Stop),
        "status" => Ok(ControlCommand::Status),
        "list" => Ok(ControlCommand::List),
        "quit" | "exit" => Ok(ControlCommand::Quit),
        _ => Err(CommandError::Unknown(verb.to_owned())),
    }
}

/// Owns the scheduler and applies commands one at a time.
///
/// Exits on `Quit`, when the command channel closes, or on cancellation.
/// `Quit` and a closed channel cancel `cancel` so the rest of the app follows.
pub async fn run(
    mut scheduler: Scheduler,
    mut commands: Receiver<ControlCommand>,
    cancel: CancellationToken,
) -> Result<()> {
    loop {
        select! {
            _ = cancel.cancelled() => break,
            maybe_cmd = commands.recv() => match maybe_cmd {
                Some(ControlCommand::Quit) => {
                    info!("quit requested; initiating shutdown");
                    cancel.cancel();
                    break;
                }
                Some(cmd) => apply(&mut scheduler, cmd).await,
                None => {
                    info!("control input closed; initiating shutdown");
                    cancel.cancel();
                    break;
                }
            }
        }
    }
    scheduler.shutdown().await;
    Ok(())
}

async fn apply(scheduler: &mut Scheduler, cmd: ControlCommand) {
    match cmd {
        ControlCommand::Start(rate) => {
            if let Err(err) = scheduler.start(rate).await {
                warn!("start rejected: {err}");
            }
        }
        ControlCommand::Stop => {
            if let Err(err) = scheduler.stop() {
                warn!("stop rejected: {err}");
            }
        }
        ControlCommand::Exclude(name) => {
            scheduler.exclude(name).await;
        }
        ControlCommand::Status => {
            let state = scheduler.state();
            let stats = scheduler.stats();
            info!(
                running = state.is_running(),
                rate = state.rate().map(|r| r.get()),
                excluded = scheduler.exclusions().len(),
                "{stats}"
            );
        }
        ControlCommand::List => {
            let entries = scheduler
                .catalog()
                .list_all(&scheduler.exclusions().snapshot());
            if entries.is_empty() {
                info!(dir = %scheduler.catalog().dir().display(), "no images found");
            }
            for entry in entries {
                info!(name = %entry.name, excluded = entry.excluded, "image");
            }
        }
        ControlCommand::Quit => {}
    }
}
