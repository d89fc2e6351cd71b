//! Run/stop state machine around the cadence loop.
//!
//! The [`Scheduler`] lives in the control context and is the only writer of
//! the exclusion set. Each `start` spawns one cadence task with its own child
//! [`CancellationToken`]; `stop` cancels that token and the task winds down at
//! its next suspension point.

use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::{mpsc::Sender, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::catalog::ImageCatalog;
use crate::error::{Error, RateRejection};
use crate::events::{CadenceExit, DisplayEvent, Notice};
use crate::exclusion::ExclusionSet;
use crate::loader::{self, FrameSizes};
use crate::stats::{Stats, StatsSnapshot};
use crate::tasks::cadence::{self, CadenceRun};

/// Raw rate as typed by the user or passed programmatically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateInput {
    Text(String),
    Number(i64),
}

impl From<&str> for RateInput {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for RateInput {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for RateInput {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for RateInput {
    fn from(n: i32) -> Self {
        Self::Number(i64::from(n))
    }
}

impl From<u32> for RateInput {
    fn from(n: u32) -> Self {
        Self::Number(i64::from(n))
    }
}

/// Images shown per minute; always at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RatePerMinute(NonZeroU32);

impl RatePerMinute {
    #[must_use]
    pub const fn new(per_minute: u32) -> Option<Self> {
        match NonZeroU32::new(per_minute) {
            Some(n) => Some(Self(n)),
            None => None,
        }
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    /// Pause between two displays: `60 / rate` seconds.
    #[must_use]
    pub fn interval(self) -> Duration {
        Duration::from_secs_f64(60.0 / f64::from(self.get()))
    }
}

impl fmt::Display for RatePerMinute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/min", self.get())
    }
}

impl TryFrom<RateInput> for RatePerMinute {
    type Error = Error;

    fn try_from(input: RateInput) -> Result<Self, Self::Error> {
        let reject = |input: String, reason| Error::Validation { input, reason };
        let n = match input {
            RateInput::Text(text) => match text.trim().parse::<i64>() {
                Ok(n) => n,
                Err(_) => return Err(reject(text, RateRejection::NotANumber)),
            },
            RateInput::Number(n) => n,
        };
        if n <= 0 {
            return Err(reject(n.to_string(), RateRejection::NotPositive));
        }
        u32::try_from(n)
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| reject(n.to_string(), RateRejection::TooLarge))
    }
}

impl FromStr for RatePerMinute {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(RateInput::from(s))
    }
}

/// Externally visible scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleState {
    Idle,
    Running { rate: RatePerMinute },
}

impl ScheduleState {
    #[must_use]
    pub const fn is_running(&self) -> bool {
        matches!(self, Self::Running { .. })
    }

    #[must_use]
    pub const fn rate(&self) -> Option<RatePerMinute> {
        match self {
            Self::Running { rate } => Some(*rate),
            Self::Idle => None,
        }
    }

    /// Defined only while running.
    #[must_use]
    pub fn interval(&self) -> Option<Duration> {
        self.rate().map(RatePerMinute::interval)
    }

    #[must_use]
    pub fn interval_seconds(&self) -> Option<f64> {
        self.interval().map(|d| d.as_secs_f64())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SchedulerOptions {
    pub sizes: FrameSizes,
    /// Fixed RNG seed; each run restarts the same sequence.
    pub seed: Option<u64>,
}

struct ActiveRun {
    rate: RatePerMinute,
    cancel: CancellationToken,
    handle: JoinHandle<anyhow::Result<CadenceExit>>,
}

pub struct Scheduler {
    catalog: ImageCatalog,
    exclusions: ExclusionSet,
    options: SchedulerOptions,
    to_display: Sender<DisplayEvent>,
    shutdown: CancellationToken,
    run: Option<ActiveRun>,
    stats_rx: watch::Receiver<StatsSnapshot>,
}

impl Scheduler {
    /// `shutdown` is the application-wide token; every run uses a child of it.
    pub fn new(
        catalog: ImageCatalog,
        to_display: Sender<DisplayEvent>,
        options: SchedulerOptions,
        shutdown: CancellationToken,
    ) -> Self {
        let (_stats_tx, stats_rx) = watch::channel(StatsSnapshot::default());
        Self {
            catalog,
            exclusions: ExclusionSet::new(),
            options,
            to_display,
            shutdown,
            run: None,
            stats_rx,
        }
    }

    #[must_use]
    pub fn state(&self) -> ScheduleState {
        match &self.run {
            Some(run) if !run.cancel.is_cancelled() && !run.handle.is_finished() => {
                ScheduleState::Running { rate: run.rate }
            }
            _ => ScheduleState::Idle,
        }
    }

    /// Stats of the current (or last) run.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        *self.stats_rx.borrow()
    }

    #[must_use]
    pub const fn catalog(&self) -> &ImageCatalog {
        &self.catalog
    }

    #[must_use]
    pub const fn exclusions(&self) -> &ExclusionSet {
        &self.exclusions
    }

    /// Validate `rate` and begin a cadence run.
    ///
    /// # Errors
    /// - [`Error::AlreadyRunning`] if a run is active.
    /// - [`Error::Validation`] if `rate` is not a positive integer.
    /// - [`Error::CatalogEmpty`] if no image is eligible; the display sink
    ///   also receives [`Notice::CatalogExhausted`].
    ///
    /// The state is left `Idle` on every error.
    pub async fn start(&mut self, rate: impl Into<RateInput>) -> Result<(), Error> {
        if self.state().is_running() {
            return Err(Error::AlreadyRunning);
        }
        let rate = RatePerMinute::try_from(rate.into())?;

        // A stopped run may still be finishing its last iteration.
        if let Some(prev) = self.run.take() {
            prev.cancel.cancel();
            finish(prev).await;
        }

        if self
            .catalog
            .list_eligible(&self.exclusions.snapshot())
            .is_empty()
        {
            let dir = self.catalog.dir().to_path_buf();
            let notice = Notice::CatalogExhausted(dir.clone());
            let _ = self.to_display.send(DisplayEvent::Notice(notice)).await;
            return Err(Error::CatalogEmpty(dir));
        }

        self.refresh_excludable().await;

        let stats = Stats::start();
        let (stats_tx, stats_rx) = watch::channel(stats.snapshot());
        self.stats_rx = stats_rx;
        let _ = self
            .to_display
            .send(DisplayEvent::Stats(stats.snapshot()))
            .await;

        let rng = match self.options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let interval = rate.interval();
        let cancel = self.shutdown.child_token();
        let handle = tokio::spawn(cadence::run(
            CadenceRun {
                catalog: self.catalog.clone(),
                exclusions: self.exclusions.reader(),
                interval,
                sizes: self.options.sizes,
                stats,
                stats_tx,
                to_display: self.to_display.clone(),
                rng,
            },
            cancel.clone(),
        ));
        self.run = Some(ActiveRun {
            rate,
            cancel,
            handle,
        });
        info!(%rate, interval_secs = interval.as_secs_f64(), "cadence run started");
        Ok(())
    }

    /// Request the active run to stop.
    ///
    /// The state turns `Idle` immediately; the loop exits once its in-flight
    /// iteration completes.
    ///
    /// # Errors
    /// Returns [`Error::NotRunning`] if no run is active.
    pub fn stop(&mut self) -> Result<(), Error> {
        match &self.run {
            Some(run) if self.state().is_running() => {
                run.cancel.cancel();
                info!(displayed = self.stats().displayed, "cadence run stop requested");
                Ok(())
            }
            _ => Err(Error::NotRunning),
        }
    }

    /// Exclude `name` for the rest of the session and redraw the excludable list.
    ///
    /// Returns `false` if the name was already excluded.
    pub async fn exclude(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        let changed = self.exclusions.exclude(name.clone());
        if changed {
            info!(%name, total = self.exclusions.len(), "image excluded");
        } else {
            debug!(%name, "already excluded");
        }
        self.refresh_excludable().await;
        changed
    }

    /// Send thumbnails of every still-excludable image to the display sink.
    pub async fn refresh_excludable(&self) {
        let entries = self.catalog.list_eligible(&self.exclusions.snapshot());
        let sizes = self.options.sizes;
        let built = tokio::task::spawn_blocking(move || {
            entries
                .iter()
                .filter_map(|entry| match loader::load_thumbnail(entry, sizes) {
                    Ok(item) => Some(item),
                    Err(err) => {
                        warn!(name = %entry.name, "no thumbnail: {:#}", anyhow::Error::from(err));
                        None
                    }
                })
                .collect::<Vec<_>>()
        })
        .await;
        match built {
            Ok(items) => {
                let _ = self.to_display.send(DisplayEvent::Excludable(items)).await;
            }
            Err(err) => warn!("thumbnail task failed: {err}"),
        }
    }

    /// Wait for the current run to end on its own (exhausted catalog, closed
    /// sink, or a prior `stop`). Never returns while a run keeps going.
    pub async fn join(&mut self) -> Option<CadenceExit> {
        let run = self.run.take()?;
        finish(run).await
    }

    /// Stop any active run and wait until its task has exited.
    pub async fn shutdown(&mut self) -> Option<CadenceExit> {
        let run = self.run.take()?;
        run.cancel.cancel();
        finish(run).await
    }
}

async fn finish(run: ActiveRun) -> Option<CadenceExit> {
    match run.handle.await {
        Ok(Ok(exit)) => {
            debug!(?exit, "cadence task exited");
            Some(exit)
        }
        Ok(Err(err)) => {
            warn!("cadence task failed: {err:#}");
            None
        }
        Err(err) => {
            warn!("cadence task panicked or was aborted: {err}");
            None
        }
    }
}
