use std::time::Duration;

use anyhow::Result;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use tokio::select;
use tokio::sync::{mpsc::Sender, watch};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::catalog::ImageCatalog;
use crate::events::{CadenceExit, DisplayEvent, Notice};
use crate::exclusion::ExclusionReader;
use crate::loader::{self, FrameSizes};
use crate::stats::{Stats, StatsSnapshot};

/// Everything one cadence run needs, moved onto its task at spawn time.
pub struct CadenceRun {
    pub catalog: ImageCatalog,
    pub exclusions: ExclusionReader,
    pub interval: Duration,
    pub sizes: FrameSizes,
    pub stats: Stats,
    pub stats_tx: watch::Sender<StatsSnapshot>,
    pub to_display: Sender<DisplayEvent>,
    pub rng: StdRng,
}

/// Pick, load, show, count, sleep; until cancelled or nothing is left.
///
/// Rules:
/// - The exclusion set is re-read on every iteration.
/// - A file that fails to load is skipped without counting; the interval is
///   still waited out.
/// - Cancellation interrupts the sleep. A load or send already under way
///   finishes first.
#[instrument(
    skip_all,
    fields(dir = %run.catalog.dir().display(), interval_ms = run.interval.as_millis())
)]
pub async fn run(run: CadenceRun, cancel: CancellationToken) -> Result<CadenceExit> {
    let CadenceRun {
        catalog,
        exclusions,
        interval,
        sizes,
        mut stats,
        stats_tx,
        to_display,
        mut rng,
    } = run;

    info!("cadence loop started");
    loop {
        if cancel.is_cancelled() {
            break;
        }

        let snapshot = exclusions.snapshot();
        let pick = {
            let eligible = catalog.list_eligible(&snapshot);
            eligible.choose(&mut rng).cloned()
        };
        let Some(entry) = pick else {
            info!(excluded = snapshot.len(), "no eligible images left; stopping");
            let notice = Notice::CatalogExhausted(catalog.dir().to_path_buf());
            let _ = to_display.send(DisplayEvent::Notice(notice)).await;
            return Ok(CadenceExit::CatalogExhausted);
        };
        debug!(name = %entry.name, "picked");

        let loaded = tokio::task::spawn_blocking({
            let entry = entry.clone();
            move || loader::load_for_display(&entry, sizes)
        })
        .await?;

        match loaded {
            Ok(prepared) => {
                if to_display.send(DisplayEvent::Show(prepared)).await.is_err() {
                    warn!("display channel closed");
                    return Ok(CadenceExit::SinkClosed);
                }
                stats.record_display();
                let snap = stats.snapshot();
                stats_tx.send_replace(snap);
                if to_display.send(DisplayEvent::Stats(snap)).await.is_err() {
                    warn!("display channel closed");
                    return Ok(CadenceExit::SinkClosed);
                }
            }
            Err(err) => {
                warn!(name = %entry.name, "skipping image: {:#}", anyhow::Error::from(err));
            }
        }

        select! {
            _ = cancel.cancelled() => break,
            _ = sleep(interval) => {}
        }
    }

    info!(displayed = stats.displayed(), "cadence loop cancelled");
    Ok(CadenceExit::Cancelled)
}
