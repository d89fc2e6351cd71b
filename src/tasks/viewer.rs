use crate::events::{DisplayEvent, Notice};
use anyhow::Result;
use tokio::select;
use tokio::sync::mpsc::Receiver;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Text display sink: one line per event on stdout.
pub async fn run(
    mut from_scheduler: Receiver<DisplayEvent>,
    cancel: CancellationToken,
) -> Result<()> {
    loop {
        select! {
            _ = cancel.cancelled() => break,
            maybe_ev = from_scheduler.recv() => match maybe_ev {
                Some(ev) => println!("{}", describe(&ev)),
                None => {
                    debug!("display channel closed");
                    break;
                }
            }
        }
    }
    Ok(())
}

#[must_use]
pub fn describe(ev: &DisplayEvent) -> String {
    match ev {
        DisplayEvent::Show(img) => format!(
            "showing {} ({}x{})",
            img.name, img.frame.width, img.frame.height
        ),
        DisplayEvent::Stats(stats) => stats.to_string(),
        DisplayEvent::Excludable(items) if items.is_empty() => "excludable: (none)".to_string(),
        DisplayEvent::Excludable(items) => {
            let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();
            format!("excludable: {}", labels.join(", "))
        }
        DisplayEvent::Notice(Notice::CatalogExhausted(dir)) => format!(
            "No image files found in {} or all images are excluded.",
            dir.display()
        ),
    }
}
