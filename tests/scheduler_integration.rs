use std::path::Path;
use std::time::Duration;

use image::{Rgb, RgbImage, Rgba, RgbaImage};
use image_cadence::catalog::ImageCatalog;
use image_cadence::events::{CadenceExit, DisplayEvent, Notice};
use image_cadence::scheduler::{ScheduleState, Scheduler, SchedulerOptions};
use image_cadence::stats::StatsSnapshot;
use image_cadence::Error;
use tempfile::tempdir;
use tokio::sync::mpsc::{self, Receiver};
use tokio_util::sync::CancellationToken;

fn write_png(dir: &Path, name: &str) {
    RgbaImage::from_pixel(8, 12, Rgba([200, 10, 10, 255]))
        .save(dir.join(name))
        .unwrap();
}

fn write_jpg(dir: &Path, name: &str) {
    RgbImage::from_pixel(12, 8, Rgb([10, 10, 200]))
        .save(dir.join(name))
        .unwrap();
}

fn scheduler_for(dir: &Path) -> (Scheduler, Receiver<DisplayEvent>, CancellationToken) {
    let (tx, rx) = mpsc::channel(256);
    let shutdown = CancellationToken::new();
    let options = SchedulerOptions {
        seed: Some(7),
        ..Default::default()
    };
    let scheduler = Scheduler::new(ImageCatalog::new(dir), tx, options, shutdown.clone());
    (scheduler, rx, shutdown)
}

async fn next_event(rx: &mut Receiver<DisplayEvent>) -> DisplayEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timeout waiting for display event")
        .expect("display channel closed")
}

async fn next_shown(rx: &mut Receiver<DisplayEvent>) -> String {
    loop {
        if let DisplayEvent::Show(img) = next_event(rx).await {
            return img.name;
        }
    }
}

async fn next_counted_stats(rx: &mut Receiver<DisplayEvent>) -> StatsSnapshot {
    loop {
        if let DisplayEvent::Stats(snap) = next_event(rx).await {
            if snap.displayed > 0 {
                return snap;
            }
        }
    }
}

fn drain(rx: &mut Receiver<DisplayEvent>) -> Vec<DisplayEvent> {
    let mut out = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        out.push(ev);
    }
    out
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn invalid_rates_are_rejected_and_state_stays_idle() {
    let tmp = tempdir().unwrap();
    write_png(tmp.path(), "a.png");
    let (mut scheduler, mut rx, _shutdown) = scheduler_for(tmp.path());

    for err in [
        scheduler.start(0).await.unwrap_err(),
        scheduler.start(-5).await.unwrap_err(),
        scheduler.start("abc").await.unwrap_err(),
    ] {
        assert!(err.is_validation(), "unexpected error: {err:?}");
        assert_eq!(scheduler.state(), ScheduleState::Idle);
    }
    assert!(drain(&mut rx).is_empty(), "rejected start must not emit events");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn start_thirty_per_minute_waits_two_seconds() {
    let tmp = tempdir().unwrap();
    write_png(tmp.path(), "a.png");
    let (mut scheduler, _rx, _shutdown) = scheduler_for(tmp.path());

    scheduler.start(30).await.unwrap();
    assert!(scheduler.state().is_running());
    assert_eq!(scheduler.state().interval_seconds(), Some(2.0));

    assert!(matches!(
        scheduler.start("60").await,
        Err(Error::AlreadyRunning)
    ));

    scheduler.stop().unwrap();
    assert_eq!(scheduler.state(), ScheduleState::Idle);
    assert_eq!(scheduler.state().interval_seconds(), None);
    assert!(matches!(scheduler.stop(), Err(Error::NotRunning)));
    assert_eq!(scheduler.join().await, Some(CadenceExit::Cancelled));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_while_idle_is_rejected() {
    let tmp = tempdir().unwrap();
    let (mut scheduler, _rx, _shutdown) = scheduler_for(tmp.path());
    assert!(matches!(scheduler.stop(), Err(Error::NotRunning)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn start_without_eligible_images_is_refused() {
    let tmp = tempdir().unwrap();
    std::fs::write(tmp.path().join("c.txt"), b"x").unwrap();
    let (mut scheduler, mut rx, _shutdown) = scheduler_for(tmp.path());

    match scheduler.start(60).await {
        Err(Error::CatalogEmpty(dir)) => assert_eq!(dir, tmp.path()),
        other => panic!("expected CatalogEmpty, got {other:?}"),
    }
    assert_eq!(scheduler.state(), ScheduleState::Idle);

    let events = drain(&mut rx);
    assert_eq!(events.len(), 1, "expected a single notice: {events:?}");
    match &events[0] {
        DisplayEvent::Notice(Notice::CatalogExhausted(dir)) => assert_eq!(dir, tmp.path()),
        other => panic!("expected catalog notice, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn undecodable_formats_do_not_count_as_eligible() {
    let tmp = tempdir().unwrap();
    // A real GIF header; this build only recognizes jpg and png.
    std::fs::write(tmp.path().join("dot.gif"), b"GIF89a\x01\x00\x01\x00\x00\x00\x00;").unwrap();
    std::fs::write(tmp.path().join("dot.webp"), b"RIFF\x00\x00\x00\x00WEBP").unwrap();
    let (mut scheduler, _rx, _shutdown) = scheduler_for(tmp.path());

    assert!(matches!(
        scheduler.start(1200).await,
        Err(Error::CatalogEmpty(_))
    ));
    assert_eq!(scheduler.state(), ScheduleState::Idle);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn excluded_image_is_never_shown() {
    let tmp = tempdir().unwrap();
    write_jpg(tmp.path(), "a.jpg");
    write_png(tmp.path(), "b.png");
    std::fs::write(tmp.path().join("c.txt"), b"x").unwrap();
    let (mut scheduler, mut rx, _shutdown) = scheduler_for(tmp.path());

    assert!(scheduler.exclude("a.jpg").await);
    assert!(!scheduler.exclude("a.jpg").await);
    assert_eq!(scheduler.exclusions().len(), 1);

    match next_event(&mut rx).await {
        DisplayEvent::Excludable(items) => {
            let names: Vec<_> = items.iter().map(|i| i.name.as_str()).collect();
            assert_eq!(names, ["b.png"]);
            assert_eq!(items[0].label, "b");
        }
        other => panic!("expected excludable list, got {other:?}"),
    }

    scheduler.start(1200).await.unwrap();
    for _ in 0..20 {
        assert_eq!(next_shown(&mut rx).await, "b.png");
    }
    assert_eq!(scheduler.shutdown().await, Some(CadenceExit::Cancelled));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sixty_per_minute_counts_up_with_monotonic_elapsed() {
    let tmp = tempdir().unwrap();
    write_png(tmp.path(), "a.png");
    write_jpg(tmp.path(), "b.jpg");
    let (mut scheduler, mut rx, _shutdown) = scheduler_for(tmp.path());

    scheduler.start(60).await.unwrap();
    let mut snaps = Vec::new();
    while snaps.len() < 3 {
        snaps.push(next_counted_stats(&mut rx).await);
    }

    for (i, pair) in snaps.windows(2).enumerate() {
        assert!(pair[0].elapsed <= pair[1].elapsed, "elapsed went backwards at {i}");
        assert_eq!(pair[0].displayed + 1, pair[1].displayed);
    }
    assert!(snaps[2].elapsed >= Duration::from_millis(1900));
    assert!(scheduler.stats().displayed >= 3);
    scheduler.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn start_resets_stats() {
    let tmp = tempdir().unwrap();
    write_png(tmp.path(), "a.png");
    let (mut scheduler, mut rx, _shutdown) = scheduler_for(tmp.path());

    scheduler.start(1200).await.unwrap();
    while next_counted_stats(&mut rx).await.displayed < 2 {}
    scheduler.stop().unwrap();
    scheduler.join().await;
    assert!(scheduler.stats().displayed >= 2);
    drain(&mut rx);

    scheduler.start(1).await.unwrap();
    let reset = loop {
        if let DisplayEvent::Stats(snap) = next_event(&mut rx).await {
            break snap;
        }
    };
    assert_eq!(reset.displayed, 0);
    assert_eq!(next_counted_stats(&mut rx).await.displayed, 1);
    scheduler.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_quiesces_display_events() {
    let tmp = tempdir().unwrap();
    write_png(tmp.path(), "a.png");
    let (mut scheduler, mut rx, _shutdown) = scheduler_for(tmp.path());

    scheduler.start(1200).await.unwrap();
    next_shown(&mut rx).await;

    scheduler.stop().unwrap();
    assert_eq!(scheduler.state(), ScheduleState::Idle);
    assert_eq!(scheduler.join().await, Some(CadenceExit::Cancelled));

    drain(&mut rx);
    let late = tokio::time::timeout(Duration::from_millis(300), rx.recv()).await;
    assert!(late.is_err(), "display event after stop: {late:?}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn corrupt_images_are_skipped_without_counting() {
    let tmp = tempdir().unwrap();
    std::fs::write(tmp.path().join("broken.jpg"), b"not really a jpeg").unwrap();
    let (mut scheduler, mut rx, _shutdown) = scheduler_for(tmp.path());

    scheduler.start(1200).await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(scheduler.state().is_running(), "load failures must not end the run");
    assert_eq!(scheduler.stats().displayed, 0);
    assert_eq!(scheduler.shutdown().await, Some(CadenceExit::Cancelled));

    let events = drain(&mut rx);
    assert!(
        events.iter().all(|ev| !matches!(ev, DisplayEvent::Show(_))),
        "corrupt image was shown"
    );
    assert!(events.iter().any(|ev| matches!(ev, DisplayEvent::Excludable(items) if items.is_empty())));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn excluding_everything_mid_run_ends_the_loop() {
    let tmp = tempdir().unwrap();
    write_png(tmp.path(), "a.png");
    let (mut scheduler, mut rx, _shutdown) = scheduler_for(tmp.path());

    scheduler.start(1200).await.unwrap();
    assert_eq!(next_shown(&mut rx).await, "a.png");

    scheduler.exclude("a.png").await;
    loop {
        if let DisplayEvent::Notice(Notice::CatalogExhausted(dir)) = next_event(&mut rx).await {
            assert_eq!(dir, tmp.path());
            break;
        }
    }
    assert_eq!(scheduler.join().await, Some(CadenceExit::CatalogExhausted));
    assert_eq!(scheduler.state(), ScheduleState::Idle);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn application_shutdown_cancels_the_run() {
    let tmp = tempdir().unwrap();
    write_png(tmp.path(), "a.png");
    let (mut scheduler, mut rx, shutdown) = scheduler_for(tmp.path());

    scheduler.start(1).await.unwrap();
    next_shown(&mut rx).await;

    shutdown.cancel();
    assert_eq!(scheduler.state(), ScheduleState::Idle);
    let exit = tokio::time::timeout(Duration::from_secs(2), scheduler.join())
        .await
        .expect("run did not observe shutdown");
    assert_eq!(exit, Some(CadenceExit::Cancelled));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn seeded_runs_repeat_the_same_picks() {
    let tmp = tempdir().unwrap();
    for name in ["a.png", "b.png", "c.png", "d.png"] {
        write_png(tmp.path(), name);
    }
    let (mut scheduler, mut rx, _shutdown) = scheduler_for(tmp.path());

    let mut runs = Vec::new();
    for _ in 0..2 {
        scheduler.start(1200).await.unwrap();
        let mut picks = Vec::new();
        for _ in 0..6 {
            picks.push(next_shown(&mut rx).await);
        }
        scheduler.shutdown().await;
        drain(&mut rx);
        runs.push(picks);
    }
    assert_eq!(runs[0], runs[1]);
}
