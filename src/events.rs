use std::path::PathBuf;

use crate::stats::StatsSnapshot;

/// Decoded RGBA8 pixels ready to be drawn.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub name: String,
    pub path: PathBuf,
    pub frame: Frame,
}

/// One entry of the "click to exclude" strip.
#[derive(Debug, Clone)]
pub struct ExcludableItem {
    /// Filename passed back to `exclude`.
    pub name: String,
    /// Filename without its extension.
    pub label: String,
    pub thumbnail: Frame,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Every image is excluded or the directory has none left.
    CatalogExhausted(PathBuf),
}

/// Everything the scheduler asks the display sink to render.
#[derive(Debug, Clone)]
pub enum DisplayEvent {
    Show(PreparedImage),
    Stats(StatsSnapshot),
    Excludable(Vec<ExcludableItem>),
    Notice(Notice),
}

/// Why a cadence loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CadenceExit {
    Cancelled,
    CatalogExhausted,
    SinkClosed,
}
