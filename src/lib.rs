//! Show a random image from a folder at a steady per-minute rate.
//!
//! The [`Scheduler`] validates the rate, owns the session's exclusion set and
//! spawns one cadence task per run. Display output travels as
//! [`DisplayEvent`]s over a channel, so any surface can render it.

pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod exclusion;
pub mod loader;
pub mod scheduler;
pub mod stats;
pub mod tasks {
    pub mod cadence;
    pub mod control;
    pub mod viewer;
}

pub use catalog::{ImageCatalog, ImageEntry};
pub use error::Error;
pub use events::{CadenceExit, DisplayEvent, Notice};
pub use exclusion::ExclusionSet;
pub use scheduler::{RateInput, RatePerMinute, ScheduleState, Scheduler, SchedulerOptions};
pub use stats::{Stats, StatsSnapshot};
