use std::path::{Path, PathBuf};

use anyhow::{Result, ensure};
use serde::Deserialize;

use crate::catalog::ImageCatalog;
use crate::error::Error;
use crate::loader::FrameSizes;
use crate::scheduler::SchedulerOptions;

/// Optional settings file. Every key has a default, so an empty file (or no
/// file at all) behaves the same as running without one. Recognized image
/// extensions are fixed (see [`crate::catalog::IMAGE_EXTENSIONS`]); unknown
/// keys are rejected.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Configuration {
    /// Directory to pick images from. Defaults to `images` next to the executable.
    pub image_dir: Option<PathBuf>,
    /// Width and height of the displayed image.
    pub display_size: [u32; 2],
    /// Bounding box of excludable-list thumbnails.
    pub thumbnail_size: [u32; 2],
    /// Optional deterministic seed for image selection.
    pub rng_seed: Option<u64>,
    /// Capacity of the scheduler -> display channel.
    pub sink_capacity: usize,
}

impl Configuration {
    /// # Errors
    /// [`Error::Io`] if the file cannot be read, [`Error::Config`] if it is not valid YAML.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let s = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(
            self.display_size.iter().all(|&d| d > 0),
            "display-size must be greater than zero in both dimensions"
        );
        ensure!(
            self.thumbnail_size.iter().all(|&d| d > 0),
            "thumbnail-size must be greater than zero in both dimensions"
        );
        ensure!(
            self.sink_capacity > 0,
            "sink-capacity must be greater than zero"
        );
        Ok(self)
    }

    /// Configured directory, or `images` beside the running executable.
    #[must_use]
    pub fn image_dir(&self) -> PathBuf {
        self.image_dir.clone().unwrap_or_else(default_image_dir)
    }

    #[must_use]
    pub fn catalog(&self) -> ImageCatalog {
        ImageCatalog::new(self.image_dir())
    }

    #[must_use]
    pub const fn frame_sizes(&self) -> FrameSizes {
        FrameSizes {
            display: (self.display_size[0], self.display_size[1]),
            thumbnail: (self.thumbnail_size[0], self.thumbnail_size[1]),
        }
    }

    #[must_use]
    pub const fn scheduler_options(&self) -> SchedulerOptions {
        SchedulerOptions {
            sizes: self.frame_sizes(),
            seed: self.rng_seed,
        }
    }
}

impl Default for Configuration {
    fn default() -> Self {
        let sizes = FrameSizes::default();
        Self {
            image_dir: None,
            display_size: [sizes.display.0, sizes.display.1],
            thumbnail_size: [sizes.thumbnail.0, sizes.thumbnail.1],
            rng_seed: None,
            sink_capacity: 16,
        }
    }
}

fn default_image_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("images")))
        .unwrap_or_else(|| PathBuf::from("images"))
}
