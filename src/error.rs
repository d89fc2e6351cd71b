use std::path::PathBuf;

use thiserror::Error;

/// Library error type for image-cadence operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The requested rate is not a positive whole number of images per minute.
    #[error("invalid rate {input:?}: {reason}")]
    Validation { input: String, reason: RateRejection },

    /// No image in the directory is eligible for display.
    #[error("no eligible images in {}", .0.display())]
    CatalogEmpty(PathBuf),

    /// A catalog entry could not be opened or decoded.
    #[error("unable to load image {}", path.display())]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// `start` was requested while a cadence run is active.
    #[error("a cadence run is already active")]
    AlreadyRunning,

    /// `stop` was requested while idle.
    #[error("no cadence run is active")]
    NotRunning,

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// YAML/serde configuration error.
    #[error(transparent)]
    Config(#[from] serde_yaml::Error),
}

/// Why a rate input was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateRejection {
    NotANumber,
    NotPositive,
    TooLarge,
}

impl std::fmt::Display for RateRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::NotANumber => "please enter a valid number",
            Self::NotPositive => "please enter a number greater than zero",
            Self::TooLarge => "number is too large",
        })
    }
}

impl Error {
    /// `true` for errors the user caused by typing a bad rate.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}
