// THEORY:
// Every fallible stage of the engine reports through a single `DiffError`.
// Decode failures name which of the two inputs was unreadable, and every
// variant maps onto a coarse `Stage` so callers (the CLI, a web handler) can
// tell a bad upload apart from a processing fault without matching on every
// variant. Recoverable conditions (dimension mismatch, zero-area regions,
// capped grouping expansions) never appear here.

use thiserror::Error;

/// Which of the two input images an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSlot {
    Original,
    Modified,
}

impl std::fmt::Display for ImageSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageSlot::Original => write!(f, "original"),
            ImageSlot::Modified => write!(f, "modified"),
        }
    }
}

/// The pipeline stage an error was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Decode,
    Config,
    Processing,
    Encode,
}

#[derive(Error, Debug)]
pub enum DiffError {
    #[error("failed to decode {which} image: {source}")]
    Decode {
        which: ImageSlot,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to encode output image: {0}")]
    Encode(#[source] image::ImageError),

    #[error("malformed data url: {0}")]
    DataUrl(String),

    #[error("invalid settings: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("analysis worker failed: {0}")]
    Worker(String),

    #[error("label font could not be loaded: {0}")]
    Font(#[from] ab_glyph::InvalidFont),
}

impl DiffError {
    pub fn stage(&self) -> Stage {
        match self {
            DiffError::Decode { .. } | DiffError::DataUrl(_) => Stage::Decode,
            DiffError::Config(_) | DiffError::Json(_) | DiffError::Font(_) => Stage::Config,
            DiffError::Encode(_) => Stage::Encode,
            DiffError::Io(_) | DiffError::Worker(_) => Stage::Processing,
        }
    }
}

pub type Result<T> = std::result::Result<T, DiffError>;
