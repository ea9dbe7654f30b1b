use image::{ImageError, Rgb};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A palette color whose bucket did not reach its capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shortfall {
    pub index: usize,
    pub color: Rgb<u8>,
    pub capacity: usize,
    pub filled: usize,
}

impl fmt::Display for Shortfall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.color.0;
        write!(
            f,
            "#{} rgb({r}, {g}, {b}) has {}/{}",
            self.index, self.filled, self.capacity
        )
    }
}

fn list_shortfalls(shortfalls: &[Shortfall]) -> String {
    shortfalls
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn short_by(cells: &usize, photos: &usize) -> usize {
    cells.saturating_sub(*photos)
}

#[derive(Debug, Error)]
pub enum MosaicError {
    #[error("Unreadable image {}: {source}", .path.display())]
    UnreadableImage {
        path: PathBuf,
        #[source]
        source: ImageError,
    },

    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Not enough photos: {cells} cells but only {photos} usable photos ({} short)", short_by(.cells, .photos))]
    InsufficientCandidates { cells: usize, photos: usize },

    #[error("Under-supplied palette colors: {}", list_shortfalls(.shortfalls))]
    BucketExhausted { shortfalls: Vec<Shortfall> },

    #[error("Target image resizes to an empty grid: {width}x{height}")]
    EmptyTarget { width: u32, height: u32 },

    #[error("Failed to write {}: {source}", .path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: ImageError,
    },
}

pub type Result<T> = std::result::Result<T, MosaicError>;
