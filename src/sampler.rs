use crate::error::{MosaicError, Result};
use clap::ValueEnum;
use image::{DynamicImage, ImageReader, Rgb};
use rayon::prelude::*;
use std::array;
use std::fs;
use std::path::{Path, PathBuf};

/// Average color of an image.
///
/// Each channel is a histogram of occurrence counts weighted by the channel
/// value and divided by the pixel count, truncated to an integer. Grayscale
/// input is promoted to RGB first so the same formula applies.
pub fn average_color(img: &DynamicImage) -> Rgb<u8> {
    let rgb = img.to_rgb8();
    let mut hist = [[0u64; 256]; 3];
    for pixel in rgb.pixels() {
        for (channel, value) in pixel.0.into_iter().enumerate() {
            hist[channel][value as usize] += 1;
        }
    }
    Rgb(array::from_fn(|channel| {
        let (weighted, total) = hist[channel]
            .iter()
            .enumerate()
            .fold((0u64, 0u64), |(weighted, total), (value, &count)| {
                (weighted + value as u64 * count, total + count)
            });
        weighted.checked_div(total).unwrap_or(0) as u8
    }))
}

/// A candidate photo from the source directory.
#[derive(Debug, Clone, PartialEq)]
pub struct Photo {
    pub path: PathBuf,
    pub color: Rgb<u8>,
}

impl Photo {
    pub fn new(path: impl Into<PathBuf>, color: Rgb<u8>) -> Self {
        Self {
            path: path.into(),
            color,
        }
    }

    /// Decodes `path` and samples its average color.
    ///
    /// Zero-length files stand for photos that deliberately do not exist and
    /// give `Ok(None)`. The decoded buffer is dropped before returning.
    pub fn sample(path: &Path) -> Result<Option<Self>> {
        let metadata = fs::metadata(path).map_err(|source| MosaicError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if metadata.len() == 0 {
            return Ok(None);
        }
        let img = decode(path)?;
        Ok(Some(Self::new(path, average_color(&img))))
    }
}

pub(crate) fn decode(path: &Path) -> Result<DynamicImage> {
    let unreadable = |source: image::ImageError| MosaicError::UnreadableImage {
        path: path.to_path_buf(),
        source,
    };
    ImageReader::open(path)
        .map_err(|e| unreadable(e.into()))?
        .with_guessed_format()
        .map_err(|e| unreadable(e.into()))?
        .decode()
        .map_err(unreadable)
}

/// Order in which candidates are fed to the assignment engine.
///
/// The engine is greedy, so a different order can yield a different mosaic.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PhotoOrder {
    /// Ascending by file name.
    #[default]
    Name,
    /// Descending by file name.
    NameDesc,
}

impl PhotoOrder {
    pub fn sort(&self, photos: &mut [Photo]) {
        photos.sort_by(|a, b| {
            let by_name = a
                .path
                .file_name()
                .cmp(&b.path.file_name())
                .then_with(|| a.path.cmp(&b.path));
            match self {
                PhotoOrder::Name => by_name,
                PhotoOrder::NameDesc => by_name.reverse(),
            }
        });
    }
}

/// The usable candidates of a source directory plus what was left out.
#[derive(Debug, Default)]
pub struct PhotoPool {
    pub photos: Vec<Photo>,
    pub empty: usize,
    pub unreadable: Vec<PathBuf>,
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}

/// Samples every candidate file directly inside `dir`.
///
/// Sampling runs in parallel; the pool is sorted by `order` once every
/// sample is in. Undecodable files are logged and skipped.
pub fn collect_photos(dir: &Path, extensions: &[String], order: PhotoOrder) -> Result<PhotoPool> {
    let io_error = |source: std::io::Error| MosaicError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        if path.is_file() && has_extension(&path, extensions) {
            paths.push(path);
        }
    }

    let samples: Vec<_> = paths.par_iter().map(|path| Photo::sample(path)).collect();

    let mut pool = PhotoPool::default();
    for (path, sample) in paths.into_iter().zip(samples) {
        match sample {
            Ok(Some(photo)) => pool.photos.push(photo),
            Ok(None) => pool.empty += 1,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping candidate photo");
                pool.unreadable.push(path);
            }
        }
    }
    order.sort(&mut pool.photos);
    pool.unreadable.sort();
    Ok(pool)
}
