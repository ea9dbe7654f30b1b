pub mod assign;
pub mod color;
pub mod config;
pub mod error;
pub mod octree;
pub mod quantizer;
pub mod render;
pub mod sampler;

pub use assign::{check_supply, AssignStats, Assignment, AssignmentEngine, Bucket};
pub use color::{Closeness, ClosenessKind, CubeRoot, Euclidean};
pub use config::MosaicConfig;
pub use error::{MosaicError, Result, Shortfall};
pub use quantizer::{quantize_target, PaletteColor, TargetGrid};
pub use render::MosaicRenderer;
pub use sampler::{average_color, collect_photos, Photo, PhotoOrder, PhotoPool};

/// What a finished run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MosaicReport {
    pub grid_width: u32,
    pub grid_height: u32,
    pub colors: usize,
    pub photos: usize,
    pub empty: usize,
    pub unreadable: usize,
    pub placed: usize,
    pub dropped: usize,
    pub stats: AssignStats,
}

/// Builds the mosaic described by `config` and writes it to `config.output`.
///
/// Supply and packing are checked before anything is rendered; the output file
/// is only written once the whole canvas is composed.
pub fn build_mosaic(config: &MosaicConfig) -> Result<MosaicReport> {
    tracing::info!(path = %config.target.display(), "Preparing target");
    let (grid, palette) = {
        let target = sampler::decode(&config.target)?;
        quantize_target(&target, config.target_width, config.colors)?
    };

    tracing::info!(source = %config.source.display(), "Collecting cached photos");
    let pool = collect_photos(&config.source, &config.extensions, config.order)?;
    tracing::info!(
        photos = pool.photos.len(),
        empty = pool.empty,
        unreadable = pool.unreadable.len(),
        "Loaded photos"
    );
    check_supply(grid.len(), pool.photos.len())?;

    tracing::info!(cells = grid.len(), "Assigning photos");
    let assignment = AssignmentEngine::new(&palette, config.closeness)
        .max_closeness(config.max_closeness)
        .assign(&pool.photos);
    let report = MosaicReport {
        grid_width: grid.width(),
        grid_height: grid.height(),
        colors: palette.len(),
        photos: pool.photos.len(),
        empty: pool.empty,
        unreadable: pool.unreadable.len(),
        placed: assignment.placed(),
        dropped: assignment.dropped().len(),
        stats: assignment.stats(),
    };

    let canvas = MosaicRenderer::new(config.tile_size).render(&grid, assignment, &pool.photos)?;
    canvas
        .save(&config.output)
        .map_err(|source| MosaicError::Encode {
            path: config.output.clone(),
            source,
        })?;
    tracing::info!(output = %config.output.display(), "Mosaic written");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::fs;
    use std::path::Path;

    fn save_solid(path: &Path, size: u32, color: [u8; 3]) {
        RgbImage::from_pixel(size, size, Rgb(color))
            .save(path)
            .unwrap();
    }

    /// Left half black, right half white.
    fn two_tone_target(path: &Path) {
        RgbImage::from_fn(8, 4, |x, _| {
            if x < 4 {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        })
        .save(path)
        .unwrap();
    }

    fn config(dir: &Path) -> MosaicConfig {
        let mut config = MosaicConfig::new(dir.join("target.png"));
        config.source = dir.join("cache");
        config.output = dir.join("out.png");
        config.target_width = 4;
        config.tile_size = 3;
        config
    }

    #[test]
    fn builds_two_tone_mosaic() {
        let dir = tempfile::tempdir().unwrap();
        two_tone_target(&dir.path().join("target.png"));
        let cache = dir.path().join("cache");
        fs::create_dir(&cache).unwrap();
        for i in 0..5 {
            save_solid(&cache.join(format!("dark{i}.png")), 3, [i * 4, i * 4, i * 4]);
            save_solid(&cache.join(format!("light{i}.png")), 3, [255 - i, 250, 255]);
        }
        fs::File::create(cache.join("silhouette.jpg")).unwrap();
        fs::write(cache.join("corrupt.jpg"), b"xx").unwrap();

        let report = build_mosaic(&config(dir.path())).unwrap();
        assert_eq!((report.grid_width, report.grid_height), (4, 2));
        assert_eq!(report.colors, 2);
        assert_eq!(report.photos, 10);
        assert_eq!(report.empty, 1);
        assert_eq!(report.unreadable, 1);
        assert_eq!(report.placed, 8);
        assert_eq!(report.dropped, 2);

        let output = image::open(dir.path().join("out.png")).unwrap().to_rgb8();
        assert_eq!(output.dimensions(), (12, 6));
        assert!(output.get_pixel(1, 1)[0] < 20);
        assert!(output.get_pixel(10, 4)[1] > 240);
    }

    #[test]
    fn too_few_photos_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        two_tone_target(&dir.path().join("target.png"));
        let cache = dir.path().join("cache");
        fs::create_dir(&cache).unwrap();
        for i in 0..5 {
            save_solid(&cache.join(format!("{i}.png")), 3, [0, 0, 0]);
        }
        let mut config = config(dir.path());
        // 6 x 3 grid against 5 photos
        config.target_width = 6;
        match build_mosaic(&config) {
            Err(MosaicError::InsufficientCandidates { cells, photos }) => {
                assert_eq!((cells, photos), (18, 5));
            }
            other => panic!("expected InsufficientCandidates, got {other:?}"),
        }
        assert!(!dir.path().join("out.png").exists());
    }

    #[test]
    fn unreadable_target_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("target.png"), b"not a png").unwrap();
        assert!(matches!(
            build_mosaic(&config(dir.path())),
            Err(MosaicError::UnreadableImage { .. })
        ));
    }

    #[test]
    fn unmatched_color_is_reported_before_output() {
        let dir = tempfile::tempdir().unwrap();
        two_tone_target(&dir.path().join("target.png"));
        let cache = dir.path().join("cache");
        fs::create_dir(&cache).unwrap();
        for i in 0..8 {
            save_solid(&cache.join(format!("{i}.png")), 3, [i, i, i]);
        }
        let mut config = config(dir.path());
        config.closeness = ClosenessKind::Euclidean;
        config.max_closeness = Some(50.0);
        match build_mosaic(&config) {
            Err(MosaicError::BucketExhausted { shortfalls }) => {
                assert_eq!(shortfalls.len(), 1);
                assert_eq!(shortfalls[0].color, Rgb([255, 255, 255]));
                assert_eq!(shortfalls[0].filled, 0);
            }
            other => panic!("expected BucketExhausted, got {other:?}"),
        }
        assert!(!dir.path().join("out.png").exists());
    }
}
