use crate::color::ClosenessKind;
use crate::sampler::PhotoOrder;
use std::path::PathBuf;

pub const DEFAULT_TARGET_WIDTH: u32 = 30;
pub const DEFAULT_SOURCE: &str = "cache";
pub const DEFAULT_TILE_SIZE: u32 = 100;
pub const DEFAULT_OUTPUT: &str = "output.jpg";
pub const DEFAULT_COLORS: usize = 256;
pub const DEFAULT_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Everything [`crate::build_mosaic`] needs to know.
#[derive(Debug, Clone, PartialEq)]
pub struct MosaicConfig {
    /// Image the mosaic should resemble.
    pub target: PathBuf,
    /// Mosaic width in tiles; the height follows the target's aspect ratio.
    pub target_width: u32,
    /// Directory of candidate photos, all square and of equal size.
    pub source: PathBuf,
    /// Edge length of one tile in pixels.
    pub tile_size: u32,
    pub output: PathBuf,
    /// Upper bound on the number of palette colors, at most 256.
    pub colors: usize,
    pub order: PhotoOrder,
    pub closeness: ClosenessKind,
    pub max_closeness: Option<f64>,
    /// File extensions, without the dot, that mark candidate photos.
    pub extensions: Vec<String>,
}

impl MosaicConfig {
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            target_width: DEFAULT_TARGET_WIDTH,
            source: PathBuf::from(DEFAULT_SOURCE),
            tile_size: DEFAULT_TILE_SIZE,
            output: PathBuf::from(DEFAULT_OUTPUT),
            colors: DEFAULT_COLORS,
            order: PhotoOrder::default(),
            closeness: ClosenessKind::default(),
            max_closeness: None,
            extensions: DEFAULT_EXTENSIONS.map(String::from).to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = MosaicConfig::new("target.png");
        assert_eq!(config.target, PathBuf::from("target.png"));
        assert_eq!(config.target_width, 30);
        assert_eq!(config.source, PathBuf::from("cache"));
        assert_eq!(config.tile_size, 100);
        assert_eq!(config.output, PathBuf::from("output.jpg"));
        assert_eq!(config.colors, 256);
        assert_eq!(config.order, PhotoOrder::Name);
        assert_eq!(config.closeness, ClosenessKind::CubeRoot);
        assert_eq!(config.max_closeness, None);
        assert_eq!(config.extensions, vec!["jpg", "jpeg", "png"]);
    }
}
