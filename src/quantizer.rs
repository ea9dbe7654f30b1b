use crate::error::{MosaicError, Result};
use crate::octree::ColorQuantizer;
use image::{imageops, imageops::FilterType, DynamicImage, GrayImage, Rgb};

/// One palette color together with the number of grid cells it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteColor {
    pub index: usize,
    pub color: Rgb<u8>,
    pub capacity: usize,
}

/// Palette index of every cell of the resized target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetGrid {
    cells: GrayImage,
}

impl TargetGrid {
    pub fn width(&self) -> u32 {
        self.cells.width()
    }

    pub fn height(&self) -> u32 {
        self.cells.height()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    pub fn index_at(&self, x: u32, y: u32) -> usize {
        self.cells.get_pixel(x, y)[0] as usize
    }

    /// Cells in row-major order as `(x, y, palette index)`.
    pub fn cells(&self) -> impl Iterator<Item = (u32, u32, usize)> + '_ {
        self.cells
            .enumerate_pixels()
            .map(|(x, y, p)| (x, y, p[0] as usize))
    }

    /// Every palette index that occurs, with its occurrence count.
    pub fn capacities(&self, palette: &[Rgb<u8>]) -> Vec<PaletteColor> {
        let mut counts = vec![0usize; palette.len()];
        for p in self.cells.pixels() {
            counts[p[0] as usize] += 1;
        }
        palette
            .iter()
            .zip(counts)
            .enumerate()
            .filter(|(_, (_, count))| *count > 0)
            .map(|(index, (&color, capacity))| PaletteColor {
                index,
                color,
                capacity,
            })
            .collect()
    }
}

impl From<GrayImage> for TargetGrid {
    fn from(cells: GrayImage) -> Self {
        Self { cells }
    }
}

/// Height that keeps the aspect ratio of `width x height` at `target_width`.
pub fn scaled_height(width: u32, height: u32, target_width: u32) -> u32 {
    if width == 0 {
        return 0;
    }
    let scaled = u64::from(height) * u64::from(target_width) / u64::from(width);
    (scaled as u32).max(1)
}

/// Resizes `img` to `target_width` cells wide and quantizes it to at most
/// `palette_size` colors.
///
/// Only palette entries that some cell uses are returned, so capacities always
/// sum to the cell count.
pub fn quantize_target(
    img: &DynamicImage,
    target_width: u32,
    palette_size: usize,
) -> Result<(TargetGrid, Vec<PaletteColor>)> {
    let height = scaled_height(img.width(), img.height(), target_width);
    if target_width == 0 || height == 0 {
        return Err(MosaicError::EmptyTarget {
            width: target_width,
            height,
        });
    }
    let resized = if img.width() == target_width && img.height() == height {
        img.to_rgb8()
    } else {
        img.resize_exact(target_width, height, FilterType::Nearest)
            .to_rgb8()
    };
    let quantizer = ColorQuantizer::from(&resized, palette_size);
    let grid = TargetGrid::from(imageops::index_colors(&resized, &quantizer));
    let palette = grid.capacities(quantizer.get_palette());
    tracing::info!(
        width = grid.width(),
        height = grid.height(),
        colors = palette.len(),
        "Quantized target"
    );
    Ok((grid, palette))
}
