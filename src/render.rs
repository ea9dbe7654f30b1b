use crate::assign::Assignment;
use crate::error::{MosaicError, Result, Shortfall};
use crate::quantizer::TargetGrid;
use crate::sampler::{decode, Photo};
use image::{imageops, imageops::FilterType, Rgb, RgbImage};
use std::time::Instant;

/// Composites assigned photos into the final mosaic.
#[derive(Debug, Clone, Copy)]
pub struct MosaicRenderer {
    tile_size: u32,
    filter: FilterType,
}

impl MosaicRenderer {
    pub fn new(tile_size: u32) -> Self {
        Self {
            tile_size,
            filter: FilterType::Triangle,
        }
    }

    /// Filter used for photos whose size differs from the tile size.
    pub fn filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }

    pub fn canvas_size(&self, grid: &TargetGrid) -> (u32, u32) {
        (grid.width() * self.tile_size, grid.height() * self.tile_size)
    }

    fn load_tile(&self, photo: &Photo) -> Result<RgbImage> {
        let tile = decode(&photo.path)?.to_rgb8();
        if tile.dimensions() == (self.tile_size, self.tile_size) {
            Ok(tile)
        } else {
            Ok(imageops::resize(
                &tile,
                self.tile_size,
                self.tile_size,
                self.filter,
            ))
        }
    }

    /// Fills every cell of `grid` with a photo taken from its color's bucket.
    ///
    /// The assignment is validated before any photo is decoded, so an
    /// under-supplied palette color never yields a partial canvas.
    pub fn render(
        &self,
        grid: &TargetGrid,
        mut assignment: Assignment,
        photos: &[Photo],
    ) -> Result<RgbImage> {
        assignment.validate()?;

        let start_time = Instant::now();
        let (width, height) = self.canvas_size(grid);
        let mut canvas = RgbImage::new(width, height);
        for (x, y, index) in grid.cells() {
            let Some(photo) = assignment.take(index) else {
                let (color, capacity) = assignment
                    .palette()
                    .iter()
                    .find(|c| c.index == index)
                    .map(|c| (c.color, c.capacity))
                    .unwrap_or((Rgb([0, 0, 0]), 0));
                return Err(MosaicError::BucketExhausted {
                    shortfalls: vec![Shortfall {
                        index,
                        color,
                        capacity,
                        filled: 0,
                    }],
                });
            };
            let tile = self.load_tile(&photos[photo])?;
            imageops::replace(
                &mut canvas,
                &tile,
                i64::from(x * self.tile_size),
                i64::from(y * self.tile_size),
            );
        }
        tracing::info!(
            width,
            height,
            elapsed_ms = (start_time.elapsed().as_millis() as u64),
            "Rendered mosaic"
        );
        Ok(canvas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assign::AssignmentEngine;
    use crate::color::CubeRoot;
    use image::{GrayImage, Luma};
    use std::path::Path;

    fn save_solid(dir: &Path, name: &str, size: u32, color: [u8; 3]) -> Photo {
        let path = dir.join(name);
        RgbImage::from_pixel(size, size, Rgb(color))
            .save(&path)
            .unwrap();
        Photo::new(path, Rgb(color))
    }

    fn two_cell_grid() -> TargetGrid {
        let mut cells = GrayImage::new(2, 1);
        cells.put_pixel(0, 0, Luma([1]));
        cells.put_pixel(1, 0, Luma([0]));
        TargetGrid::from(cells)
    }

    #[test]
    fn tiles_land_on_their_cells() {
        let dir = tempfile::tempdir().unwrap();
        let photos = [
            save_solid(dir.path(), "red.png", 4, [250, 0, 0]),
            save_solid(dir.path(), "blue.png", 8, [0, 0, 250]),
            save_solid(dir.path(), "pink.png", 4, [250, 100, 100]),
        ];
        let grid = two_cell_grid();
        let palette = grid.capacities(&[Rgb([0, 0, 255]), Rgb([255, 0, 0])]);
        let assignment = AssignmentEngine::new(&palette, CubeRoot).assign(&photos);
        assert_eq!(assignment.dropped(), &[2]);

        let renderer = MosaicRenderer::new(4);
        assert_eq!(renderer.canvas_size(&grid), (8, 4));
        let canvas = renderer.render(&grid, assignment, &photos).unwrap();
        assert_eq!(canvas.dimensions(), (8, 4));
        assert_eq!(*canvas.get_pixel(0, 0), Rgb([250, 0, 0]));
        assert_eq!(*canvas.get_pixel(3, 3), Rgb([250, 0, 0]));
        assert_eq!(*canvas.get_pixel(4, 0), Rgb([0, 0, 250]));
        assert_eq!(*canvas.get_pixel(7, 3), Rgb([0, 0, 250]));
    }

    #[test]
    fn under_supplied_color_fails_before_decoding() {
        // paths do not exist, so any decode would fail with UnreadableImage
        let photos = [Photo::new("missing/red.png", Rgb([255, 0, 0]))];
        let grid = two_cell_grid();
        let palette = grid.capacities(&[Rgb([0, 0, 255]), Rgb([255, 0, 0])]);
        let assignment = AssignmentEngine::new(&palette, CubeRoot)
            .max_closeness(Some(1.0))
            .assign(&photos);

        match MosaicRenderer::new(4).render(&grid, assignment, &photos) {
            Err(MosaicError::BucketExhausted { shortfalls }) => {
                assert_eq!(shortfalls.len(), 1);
                assert_eq!(shortfalls[0].index, 0);
                assert_eq!(shortfalls[0].capacity, 1);
            }
            other => panic!("expected BucketExhausted, got {other:?}"),
        }
    }

    #[test]
    fn missing_photo_file_is_unreadable() {
        let photos = [
            Photo::new("missing/red.png", Rgb([255, 0, 0])),
            Photo::new("missing/blue.png", Rgb([0, 0, 255])),
        ];
        let grid = two_cell_grid();
        let palette = grid.capacities(&[Rgb([0, 0, 255]), Rgb([255, 0, 0])]);
        let assignment = AssignmentEngine::new(&palette, CubeRoot).assign(&photos);
        assert!(matches!(
            MosaicRenderer::new(4).render(&grid, assignment, &photos),
            Err(MosaicError::UnreadableImage { .. })
        ));
    }
}
