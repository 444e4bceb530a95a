//! Deterministic grid partition of pixel data.
//!
//! An image is normalized to 8-bit RGB (any alpha channel is dropped, so edits
//! that only touch transparency are invisible to verification) and split into
//! `rows × cols` regions in row-major order. Every region spans
//! `floor(H / rows) × floor(W / cols)` pixels, except the last row and column
//! of regions, which extend to the image boundary and absorb the remainder.
//!
//! A region is hashed over its pixel bytes laid out row by row, left to right,
//! three bytes per pixel in R, G, B order.

use image::{DynamicImage, RgbImage};
use serde::{Deserialize, Serialize};

use crate::error::{ProvenanceError, Result};
use crate::hashing::{content_hash, Digest32};

/// Number of grid rows used when none is configured.
pub const DEFAULT_GRID_ROWS: u32 = 8;

/// Number of grid columns used when none is configured.
pub const DEFAULT_GRID_COLS: u32 = 8;

const CHANNELS: usize = 3;

/// Grid dimensions. Serialized as `[rows, cols]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(u32, u32)", into = "(u32, u32)")]
pub struct GridSpec {
    pub rows: u32,
    pub cols: u32,
}

impl GridSpec {
    pub fn new(rows: u32, cols: u32) -> Self {
        Self { rows, cols }
    }

    /// Reject grids with a zero dimension.
    pub fn validate(&self) -> Result<()> {
        if self.rows == 0 || self.cols == 0 {
            return Err(ProvenanceError::InvalidGrid {
                rows: self.rows,
                cols: self.cols,
            });
        }
        Ok(())
    }

    /// Total number of blocks (`rows * cols`).
    pub fn block_count(&self) -> usize {
        self.rows as usize * self.cols as usize
    }
}

impl Default for GridSpec {
    fn default() -> Self {
        Self::new(DEFAULT_GRID_ROWS, DEFAULT_GRID_COLS)
    }
}

impl From<(u32, u32)> for GridSpec {
    fn from((rows, cols): (u32, u32)) -> Self {
        Self { rows, cols }
    }
}

impl From<GridSpec> for (u32, u32) {
    fn from(grid: GridSpec) -> Self {
        (grid.rows, grid.cols)
    }
}

/// One rectangular region of the partition. Coordinates are half-open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRegion {
    /// Row-major block index.
    pub index: usize,
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl BlockRegion {
    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x1 && x < self.x2 && y >= self.y1 && y < self.y2
    }
}

/// Drop any alpha channel and convert to 8-bit RGB.
pub fn normalize(image: &DynamicImage) -> RgbImage {
    image.to_rgb8()
}

/// Split a `width × height` image into `grid` regions in row-major order.
pub fn partition(width: u32, height: u32, grid: GridSpec) -> Result<Vec<BlockRegion>> {
    grid.validate()?;

    let block_h = height / grid.rows;
    let block_w = width / grid.cols;

    let mut regions = Vec::with_capacity(grid.block_count());
    for r in 0..grid.rows {
        let y1 = r * block_h;
        let y2 = if r < grid.rows - 1 { (r + 1) * block_h } else { height };
        for c in 0..grid.cols {
            let x1 = c * block_w;
            let x2 = if c < grid.cols - 1 { (c + 1) * block_w } else { width };
            regions.push(BlockRegion {
                index: regions.len(),
                x1,
                y1,
                x2,
                y2,
            });
        }
    }
    Ok(regions)
}

/// Copy the pixel bytes of one region, row by row.
pub fn region_bytes(image: &RgbImage, region: &BlockRegion) -> Vec<u8> {
    let stride = image.width() as usize * CHANNELS;
    let raw = image.as_raw();
    let row_len = region.width() as usize * CHANNELS;

    let mut bytes = Vec::with_capacity(row_len * region.height() as usize);
    for y in region.y1..region.y2 {
        let start = y as usize * stride + region.x1 as usize * CHANNELS;
        bytes.extend_from_slice(&raw[start..start + row_len]);
    }
    bytes
}

/// Hash every region of `image` under `grid`, in row-major order.
pub fn block_hashes(image: &RgbImage, grid: GridSpec) -> Result<Vec<Digest32>> {
    let regions = partition(image.width(), image.height(), grid)?;
    Ok(regions
        .iter()
        .map(|region| content_hash(&region_bytes(image, region)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, Rgba, RgbaImage};

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x + y) % 256) as u8])
        })
    }

    #[test]
    fn test_partition_covers_every_pixel_once() {
        let (w, h) = (37, 23);
        let regions = partition(w, h, GridSpec::new(4, 5)).unwrap();
        assert_eq!(regions.len(), 20);

        for y in 0..h {
            for x in 0..w {
                let hits = regions.iter().filter(|r| r.contains(x, y)).count();
                assert_eq!(hits, 1, "pixel ({x}, {y}) covered {hits} times");
            }
        }
    }

    #[test]
    fn test_last_row_and_column_absorb_remainder() {
        let regions = partition(10, 7, GridSpec::new(2, 3)).unwrap();
        // block_h = 3, block_w = 3
        assert_eq!(regions[0], BlockRegion { index: 0, x1: 0, y1: 0, x2: 3, y2: 3 });
        assert_eq!(regions[2], BlockRegion { index: 2, x1: 6, y1: 0, x2: 10, y2: 3 });
        assert_eq!(regions[5], BlockRegion { index: 5, x1: 6, y1: 3, x2: 10, y2: 7 });
    }

    #[test]
    fn test_partition_rejects_zero_grid() {
        assert!(matches!(
            partition(8, 8, GridSpec::new(0, 4)),
            Err(ProvenanceError::InvalidGrid { rows: 0, cols: 4 })
        ));
    }

    #[test]
    fn test_region_bytes_row_major_rgb() {
        let image = gradient(4, 4);
        let region = BlockRegion { index: 0, x1: 1, y1: 2, x2: 3, y2: 4 };
        let bytes = region_bytes(&image, &region);

        let mut expected = Vec::new();
        for y in 2..4 {
            for x in 1..3 {
                expected.extend_from_slice(&image.get_pixel(x, y).0);
            }
        }
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_single_pixel_edit_changes_only_its_block() {
        let grid = GridSpec::new(4, 4);
        let original = gradient(33, 29);
        let mut edited = original.clone();
        edited.put_pixel(20, 10, Rgb([255, 255, 255]));

        let before = block_hashes(&original, grid).unwrap();
        let after = block_hashes(&edited, grid).unwrap();
        let regions = partition(33, 29, grid).unwrap();
        let touched = regions.iter().find(|r| r.contains(20, 10)).unwrap().index;

        for (i, (a, b)) in before.iter().zip(after.iter()).enumerate() {
            if i == touched {
                assert_ne!(a, b);
            } else {
                assert_eq!(a, b, "block {i} should be unchanged");
            }
        }
    }

    #[test]
    fn test_alpha_only_edit_is_invisible() {
        let opaque = RgbaImage::from_pixel(16, 16, Rgba([10, 20, 30, 255]));
        let mut translucent = opaque.clone();
        translucent.put_pixel(3, 3, Rgba([10, 20, 30, 0]));

        let a = normalize(&DynamicImage::ImageRgba8(opaque));
        let b = normalize(&DynamicImage::ImageRgba8(translucent));
        assert_eq!(
            block_hashes(&a, GridSpec::default()).unwrap(),
            block_hashes(&b, GridSpec::default()).unwrap()
        );
    }

    #[test]
    fn test_grid_serializes_as_pair() {
        let json = serde_json::to_string(&GridSpec::new(8, 4)).unwrap();
        assert_eq!(json, "[8,4]");
        let grid: GridSpec = serde_json::from_str("[3,5]").unwrap();
        assert_eq!(grid, GridSpec::new(3, 5));
    }
}
