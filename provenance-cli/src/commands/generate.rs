//! Generate-image command implementation.
//!
//! Produces a synthetic test image: a white canvas covered with randomly
//! placed, randomly colored filled rectangles, so every block of the default
//! grid has distinct edges to hash.

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use image::{Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

pub const DEFAULT_SIZE: u32 = 256;
pub const DEFAULT_RECTANGLES: u32 = 20;

/// Draw `rectangles` random filled rectangles on a white `width × height` canvas.
///
/// Corners are drawn uniformly from `0..=width` and `0..=height`; rectangles
/// are inclusive of both corners and clipped to the canvas.
pub fn generate_image<R: Rng>(rng: &mut R, width: u32, height: u32, rectangles: u32) -> RgbImage {
    let mut image = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
    if width == 0 || height == 0 {
        return image;
    }

    for _ in 0..rectangles {
        let (xa, xb) = (rng.gen_range(0..=width), rng.gen_range(0..=width));
        let (ya, yb) = (rng.gen_range(0..=height), rng.gen_range(0..=height));
        let color = Rgb([rng.gen(), rng.gen(), rng.gen()]);

        let x_end = xa.max(xb).min(width - 1);
        let y_end = ya.max(yb).min(height - 1);
        for y in ya.min(yb)..=y_end {
            for x in xa.min(xb)..=x_end {
                image.put_pixel(x, y, color);
            }
        }
    }
    image
}

/// Execute the generate-image command.
pub fn execute(output: PathBuf, rectangles: u32, seed: Option<u64>, quiet: bool) -> Result<()> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let image = generate_image(&mut rng, DEFAULT_SIZE, DEFAULT_SIZE, rectangles);
    image
        .save(&output)
        .with_context(|| format!("Failed to write image: {}", output.display()))?;

    info!(path = %output.display(), rectangles, "Generated image");

    if !quiet {
        println!("{} {}", "Created".green().bold(), output.display());
    }
    Ok(())
}
