//! Synthetic test patterns used for fixtures and the `--pattern` CLI input.

use crate::canvas::{Image, Pixel};
use crate::error::{EditError, Result};

/// Red, orange, yellow, green, blue, indigo, violet.
pub const RAINBOW: [Pixel; 7] = [
    Pixel::from_rgb(255, 0, 0),
    Pixel::from_rgb(255, 127, 0),
    Pixel::from_rgb(255, 255, 0),
    Pixel::from_rgb(0, 255, 0),
    Pixel::from_rgb(0, 0, 255),
    Pixel::from_rgb(75, 0, 130),
    Pixel::from_rgb(148, 0, 211),
];

/// Direction the rainbow bands run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Stripes {
    /// Bands stacked top to bottom.
    #[default]
    Horizontal,
    /// Bands laid out left to right.
    Vertical,
}

/// A square board of `tiles`×`tiles` tiles, each `tile_size` pixels wide.
/// The top-left tile uses `first`.
pub fn checkerboard(tile_size: usize, tiles: usize, first: Pixel, second: Pixel) -> Result<Image> {
    if tile_size == 0 || tiles == 0 {
        return Err(EditError::invalid("checkerboard needs a positive tile size and count"));
    }
    let side = tile_size * tiles;
    let pixels = (0..side * side)
        .map(|i| {
            let (row, col) = (i / side, i % side);
            if (row / tile_size + col / tile_size) % 2 == 0 { first } else { second }
        })
        .collect();
    Image::from_pixel_vec(side, side, pixels)
}

/// Seven equal ROYGBIV bands; band `k` covers positions with
/// `pos * 7 / extent == k`.
pub fn rainbow(width: usize, height: usize, stripes: Stripes) -> Result<Image> {
    if width == 0 || height == 0 {
        return Err(EditError::invalid("rainbow dimensions must be positive"));
    }
    let pixels = (0..width * height)
        .map(|i| {
            let (row, col) = (i / width, i % width);
            let band = match stripes {
                Stripes::Horizontal => row * RAINBOW.len() / height,
                Stripes::Vertical => col * RAINBOW.len() / width,
            };
            RAINBOW[band]
        })
        .collect();
    Image::from_pixel_vec(width, height, pixels)
}
