// ============================================================================
// PIXEL & IMAGE MODEL: immutable 8-bit RGB rasters
// ============================================================================
//
// Images are never edited in place. Every operation builds a fresh value
// buffer and hands it to `Image::rebuild` / `Image::from_grid`, which validate
// the shape and clamp (or reject) out-of-range channel values.
// ============================================================================

use image::RgbImage;

use crate::error::{EditError, Result};

const CHANNEL_MIN: i32 = 0;
const CHANNEL_MAX: i32 = 255;

/// One of the three color channels of a [`Pixel`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    Red,
    Green,
    Blue,
}

impl Channel {
    pub fn all() -> &'static [Channel] {
        &[Channel::Red, Channel::Green, Channel::Blue]
    }

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Channel::Red => 0,
            Channel::Green => 1,
            Channel::Blue => 2,
        }
    }
}

/// An RGB color with every channel in `0..=255`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Pixel {
    rgb: [u8; 3],
}

impl Pixel {
    pub const BLACK: Pixel = Pixel::from_rgb(0, 0, 0);
    pub const WHITE: Pixel = Pixel::from_rgb(255, 255, 255);

    /// Build a pixel from arbitrary integers, saturating each channel into
    /// `0..=255`.
    pub fn new(r: i32, g: i32, b: i32) -> Self {
        Self {
            rgb: [clamp_channel(r), clamp_channel(g), clamp_channel(b)],
        }
    }

    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self { rgb: [r, g, b] }
    }

    #[inline]
    pub fn red(&self) -> u8 {
        self.rgb[0]
    }

    #[inline]
    pub fn green(&self) -> u8 {
        self.rgb[1]
    }

    #[inline]
    pub fn blue(&self) -> u8 {
        self.rgb[2]
    }

    #[inline]
    pub fn channel(&self, channel: Channel) -> u8 {
        self.rgb[channel.index()]
    }

    #[inline]
    pub fn channels(&self) -> [u8; 3] {
        self.rgb
    }

    /// Clamp every channel into `min..=max`. A reversed range collapses to
    /// `max`.
    pub fn clamp_to(self, min: u8, max: u8) -> Self {
        let c = |v: u8| v.max(min).min(max);
        Self::from_rgb(c(self.rgb[0]), c(self.rgb[1]), c(self.rgb[2]))
    }
}

impl From<[u8; 3]> for Pixel {
    fn from(rgb: [u8; 3]) -> Self {
        Self { rgb }
    }
}

#[inline]
fn clamp_channel(v: i32) -> u8 {
    v.clamp(CHANNEL_MIN, CHANNEL_MAX) as u8
}

/// A non-empty, rectangular, immutable grid of [`Pixel`]s stored row-major.
///
/// Equality and hashing cover the dimensions and every pixel, so two images
/// compare equal exactly when they would render identically.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Image {
    width: usize,
    height: usize,
    pixels: Vec<Pixel>,
}

impl Image {
    // ---- construction -------------------------------------------------------

    /// Build an image from rows of raw `[r, g, b]` values.
    ///
    /// Fails when the grid is empty or ragged. With `clamp == false` any
    /// channel outside `0..=255` is rejected; with `clamp == true` it is
    /// saturated instead.
    pub fn from_grid(grid: &[Vec<[i32; 3]>], clamp: bool) -> Result<Self> {
        let (width, height) = grid_shape(grid)?;
        let mut values = Vec::with_capacity(width * height);
        for row in grid {
            values.extend_from_slice(row);
        }
        Self::from_values(width, height, values, clamp)
    }

    /// Build an image from rows of already-valid pixels.
    pub fn from_pixels(rows: &[Vec<Pixel>]) -> Result<Self> {
        let (width, height) = grid_shape(rows)?;
        let mut pixels = Vec::with_capacity(width * height);
        for row in rows {
            pixels.extend_from_slice(row);
        }
        Ok(Self { width, height, pixels })
    }

    /// A `width`×`height` image filled with a single color.
    pub fn filled(width: usize, height: usize, pixel: Pixel) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(EditError::invalid(format!(
                "image dimensions must be positive, got {}x{}",
                width, height
            )));
        }
        Ok(Self { width, height, pixels: vec![pixel; width * height] })
    }

    /// Produce a new image (possibly of different dimensions) from a fresh
    /// pixel grid. `self` is left untouched.
    pub fn rebuild(&self, grid: &[Vec<[i32; 3]>], clamp: bool) -> Result<Self> {
        Self::from_grid(grid, clamp)
    }

    /// Flat row-major variant of [`Image::from_grid`] used by the operation
    /// engine, which fills `width * height` value triples in parallel.
    pub(crate) fn from_values(
        width: usize,
        height: usize,
        values: Vec<[i32; 3]>,
        clamp: bool,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(EditError::invalid(format!(
                "image dimensions must be positive, got {}x{}",
                width, height
            )));
        }
        if values.len() != width * height {
            return Err(EditError::invalid(format!(
                "expected {} pixels for a {}x{} image, got {}",
                width * height,
                width,
                height,
                values.len()
            )));
        }
        let mut pixels = Vec::with_capacity(values.len());
        for (i, [r, g, b]) in values.into_iter().enumerate() {
            if !clamp {
                for v in [r, g, b] {
                    if !(CHANNEL_MIN..=CHANNEL_MAX).contains(&v) {
                        return Err(EditError::invalid(format!(
                            "channel value {} at ({}, {}) outside 0..=255",
                            v,
                            i / width,
                            i % width
                        )));
                    }
                }
            }
            pixels.push(Pixel::new(r, g, b));
        }
        Ok(Self { width, height, pixels })
    }

    /// Wrap a row-major pixel buffer. The caller guarantees the length.
    pub(crate) fn from_pixel_vec(width: usize, height: usize, pixels: Vec<Pixel>) -> Result<Self> {
        if width == 0 || height == 0 || pixels.len() != width * height {
            return Err(EditError::invalid(format!(
                "pixel buffer of {} does not describe a {}x{} image",
                pixels.len(),
                width,
                height
            )));
        }
        Ok(Self { width, height, pixels })
    }

    /// Decode from tightly packed RGB bytes.
    pub fn from_raw_rgb(width: usize, height: usize, data: &[u8]) -> Result<Self> {
        if data.len() != width * height * 3 {
            return Err(EditError::invalid(format!(
                "expected {} RGB bytes for a {}x{} image, got {}",
                width * height * 3,
                width,
                height,
                data.len()
            )));
        }
        let pixels = data
            .chunks_exact(3)
            .map(|c| Pixel::from_rgb(c[0], c[1], c[2]))
            .collect();
        Self::from_pixel_vec(width, height, pixels)
    }

    pub fn from_rgb_image(src: &RgbImage) -> Result<Self> {
        Self::from_raw_rgb(src.width() as usize, src.height() as usize, src.as_raw())
    }

    // ---- export -------------------------------------------------------------

    /// Tightly packed RGB bytes, row-major.
    pub fn to_raw_rgb(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(|p| p.channels()).collect()
    }

    pub fn to_rgb_image(&self) -> Result<RgbImage> {
        RgbImage::from_raw(self.width as u32, self.height as u32, self.to_raw_rgb())
            .ok_or_else(|| EditError::invalid("image too large for an RGB buffer"))
    }

    /// Rows of raw channel values, the inverse of [`Image::from_grid`].
    pub fn to_grid(&self) -> Vec<Vec<[i32; 3]>> {
        self.rows()
            .map(|row| {
                row.iter()
                    .map(|p| {
                        let [r, g, b] = p.channels();
                        [r as i32, g as i32, b as i32]
                    })
                    .collect()
            })
            .collect()
    }

    // ---- queries ------------------------------------------------------------

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.pixels.len()
    }

    pub fn pixel_at(&self, row: usize, col: usize) -> Result<Pixel> {
        if row >= self.height || col >= self.width {
            return Err(EditError::OutOfRange {
                row,
                col,
                width: self.width,
                height: self.height,
            });
        }
        Ok(self.pixel(row, col))
    }

    pub fn value_at(&self, row: usize, col: usize, channel: Channel) -> Result<u8> {
        Ok(self.pixel_at(row, col)?.channel(channel))
    }

    /// Unchecked accessor for hot loops that already respect the bounds.
    #[inline]
    pub(crate) fn pixel(&self, row: usize, col: usize) -> Pixel {
        self.pixels[row * self.width + col]
    }

    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Pixel]> {
        self.pixels.chunks_exact(self.width)
    }
}

/// Validate that `rows` is non-empty and rectangular; returns (width, height).
fn grid_shape<T>(rows: &[Vec<T>]) -> Result<(usize, usize)> {
    let first = rows
        .first()
        .ok_or_else(|| EditError::invalid("pixel grid has no rows"))?;
    let width = first.len();
    if width == 0 {
        return Err(EditError::invalid("pixel grid has empty rows"));
    }
    if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
        return Err(EditError::invalid(format!(
            "row {} has {} pixels, expected {}",
            i,
            row.len(),
            width
        )));
    }
    Ok((width, rows.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn pixel_saturates_each_channel() {
        for &(r, g, b) in &[(-1, 0, 300), (i32::MIN, i32::MAX, 128), (256, -255, 255)] {
            let p = Pixel::new(r, g, b);
            assert_eq!(
                p,
                Pixel::new(r.clamp(0, 255), g.clamp(0, 255), b.clamp(0, 255))
            );
        }
        assert_eq!(Pixel::new(-5, 12, 999).channels(), [0, 12, 255]);
    }

    #[test]
    fn clamp_to_narrows_range() {
        let p = Pixel::from_rgb(10, 128, 250);
        assert_eq!(p.clamp_to(16, 235), Pixel::from_rgb(16, 128, 235));
        assert_eq!(p.clamp_to(200, 100), Pixel::from_rgb(100, 100, 100));
    }

    #[test]
    fn ragged_or_empty_grid_rejected() {
        assert!(Image::from_grid(&[], true).is_err());
        assert!(Image::from_grid(&[vec![]], true).is_err());
        let ragged = vec![vec![[0, 0, 0]; 2], vec![[0, 0, 0]; 3]];
        let err = Image::from_grid(&ragged, true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn unclamped_construction_rejects_out_of_range() {
        let grid = vec![vec![[0, 0, 0], [12, 256, 3]]];
        assert!(Image::from_grid(&grid, false).is_err());
        let img = Image::from_grid(&grid, true).unwrap();
        assert_eq!(img.pixel_at(0, 1).unwrap(), Pixel::from_rgb(12, 255, 3));
    }

    #[test]
    fn accessors_are_bounds_checked() {
        let img = Image::filled(3, 2, Pixel::from_rgb(1, 2, 3)).unwrap();
        assert_eq!(img.dimensions(), (3, 2));
        assert_eq!(img.value_at(1, 2, Channel::Blue).unwrap(), 3);
        assert!(matches!(img.pixel_at(2, 0), Err(EditError::OutOfRange { .. })));
        assert!(matches!(img.value_at(0, 3, Channel::Red), Err(EditError::OutOfRange { .. })));
    }

    #[test]
    fn equality_covers_content_and_shape() {
        let a = Image::filled(2, 2, Pixel::WHITE).unwrap();
        let b = Image::filled(2, 2, Pixel::WHITE).unwrap();
        assert_eq!(a, b);

        let mut grid = a.to_grid();
        grid[1][0] = [255, 255, 254];
        assert_ne!(a, a.rebuild(&grid, false).unwrap());

        assert_ne!(a, Image::filled(1, 4, Pixel::WHITE).unwrap());
    }

    #[test]
    fn rgb_buffer_conversion() {
        let grid = vec![vec![[1, 2, 3], [4, 5, 6]], vec![[7, 8, 9], [10, 11, 12]]];
        let img = Image::from_grid(&grid, false).unwrap();
        let rgb = img.to_rgb_image().unwrap();
        assert_eq!(rgb.get_pixel(1, 0).0, [4, 5, 6]);
        assert_eq!(Image::from_rgb_image(&rgb).unwrap(), img);
        assert_eq!(img.to_grid(), grid);
    }
}
