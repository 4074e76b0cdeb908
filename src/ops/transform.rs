// ============================================================================
// TRANSFORM OPERATIONS: downscale resampling
// ============================================================================

use rayon::prelude::*;

use crate::canvas::Image;
use crate::error::{EditError, Result};
use crate::ops::ImageOperation;

/// Distance from an integer below which a source coordinate counts as
/// exactly on the pixel grid.
const ALIGN_EPSILON: f64 = 1e-6;

/// Shrink an image by independent horizontal and vertical factors in `(0, 1]`.
///
/// Output size is `floor(width * x_scale) × floor(height * y_scale)`. Each
/// output pixel maps back to a fractional source position; positions on the
/// pixel grid along either axis copy the source pixel, all others blend the
/// four surrounding pixels bilinearly (truncating the result).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DownscaleOperation {
    x_scale: f64,
    y_scale: f64,
}

impl DownscaleOperation {
    pub fn new(x_scale: f64, y_scale: f64) -> Result<Self> {
        for (axis, s) in [("x", x_scale), ("y", y_scale)] {
            // written to also reject NaN
            if !(s > 0.0 && s <= 1.0) {
                return Err(EditError::invalid(format!(
                    "{} scale must be in (0, 1], got {}",
                    axis, s
                )));
            }
        }
        Ok(Self { x_scale, y_scale })
    }

    pub fn uniform(scale: f64) -> Result<Self> {
        Self::new(scale, scale)
    }

    pub fn scales(&self) -> (f64, f64) {
        (self.x_scale, self.y_scale)
    }

    /// Output dimensions for a `width`×`height` source.
    pub fn target_size(&self, width: usize, height: usize) -> (usize, usize) {
        (
            (width as f64 * self.x_scale).floor() as usize,
            (height as f64 * self.y_scale).floor() as usize,
        )
    }
}

impl ImageOperation for DownscaleOperation {
    fn apply(&self, image: &Image) -> Result<Image> {
        let (w, h) = image.dimensions();
        let (nw, nh) = self.target_size(w, h);
        if nw == 0 || nh == 0 {
            return Err(EditError::invalid(format!(
                "downscaling {}x{} by ({}, {}) leaves no pixels",
                w, h, self.x_scale, self.y_scale
            )));
        }

        let ratio_x = w as f64 / nw as f64;
        let ratio_y = h as f64 / nh as f64;

        let mut out = vec![[0i32; 3]; nw * nh];
        out.par_chunks_mut(nw).enumerate().for_each(|(y, row_out)| {
            let sy = ratio_y * y as f64;
            for (x, dst) in row_out.iter_mut().enumerate() {
                let sx = ratio_x * x as f64;
                *dst = sample(image, sx, sy);
            }
        });

        Image::from_values(nw, nh, out, true)
    }

    fn name(&self) -> &str {
        "downscale"
    }
}

#[inline]
fn is_aligned(v: f64) -> bool {
    (v - v.round()).abs() < ALIGN_EPSILON
}

/// Sample `img` at fractional column `sx`, row `sy`.
fn sample(img: &Image, sx: f64, sy: f64) -> [i32; 3] {
    let (w, h) = img.dimensions();
    let x_aligned = is_aligned(sx);
    let y_aligned = is_aligned(sy);

    if x_aligned || y_aligned {
        let col = if x_aligned { sx.round() } else { sx.floor() } as usize;
        let row = if y_aligned { sy.round() } else { sy.floor() } as usize;
        let [r, g, b] = img.pixel(row.min(h - 1), col.min(w - 1)).channels();
        return [r as i32, g as i32, b as i32];
    }

    let (xf, xc) = (sx.floor(), sx.ceil());
    let (yf, yc) = (sy.floor(), sy.ceil());
    let (x0, x1) = ((xf as usize).min(w - 1), (xc as usize).min(w - 1));
    let (y0, y1) = ((yf as usize).min(h - 1), (yc as usize).min(h - 1));

    let ca = img.pixel(y0, x0).channels();
    let cb = img.pixel(y0, x1).channels();
    let cc = img.pixel(y1, x0).channels();
    let cd = img.pixel(y1, x1).channels();

    let mut out = [0i32; 3];
    for c in 0..3 {
        let m = cb[c] as f64 * (sx - xf) + ca[c] as f64 * (xc - sx);
        let n = cd[c] as f64 * (sx - xf) + cc[c] as f64 * (xc - sx);
        out[c] = (n * (sy - yf) + m * (yc - sy)) as i32;
    }
    out
}
