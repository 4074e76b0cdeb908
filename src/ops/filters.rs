// ============================================================================
// IMAGE FILTERS: square-kernel convolution (blur, sharpen)
// ============================================================================

use rayon::prelude::*;

use crate::canvas::Image;
use crate::error::{EditError, Result};
use crate::ops::ImageOperation;

/// Convolution with an odd-sized square kernel.
///
/// Samples falling outside the image contribute zero, so edges darken under
/// a blur. Each channel sum is truncated toward zero and then saturated into
/// `0..=255`.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterOperation {
    kernel: Vec<Vec<f64>>,
    label: String,
}

impl FilterOperation {
    pub fn new(kernel: Vec<Vec<f64>>) -> Result<Self> {
        Self::with_label(kernel, "filter")
    }

    fn with_label(kernel: Vec<Vec<f64>>, label: &str) -> Result<Self> {
        let size = kernel.len();
        if size == 0 {
            return Err(EditError::invalid("filter kernel is empty"));
        }
        if size % 2 == 0 {
            return Err(EditError::invalid(format!(
                "filter kernel side must be odd, got {}",
                size
            )));
        }
        if let Some(row) = kernel.iter().find(|row| row.len() != size) {
            return Err(EditError::invalid(format!(
                "filter kernel must be square: row of {} in a {}-row kernel",
                row.len(),
                size
            )));
        }
        Ok(Self { kernel, label: label.to_string() })
    }

    /// 3×3 box blur with 1/16, 1/8, 1/4 weights.
    pub fn blur() -> Self {
        let k = vec![
            vec![1.0 / 16.0, 1.0 / 8.0, 1.0 / 16.0],
            vec![1.0 / 8.0, 1.0 / 4.0, 1.0 / 8.0],
            vec![1.0 / 16.0, 1.0 / 8.0, 1.0 / 16.0],
        ];
        Self { kernel: k, label: "blur".to_string() }
    }

    /// 5×5 sharpen: −1/8 outer ring, 1/4 inner ring, centre 1.
    pub fn sharpen() -> Self {
        let mut k = vec![vec![-1.0 / 8.0; 5]; 5];
        for row in k.iter_mut().take(4).skip(1) {
            for v in row.iter_mut().take(4).skip(1) {
                *v = 1.0 / 4.0;
            }
        }
        k[2][2] = 1.0;
        Self { kernel: k, label: "sharpen".to_string() }
    }

    pub fn kernel(&self) -> &[Vec<f64>] {
        &self.kernel
    }
}

impl ImageOperation for FilterOperation {
    fn apply(&self, image: &Image) -> Result<Image> {
        let w = image.width();
        let h = image.height();
        let size = self.kernel.len();
        let half = (size / 2) as isize;
        let kernel = &self.kernel;

        let mut out = vec![[0i32; 3]; w * h];
        out.par_chunks_mut(w).enumerate().for_each(|(row, row_out)| {
            for (col, dst) in row_out.iter_mut().enumerate() {
                let mut sum = [0.0f64; 3];
                for (i, krow) in kernel.iter().enumerate() {
                    let sy = row as isize + i as isize - half;
                    if sy < 0 || sy >= h as isize {
                        continue;
                    }
                    for (j, &kv) in krow.iter().enumerate() {
                        let sx = col as isize + j as isize - half;
                        if sx < 0 || sx >= w as isize {
                            continue;
                        }
                        let p = image.pixel(sy as usize, sx as usize).channels();
                        for c in 0..3 {
                            sum[c] += kv * p[c] as f64;
                        }
                    }
                }
                *dst = [sum[0] as i32, sum[1] as i32, sum[2] as i32];
            }
        });

        Image::from_values(w, h, out, true)
    }

    fn name(&self) -> &str {
        &self.label
    }
}
