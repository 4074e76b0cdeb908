// ============================================================================
// ADJUSTMENT OPERATIONS: per-pixel 3×3 color matrix transforms
// ============================================================================
//
// Each output channel is a weighted sum of the three input channels of the
// same pixel. Sums are truncated toward zero, then saturated into 0..=255.
// Rows are processed in parallel; pixels never influence each other.
// ============================================================================

use rayon::prelude::*;

use crate::canvas::Image;
use crate::error::{EditError, Result};
use crate::ops::ImageOperation;

/// BT.709 luminance weights.
const LUMA: [f64; 3] = [0.2126, 0.7152, 0.0722];

const SEPIA: [[f64; 3]; 3] = [
    [0.393, 0.769, 0.189],
    [0.349, 0.686, 0.168],
    [0.272, 0.534, 0.131],
];

#[derive(Clone, Debug, PartialEq)]
pub struct ColorTransformation {
    matrix: [[f64; 3]; 3],
    label: String,
}

impl ColorTransformation {
    pub fn new(matrix: [[f64; 3]; 3]) -> Self {
        Self { matrix, label: "color-matrix".to_string() }
    }

    /// Build from nested rows, rejecting anything that is not 3×3 or holds
    /// non-finite weights.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        if rows.len() != 3 || rows.iter().any(|r| r.len() != 3) {
            return Err(EditError::invalid("color transform matrix must be 3x3"));
        }
        if rows.iter().flatten().any(|v| !v.is_finite()) {
            return Err(EditError::invalid("color transform matrix has non-finite weights"));
        }
        let mut matrix = [[0.0; 3]; 3];
        for (dst, src) in matrix.iter_mut().zip(rows) {
            dst.copy_from_slice(src);
        }
        Ok(Self::new(matrix))
    }

    /// Luma-weighted greyscale: all three rows are identical.
    pub fn greyscale() -> Self {
        Self { matrix: [LUMA; 3], label: "greyscale".to_string() }
    }

    pub fn sepia() -> Self {
        Self { matrix: SEPIA, label: "sepia".to_string() }
    }

    pub fn matrix(&self) -> &[[f64; 3]; 3] {
        &self.matrix
    }
}

impl ImageOperation for ColorTransformation {
    fn apply(&self, image: &Image) -> Result<Image> {
        let (w, h) = image.dimensions();
        let m = &self.matrix;
        let src_px = image.pixels();

        let mut out = vec![[0i32; 3]; w * h];
        out.par_chunks_mut(w).enumerate().for_each(|(y, row_out)| {
            let row_in = &src_px[y * w..(y + 1) * w];
            for (dst, px) in row_out.iter_mut().zip(row_in) {
                let [r, g, b] = px.channels();
                let src = [r as f64, g as f64, b as f64];
                for (i, v) in dst.iter_mut().enumerate() {
                    let sum = m[i][0] * src[0] + m[i][1] * src[1] + m[i][2] * src[2];
                    *v = sum as i32;
                }
            }
        });

        Image::from_values(w, h, out, true)
    }

    fn name(&self) -> &str {
        &self.label
    }
}
