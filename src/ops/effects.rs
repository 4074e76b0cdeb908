// ============================================================================
// EFFECTS: mosaic (Voronoi-average) clustering
// ============================================================================
//
// Seeds are distinct random pixel coordinates. Every pixel joins its nearest
// seed (squared distance in row/col space, earliest seed wins ties) and is
// painted with the truncated average color of its cluster.
//
// The nearest-seed pass is row-parallel; the averaging pass is a sequential
// reduction so results never depend on thread scheduling.
// ============================================================================

use std::collections::HashSet;
use std::fmt;
use std::sync::Mutex;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::canvas::{Image, Pixel};
use crate::error::{EditError, Result};
use crate::ops::ImageOperation;

pub struct MosaicOperation<R = SmallRng> {
    num_seeds: usize,
    rng: Mutex<R>,
}

impl<R: Rng + Send> MosaicOperation<R> {
    /// Mosaic with `num_seeds` clusters drawn from `rng`.
    ///
    /// Each `apply` advances the generator, so two operations built from
    /// identically seeded generators produce identical output.
    pub fn new(num_seeds: usize, rng: R) -> Result<Self> {
        if num_seeds == 0 {
            return Err(EditError::invalid("mosaic needs at least one seed"));
        }
        Ok(Self { num_seeds, rng: Mutex::new(rng) })
    }

    pub fn num_seeds(&self) -> usize {
        self.num_seeds
    }
}

impl MosaicOperation<SmallRng> {
    pub fn seeded(num_seeds: usize, seed: u64) -> Result<Self> {
        Self::new(num_seeds, SmallRng::seed_from_u64(seed))
    }

    pub fn from_os_rng(num_seeds: usize) -> Result<Self> {
        Self::new(num_seeds, SmallRng::from_os_rng())
    }
}

impl<R> fmt::Debug for MosaicOperation<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MosaicOperation")
            .field("num_seeds", &self.num_seeds)
            .finish_non_exhaustive()
    }
}

impl<R: Rng + Send> ImageOperation for MosaicOperation<R> {
    fn apply(&self, image: &Image) -> Result<Image> {
        let (w, h) = image.dimensions();
        if self.num_seeds > image.pixel_count() {
            return Err(EditError::invalid(format!(
                "mosaic with {} seeds exceeds the {} pixels of a {}x{} image",
                self.num_seeds,
                image.pixel_count(),
                w,
                h
            )));
        }

        let seeds = {
            let mut rng = self
                .rng
                .lock()
                .map_err(|_| EditError::illegal("mosaic random source poisoned"))?;
            pick_seeds(&mut *rng, w, h, self.num_seeds)
        };

        let labels = nearest_seed_labels(&seeds, w, h);

        let mut sums = vec![[0u64; 3]; seeds.len()];
        let mut counts = vec![0u64; seeds.len()];
        for (px, &label) in image.pixels().iter().zip(&labels) {
            let [r, g, b] = px.channels();
            let s = &mut sums[label];
            s[0] += r as u64;
            s[1] += g as u64;
            s[2] += b as u64;
            counts[label] += 1;
        }

        // every seed is its own nearest pixel, so no cluster is empty
        let averages: Vec<Pixel> = sums
            .iter()
            .zip(&counts)
            .map(|(s, &n)| {
                let n = n.max(1);
                Pixel::from_rgb((s[0] / n) as u8, (s[1] / n) as u8, (s[2] / n) as u8)
            })
            .collect();

        let pixels = labels.iter().map(|&l| averages[l]).collect();
        Image::from_pixel_vec(w, h, pixels)
    }

    fn name(&self) -> &str {
        "mosaic"
    }
}

/// Draw `count` distinct (row, col) coordinates, in draw order.
fn pick_seeds<R: Rng + ?Sized>(rng: &mut R, w: usize, h: usize, count: usize) -> Vec<(usize, usize)> {
    let mut seen = HashSet::with_capacity(count);
    let mut seeds = Vec::with_capacity(count);
    while seeds.len() < count {
        let row = rng.random_range(0..h);
        let col = rng.random_range(0..w);
        if seen.insert((row, col)) {
            seeds.push((row, col));
        }
    }
    seeds
}

/// Row-major cluster index for every pixel.
fn nearest_seed_labels(seeds: &[(usize, usize)], w: usize, h: usize) -> Vec<usize> {
    let mut labels = vec![0usize; w * h];
    labels.par_chunks_mut(w).enumerate().for_each(|(row, row_out)| {
        for (col, label) in row_out.iter_mut().enumerate() {
            let mut best = u64::MAX;
            for (i, &(sr, sc)) in seeds.iter().enumerate() {
                let dr = row.abs_diff(sr) as u64;
                let dc = col.abs_diff(sc) as u64;
                let d = dr * dr + dc * dc;
                if d < best {
                    best = d;
                    *label = i;
                }
            }
        }
    });
    labels
}
