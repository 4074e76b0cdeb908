#![allow(dead_code)]

use layerfe::Image;
use layerfe::Pixel;
use layerfe::ops::patterns::{Stripes, checkerboard, rainbow};

pub const RED: Pixel = Pixel::from_rgb(255, 0, 0);
pub const BLUE: Pixel = Pixel::from_rgb(0, 0, 255);

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Every synthetic pattern shape the round-trip tests exercise.
pub fn synthetic_images() -> Vec<Image> {
    vec![
        checkerboard(1, 2, RED, BLUE).unwrap(),
        checkerboard(3, 5, Pixel::BLACK, Pixel::WHITE).unwrap(),
        checkerboard(1, 1, Pixel::from_rgb(12, 34, 56), BLUE).unwrap(),
        rainbow(21, 14, Stripes::Horizontal).unwrap(),
        rainbow(7, 30, Stripes::Vertical).unwrap(),
        rainbow(1, 1, Stripes::Horizontal).unwrap(),
    ]
}

pub fn solid(w: usize, h: usize, px: Pixel) -> Image {
    Image::filled(w, h, px).unwrap()
}
