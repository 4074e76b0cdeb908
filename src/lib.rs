//! Layered raster image editing core.
//!
//! A [`LayerStack`] holds named, independently visible layers, each with at
//! most one immutable [`Image`]. Operations from [`ops`] turn one image into
//! a new one; [`io`] moves images and whole stacks through byte streams.

pub mod canvas;
pub mod error;
pub mod io;
pub mod layers;
pub mod ops;

pub use crate::canvas::{Channel, Image, Pixel};
pub use crate::error::{EditError, ErrorKind, Result};
pub use crate::layers::{Layer, LayerStack};
pub use crate::ops::ImageOperation;
