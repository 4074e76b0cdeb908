// ============================================================================
// OPERATION ENGINE: stateless Image -> Image transformations
// ============================================================================

pub mod adjustments;
pub mod effects;
pub mod filters;
pub mod patterns;
pub mod transform;

pub use adjustments::ColorTransformation;
pub use effects::MosaicOperation;
pub use filters::FilterOperation;
pub use transform::DownscaleOperation;

use crate::canvas::Image;
use crate::error::Result;

/// A transformation producing a new image from an existing one.
///
/// Implementations never mutate their input. Parameter validation happens in
/// the constructors, so `apply` only fails for input-dependent reasons (for
/// example a mosaic asking for more seeds than the image has pixels).
pub trait ImageOperation: Send + Sync {
    fn apply(&self, image: &Image) -> Result<Image>;

    /// Short human-readable label used in logs.
    fn name(&self) -> &str;
}

impl<T: ImageOperation + ?Sized> ImageOperation for Box<T> {
    fn apply(&self, image: &Image) -> Result<Image> {
        (**self).apply(image)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
