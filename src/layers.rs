// ============================================================================
// LAYER STACK: ordered, named layers with a current-layer selection
// ============================================================================
//
// Invariants kept by every mutation:
//   * layer names are pairwise distinct
//   * all image-bearing layers share one width × height
//   * `current` is either None or the id of a layer in the stack
//
// Mutations validate everything before touching state, so a failed call
// leaves the stack exactly as it was.
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::canvas::Image;
use crate::error::{EditError, Result};
use crate::ops::ImageOperation;

/// Prefix for auto-generated layer names (`Layer1`, `Layer2`, …).
const AUTO_NAME_PREFIX: &str = "Layer";

/// A named slot holding at most one image.
#[derive(Clone, Debug)]
pub struct Layer {
    id: Uuid,
    name: String,
    visible: bool,
    image: Option<Arc<Image>>,
}

impl Layer {
    fn new(name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            visible: true,
            image: None,
        }
    }

    /// Identity that survives renames and reorders.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn image(&self) -> Option<&Arc<Image>> {
        self.image.as_ref()
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }
}

#[derive(Debug, Default)]
pub struct LayerStack {
    layers: Vec<Layer>,
    /// name -> position in `layers`; rebuilt whenever positions shift.
    index: HashMap<String, usize>,
    current: Option<Uuid>,
    /// Next suffix for auto-named layers. Never decreases.
    name_counter: u64,
}

impl LayerStack {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- layer CRUD ---------------------------------------------------------

    /// Append a visible, imageless layer and make it current.
    ///
    /// An empty `name` is replaced by `Layer<N>` from the stack's own
    /// counter, skipping numbers whose name is already taken. Returns the
    /// name actually used.
    pub fn add_layer(&mut self, name: &str) -> Result<String> {
        let (name, next_counter) = if name.is_empty() {
            let mut n = self.name_counter + 1;
            while self.index.contains_key(&format!("{}{}", AUTO_NAME_PREFIX, n)) {
                n += 1;
            }
            (format!("{}{}", AUTO_NAME_PREFIX, n), n)
        } else {
            validate_name(name)?;
            (name.to_string(), self.name_counter)
        };
        if self.index.contains_key(&name) {
            return Err(EditError::invalid(format!("layer '{}' already exists", name)));
        }

        let layer = Layer::new(name.clone());
        self.current = Some(layer.id);
        self.index.insert(name.clone(), self.layers.len());
        self.layers.push(layer);
        self.name_counter = next_counter;
        log::debug!("added layer '{}' at position {}", name, self.layers.len() - 1);
        Ok(name)
    }

    /// Remove a layer. If it was current, nothing is current afterwards.
    pub fn remove_layer(&mut self, name: &str) -> Result<()> {
        let pos = self.position(name)?;
        let removed = self.layers.remove(pos);
        if self.current == Some(removed.id) {
            self.current = None;
        }
        self.reindex();
        log::debug!("removed layer '{}'", name);
        Ok(())
    }

    pub fn rename_layer(&mut self, name: &str, new_name: &str) -> Result<()> {
        let pos = self.position(name)?;
        if name == new_name {
            return Ok(());
        }
        if new_name.is_empty() {
            return Err(EditError::invalid("layer name must not be empty"));
        }
        validate_name(new_name)?;
        if self.index.contains_key(new_name) {
            return Err(EditError::invalid(format!("layer '{}' already exists", new_name)));
        }

        self.layers[pos].name = new_name.to_string();
        self.index.remove(name);
        self.index.insert(new_name.to_string(), pos);
        log::debug!("renamed layer '{}' to '{}'", name, new_name);
        Ok(())
    }

    /// Move a layer to `new_index`, shifting the others. The current layer
    /// is unaffected.
    pub fn reorder_layer(&mut self, name: &str, new_index: usize) -> Result<()> {
        let pos = self.position(name)?;
        if new_index >= self.layers.len() {
            return Err(EditError::invalid(format!(
                "layer index {} out of range for {} layers",
                new_index,
                self.layers.len()
            )));
        }
        let layer = self.layers.remove(pos);
        self.layers.insert(new_index, layer);
        self.reindex();
        log::debug!("moved layer '{}' from {} to {}", name, pos, new_index);
        Ok(())
    }

    pub fn set_current_layer(&mut self, name: &str) -> Result<()> {
        let pos = self.position(name)?;
        self.current = Some(self.layers[pos].id);
        Ok(())
    }

    // ---- per-layer mutation -------------------------------------------------

    /// Replace a layer's image. The image must match the size of every other
    /// image-bearing layer.
    pub fn set_layer_image(&mut self, name: &str, image: impl Into<Arc<Image>>) -> Result<()> {
        let pos = self.position(name)?;
        let image = image.into();
        self.check_dimensions(pos, &image)?;
        self.layers[pos].image = Some(image);
        log::debug!("set image of layer '{}'", name);
        Ok(())
    }

    pub fn show_layer(&mut self, name: &str, visible: bool) -> Result<()> {
        let pos = self.position(name)?;
        self.layers[pos].visible = visible;
        Ok(())
    }

    /// Replace a layer's image with `op` applied to it.
    ///
    /// Fails with `IllegalState` when the layer holds no image, and with
    /// `InvalidArgument` when the result would break the shared size of the
    /// stack (e.g. downscaling one of several image-bearing layers).
    pub fn apply_operation(&mut self, name: &str, op: &dyn ImageOperation) -> Result<()> {
        let pos = self.position(name)?;
        let src = self.layers[pos]
            .image
            .as_ref()
            .ok_or_else(|| EditError::illegal(format!("layer '{}' has no image", name)))?;
        let result = Arc::new(op.apply(src)?);
        self.check_dimensions(pos, &result)?;
        self.layers[pos].image = Some(result);
        log::info!("applied {} to layer '{}'", op.name(), name);
        Ok(())
    }

    /// Apply `op` to every image-bearing layer, hidden ones included.
    ///
    /// All results are computed before any is stored, so a failure on one
    /// layer leaves every layer untouched.
    pub fn apply_to_all(&mut self, op: &dyn ImageOperation) -> Result<usize> {
        let mut results = Vec::new();
        for (pos, layer) in self.layers.iter().enumerate() {
            if let Some(img) = &layer.image {
                results.push((pos, Arc::new(op.apply(img)?)));
            }
        }
        if results.is_empty() {
            return Err(EditError::illegal("no layer holds an image"));
        }
        if let Some((_, first)) = results.first()
            && results.iter().any(|(_, r)| r.dimensions() != first.dimensions())
        {
            return Err(EditError::invalid(format!(
                "{} produced layers of different sizes",
                op.name()
            )));
        }

        let count = results.len();
        for (pos, img) in results {
            self.layers[pos].image = Some(img);
        }
        log::info!("applied {} to {} layers", op.name(), count);
        Ok(count)
    }

    // ---- queries ------------------------------------------------------------

    pub fn count(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layer_name_at(&self, index: usize) -> Result<&str> {
        self.layers
            .get(index)
            .map(|l| l.name.as_str())
            .ok_or_else(|| {
                EditError::invalid(format!(
                    "layer index {} out of range for {} layers",
                    index,
                    self.layers.len()
                ))
            })
    }

    pub fn layer(&self, name: &str) -> Result<&Layer> {
        Ok(&self.layers[self.position(name)?])
    }

    pub fn layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter()
    }

    pub fn is_visible(&self, name: &str) -> Result<bool> {
        Ok(self.layer(name)?.visible)
    }

    pub fn image_in(&self, name: &str) -> Result<Option<Arc<Image>>> {
        Ok(self.layer(name)?.image.clone())
    }

    pub fn current_name(&self) -> Option<&str> {
        let id = self.current?;
        self.layers.iter().find(|l| l.id == id).map(|l| l.name.as_str())
    }

    /// Shared width × height of the image-bearing layers, if any.
    pub fn dimensions(&self) -> Option<(usize, usize)> {
        self.layers
            .iter()
            .find_map(|l| l.image.as_ref().map(|img| img.dimensions()))
    }

    /// Image of the first layer in stack order that is visible and holds an
    /// image. This is what a flat export writes.
    pub fn effective_image(&self) -> Result<Arc<Image>> {
        self.layers
            .iter()
            .find(|l| l.visible && l.image.is_some())
            .and_then(|l| l.image.clone())
            .ok_or_else(|| EditError::illegal("no visible layer holds an image"))
    }

    pub(crate) fn name_counter(&self) -> u64 {
        self.name_counter
    }

    pub(crate) fn set_name_counter(&mut self, counter: u64) {
        self.name_counter = self.name_counter.max(counter);
    }

    pub(crate) fn clear_current(&mut self) {
        self.current = None;
    }

    pub(crate) fn current_position(&self) -> Option<usize> {
        let id = self.current?;
        self.layers.iter().position(|l| l.id == id)
    }

    // ---- internals ----------------------------------------------------------

    fn position(&self, name: &str) -> Result<usize> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| EditError::invalid(format!("no layer named '{}'", name)))
    }

    fn reindex(&mut self) {
        self.index = self
            .layers
            .iter()
            .enumerate()
            .map(|(i, l)| (l.name.clone(), i))
            .collect();
    }

    /// `image` must match every image-bearing layer other than `pos`.
    fn check_dimensions(&self, pos: usize, image: &Image) -> Result<()> {
        for (i, layer) in self.layers.iter().enumerate() {
            if i == pos {
                continue;
            }
            if let Some(other) = &layer.image
                && other.dimensions() != image.dimensions()
            {
                return Err(EditError::invalid(format!(
                    "image is {}x{} but layer '{}' holds {}x{}",
                    image.width(),
                    image.height(),
                    layer.name,
                    other.width(),
                    other.height()
                )));
            }
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.chars().any(char::is_whitespace) {
        return Err(EditError::invalid(format!(
            "layer name '{}' must not contain whitespace",
            name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Pixel;
    use crate::error::ErrorKind;
    use crate::ops::{ColorTransformation, DownscaleOperation};

    fn solid(w: usize, h: usize, v: u8) -> Image {
        Image::filled(w, h, Pixel::from_rgb(v, v, v)).unwrap()
    }

    #[test]
    fn empty_names_are_numbered_per_stack() {
        let mut a = LayerStack::new();
        assert_eq!(a.add_layer("").unwrap(), "Layer1");
        assert_eq!(a.add_layer("").unwrap(), "Layer2");
        a.remove_layer("Layer2").unwrap();
        assert_eq!(a.add_layer("").unwrap(), "Layer3");

        let mut b = LayerStack::new();
        assert_eq!(b.add_layer("").unwrap(), "Layer1");
    }

    #[test]
    fn auto_names_skip_taken_names() {
        let mut s = LayerStack::new();
        s.add_layer("Layer1").unwrap();
        s.add_layer("Layer3").unwrap();
        assert_eq!(s.add_layer("").unwrap(), "Layer2");
        assert_eq!(s.add_layer("").unwrap(), "Layer4");
        assert_eq!(s.add_layer("").unwrap(), "Layer5");
        assert_eq!(s.count(), 5);
        assert_eq!(s.name_counter(), 5);
    }

    #[test]
    fn add_makes_layer_current_and_visible() {
        let mut s = LayerStack::new();
        assert_eq!(s.current_name(), None);
        s.add_layer("base").unwrap();
        s.add_layer("top").unwrap();
        assert_eq!(s.current_name(), Some("top"));
        assert!(s.is_visible("top").unwrap());
        assert!(s.image_in("top").unwrap().is_none());
        assert_eq!(s.layer_name_at(1).unwrap(), "top");
        assert!(s.layer_name_at(2).is_err());
    }

    #[test]
    fn duplicate_and_whitespace_names_rejected() {
        let mut s = LayerStack::new();
        s.add_layer("a").unwrap();
        assert!(s.add_layer("a").is_err());
        assert!(s.add_layer("two words").is_err());
        assert_eq!(s.count(), 1);
    }

    #[test]
    fn removing_current_clears_selection() {
        let mut s = LayerStack::new();
        s.add_layer("a").unwrap();
        s.add_layer("b").unwrap();
        s.remove_layer("b").unwrap();
        assert_eq!(s.current_name(), None);
        assert!(s.remove_layer("b").is_err());
        assert_eq!(s.layer_name_at(0).unwrap(), "a");
    }

    #[test]
    fn reorder_keeps_current() {
        let mut s = LayerStack::new();
        for n in ["a", "b", "c"] {
            s.add_layer(n).unwrap();
        }
        s.set_current_layer("a").unwrap();
        s.reorder_layer("a", 2).unwrap();
        let order: Vec<&str> = s.layers().map(|l| l.name()).collect();
        assert_eq!(order, ["b", "c", "a"]);
        assert_eq!(s.current_name(), Some("a"));
        assert!(s.reorder_layer("a", 3).is_err());
        assert!(s.reorder_layer("zz", 0).is_err());
        // lookups still resolve after the shift
        s.show_layer("c", false).unwrap();
        assert!(!s.is_visible("c").unwrap());
    }

    #[test]
    fn rename_follows_current_and_checks_collisions() {
        let mut s = LayerStack::new();
        s.add_layer("a").unwrap();
        s.add_layer("b").unwrap();
        assert!(s.rename_layer("a", "b").is_err());
        assert!(s.rename_layer("a", "").is_err());
        s.rename_layer("b", "b").unwrap();
        s.rename_layer("b", "renamed").unwrap();
        assert_eq!(s.current_name(), Some("renamed"));
        assert!(s.layer("b").is_err());
        s.add_layer("b").unwrap();
        assert_eq!(s.count(), 3);
    }

    #[test]
    fn images_must_share_dimensions() {
        let mut s = LayerStack::new();
        s.add_layer("a").unwrap();
        s.add_layer("b").unwrap();
        s.set_layer_image("a", solid(4, 3, 10)).unwrap();
        let err = s.set_layer_image("b", solid(3, 4, 10)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(s.image_in("b").unwrap().is_none());
        s.set_layer_image("b", solid(4, 3, 20)).unwrap();
        // a lone image-bearing layer may change size
        s.remove_layer("b").unwrap();
        s.set_layer_image("a", solid(8, 8, 0)).unwrap();
        assert_eq!(s.dimensions(), Some((8, 8)));
    }

    #[test]
    fn apply_operation_requires_image() {
        let mut s = LayerStack::new();
        s.add_layer("a").unwrap();
        let grey = ColorTransformation::greyscale();
        assert_eq!(s.apply_operation("a", &grey).unwrap_err().kind(), ErrorKind::IllegalState);
        assert_eq!(s.apply_operation("nope", &grey).unwrap_err().kind(), ErrorKind::InvalidArgument);

        s.set_layer_image("a", Image::filled(2, 2, Pixel::from_rgb(255, 0, 0)).unwrap()).unwrap();
        s.apply_operation("a", &grey).unwrap();
        let img = s.image_in("a").unwrap().unwrap();
        assert_eq!(img.pixel_at(0, 0).unwrap(), Pixel::from_rgb(54, 54, 54));
    }

    #[test]
    fn resizing_one_of_several_layers_is_refused() {
        let mut s = LayerStack::new();
        s.add_layer("a").unwrap();
        s.add_layer("b").unwrap();
        s.set_layer_image("a", solid(4, 4, 1)).unwrap();
        s.set_layer_image("b", solid(4, 4, 2)).unwrap();
        let half = DownscaleOperation::uniform(0.5).unwrap();
        assert!(s.apply_operation("a", &half).is_err());
        assert_eq!(s.image_in("a").unwrap().unwrap().dimensions(), (4, 4));

        assert_eq!(s.apply_to_all(&half).unwrap(), 2);
        assert_eq!(s.dimensions(), Some((2, 2)));
        assert_eq!(s.image_in("b").unwrap().unwrap().dimensions(), (2, 2));
    }

    #[test]
    fn apply_to_all_needs_an_image() {
        let mut s = LayerStack::new();
        s.add_layer("").unwrap();
        let err = s.apply_to_all(&ColorTransformation::sepia()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IllegalState);
    }

    #[test]
    fn export_picks_first_visible_image() {
        let mut s = LayerStack::new();
        assert!(s.effective_image().is_err());
        s.add_layer("layer1").unwrap();
        s.add_layer("layer2").unwrap();
        s.add_layer("layer3").unwrap();
        let x = solid(2, 2, 99);
        s.set_layer_image("layer1", solid(2, 2, 1)).unwrap();
        s.show_layer("layer1", false).unwrap();
        s.set_layer_image("layer3", x.clone()).unwrap();
        assert_eq!(*s.effective_image().unwrap(), x);

        s.show_layer("layer3", false).unwrap();
        assert_eq!(s.effective_image().unwrap_err().kind(), ErrorKind::IllegalState);
    }

    #[test]
    fn layers_can_share_one_image() {
        let mut s = LayerStack::new();
        s.add_layer("a").unwrap();
        s.add_layer("b").unwrap();
        let shared = Arc::new(solid(3, 3, 7));
        s.set_layer_image("a", Arc::clone(&shared)).unwrap();
        s.set_layer_image("b", Arc::clone(&shared)).unwrap();
        s.apply_operation("b", &ColorTransformation::sepia()).unwrap();
        assert_eq!(*s.image_in("a").unwrap().unwrap(), *shared);
        assert_ne!(s.layer("a").unwrap().id(), s.layer("b").unwrap().id());
    }
}
