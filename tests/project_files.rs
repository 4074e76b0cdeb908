mod common;

use common::{BLUE, RED, init_logging, solid};
use layerfe::LayerStack;
use layerfe::io::{load_project, save_project};
use layerfe::ops::patterns::{Stripes, rainbow};

#[test]
fn project_round_trip_preserves_stack() {
    init_logging();
    let mut stack = LayerStack::new();
    stack.add_layer("").unwrap();
    stack.add_layer("sky").unwrap();
    stack.add_layer("").unwrap();
    stack.set_layer_image("sky", rainbow(10, 7, Stripes::Horizontal).unwrap()).unwrap();
    stack.set_layer_image("Layer2", solid(10, 7, RED)).unwrap();
    stack.show_layer("Layer1", false).unwrap();
    stack.reorder_layer("Layer2", 0).unwrap();
    stack.set_current_layer("sky").unwrap();

    let mut bytes = Vec::new();
    save_project(&stack, &mut bytes).unwrap();
    let mut loaded = load_project(bytes.as_slice()).unwrap();

    let names: Vec<&str> = loaded.layers().map(|l| l.name()).collect();
    assert_eq!(names, ["Layer2", "Layer1", "sky"]);
    assert_eq!(loaded.current_name(), Some("sky"));
    assert!(!loaded.is_visible("Layer1").unwrap());
    assert!(loaded.image_in("Layer1").unwrap().is_none());
    assert_eq!(loaded.image_in("sky").unwrap(), stack.image_in("sky").unwrap());
    assert_eq!(*loaded.effective_image().unwrap(), solid(10, 7, RED));

    // the auto-name counter survives too
    assert_eq!(loaded.add_layer("").unwrap(), "Layer3");
}

#[test]
fn project_without_current_layer() {
    let mut stack = LayerStack::new();
    stack.add_layer("a").unwrap();
    stack.add_layer("b").unwrap();
    stack.set_layer_image("a", solid(2, 2, BLUE)).unwrap();
    stack.remove_layer("b").unwrap();
    assert_eq!(stack.current_name(), None);

    let mut bytes = Vec::new();
    save_project(&stack, &mut bytes).unwrap();
    let loaded = load_project(bytes.as_slice()).unwrap();
    assert_eq!(loaded.current_name(), None);
    assert_eq!(loaded.count(), 1);
}

#[test]
fn truncated_project_rejected() {
    let mut stack = LayerStack::new();
    stack.add_layer("a").unwrap();
    stack.set_layer_image("a", solid(4, 4, BLUE)).unwrap();
    let mut bytes = Vec::new();
    save_project(&stack, &mut bytes).unwrap();
    bytes.truncate(bytes.len() - 5);
    assert!(load_project(bytes.as_slice()).is_err());
}
