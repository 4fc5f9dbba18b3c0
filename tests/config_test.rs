use texswap::{
    config::{CameraConfig, ORIGINAL_SELECTION, ViewerConfig, hex_to_rgb},
    context::{surface_extent, surface_size},
};
use winit::dpi::PhysicalSize;

#[test]
fn packed_colours_are_split_into_channels() {
    assert_eq!(hex_to_rgb(0x0fffff), [15.0 / 255.0, 1.0, 1.0]);
    assert_eq!(hex_to_rgb(0x000000), [0.0, 0.0, 0.0]);
    assert_eq!(hex_to_rgb(0xff0080), [1.0, 0.0, 128.0 / 255.0]);
}

#[test]
fn default_viewer_shows_the_kitchen() {
    let config = ViewerConfig::default();

    assert_eq!(config.model_path, "models/Kitchen.glb");
    let names: Vec<&str> = config.catalog.iter().map(|entry| entry.name.as_str()).collect();
    assert_eq!(names, vec!["cardboard", "wood"]);
    assert!(!names.contains(&ORIGINAL_SELECTION));
    assert_eq!(config.sample_count, 4);
    assert_eq!(config.max_pixel_ratio, 2.0);
}

#[test]
fn default_camera_is_damped() {
    let camera = CameraConfig::default();

    assert_eq!(camera.position, [2.0, 2.0, 5.0]);
    assert_eq!(camera.fovy, 75.0);
    assert_eq!(camera.damping_factor, Some(0.05));
    assert!(camera.min_distance <= camera.max_distance);
}

#[test]
fn surface_keeps_the_physical_size_up_to_the_pixel_ratio_cap() {
    let size = PhysicalSize::new(1600, 1200);

    assert_eq!(surface_size(size, 1.0, 2.0), size);
    assert_eq!(surface_size(size, 2.0, 2.0), size);
}

#[test]
fn surface_is_scaled_down_above_the_pixel_ratio_cap() {
    // 800x600 logical pixels on a 4x display, capped at 2x
    let size = PhysicalSize::new(3200, 2400);

    assert_eq!(surface_size(size, 4.0, 2.0), PhysicalSize::new(1600, 1200));
}

#[test]
#[cfg(not(target_arch = "wasm32"))]
fn native_surface_matches_the_window() {
    let size = PhysicalSize::new(3200, 2400);

    assert_eq!(surface_extent(size, 4.0, 2.0), size);
}
