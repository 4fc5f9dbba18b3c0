//! Viewer configuration.
//!
//! Every knob of the viewer lives in [`ViewerConfig`]. The defaults describe the
//! kitchen scene: a single GLB model, two swappable catalog textures, an orbit
//! camera a few units away from the origin and one directional light.

/// Selection value that restores the textures a model was loaded with.
pub const ORIGINAL_SELECTION: &str = "default";

/// A named texture offered by the selection control.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogEntry {
    pub name: String,
    /// Path relative to the assets directory.
    pub path: String,
}

impl CatalogEntry {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// Orbit camera and projection parameters.
#[derive(Clone, Debug)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub target: [f32; 3],
    /// Vertical field of view in degrees.
    pub fovy: f32,
    pub znear: f32,
    pub zfar: f32,
    /// Share of the pending motion applied per 60 Hz frame. `None` applies input immediately.
    pub damping_factor: Option<f32>,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [2.0, 2.0, 5.0],
            target: [0.0, 0.0, 0.0],
            fovy: 75.0,
            znear: 0.9,
            zfar: 100.0,
            damping_factor: Some(0.05),
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
        }
    }
}

/// The scene's single directional light. It shines from `position` towards the origin.
#[derive(Clone, Debug)]
pub struct LightConfig {
    pub position: [f32; 3],
    /// Packed `0xRRGGBB` colour.
    pub colour: u32,
    pub intensity: f32,
    /// Constant light added to every fragment, zero keeps unlit faces black.
    pub ambient: f32,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            position: [2.0, 2.0, 5.0],
            colour: 0x0fffff,
            intensity: 1.0,
            ambient: 0.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ViewerConfig {
    /// glTF or GLB file, relative to the assets directory.
    pub model_path: String,
    pub catalog: Vec<CatalogEntry>,
    pub camera: CameraConfig,
    pub light: LightConfig,
    pub clear_colour: wgpu::Color,
    /// MSAA sample count, `1` disables antialiasing.
    pub sample_count: u32,
    /// Upper bound for the device pixel ratio used to size the surface.
    pub max_pixel_ratio: f64,
    /// CSS selector of the canvas to render into (WASM only).
    pub canvas_selector: String,
    /// Id of the `<select>` element driving the texture swap (WASM only).
    pub select_element_id: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            model_path: "models/Kitchen.glb".to_string(),
            catalog: vec![
                CatalogEntry::new("cardboard", "textures/cardboard.jpg"),
                CatalogEntry::new("wood", "textures/wood.jpg"),
            ],
            camera: CameraConfig::default(),
            light: LightConfig::default(),
            clear_colour: wgpu::Color::BLACK,
            sample_count: 4,
            max_pixel_ratio: 2.0,
            canvas_selector: "canvas.threejs".to_string(),
            select_element_id: "texture-select".to_string(),
        }
    }
}

/// Unpack a `0xRRGGBB` colour into linear `[r, g, b]` components in `0.0..=1.0`.
pub fn hex_to_rgb(colour: u32) -> [f32; 3] {
    let channel = |shift: u32| ((colour >> shift) & 0xff) as f32 / 255.0;
    [channel(16), channel(8), channel(0)]
}
