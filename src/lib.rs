//! texswap
//!
//! A small glTF viewer with runtime texture swapping, running natively and in
//! the browser (WASM, WebGL2). A model is loaded into an orbit-camera scene lit by
//! a single directional light; a selection control then swaps the base-colour
//! texture of every mesh for one of a catalog of textures and back again.
//!
//! High-level modules
//! - `selector`: texture catalog and the selector that swaps and restores textures
//! - `camera`: orbit camera, projection and mouse controls
//! - `config`: viewer configuration and its defaults
//! - `context`: central GPU and window context that owns device/queue/pipeline
//! - `data_structures`: meshes, materials, instances, textures and the scene graph
//! - `flow`: the application event loop
//! - `pipelines`: the scene render pipeline and the light uniform
//! - `resources`: asynchronous loading of models and textures
//! - `render`: draw calls
//! - `ui`: selection controls (HTML `<select>` or number keys)
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod selector;
pub mod ui;

pub use config::ViewerConfig;
pub use flow::run;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Entry point of the browser build.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn run_web() -> Result<(), JsValue> {
    run(ViewerConfig::default()).map_err(|e| JsValue::from_str(&format!("{e:#}")))
}
