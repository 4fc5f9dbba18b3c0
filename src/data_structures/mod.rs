pub mod instance;
pub mod material;
pub mod model;
pub mod scene_graph;
pub mod texture;
