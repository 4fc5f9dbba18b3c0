use futures::{StreamExt, channel::mpsc};

/**
 * This module contains all logic for loading models and textures from external files.
 *
 * Loading is split in two: the asynchronous fetch in this module only touches bytes
 * (filesystem natively, HTTP in the browser) and can run off the event loop, while
 * turning a fetched asset into GPU resources happens on the event loop in
 * `data_structures::scene_graph::build_scene_graph`.
 */
pub mod scene;
pub mod texture;

pub use self::scene::{GltfAsset, ImageData, load_gltf_asset};

/// How far a file transfer has come.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadProgress {
    pub loaded: u64,
    /// Unknown when the source does not announce a length.
    pub total: Option<u64>,
}

impl LoadProgress {
    /// Share of the transfer that is done, in `0.0..=1.0`.
    pub fn ratio(&self) -> Option<f64> {
        match self.total {
            Some(0) => Some(1.0),
            Some(total) => Some((self.loaded as f64 / total as f64).min(1.0)),
            None => None,
        }
    }

    pub fn percent(&self) -> Option<f64> {
        self.ratio().map(|ratio| ratio * 100.0)
    }
}

pub type ProgressSender = mpsc::UnboundedSender<LoadProgress>;
pub type ProgressReceiver = mpsc::UnboundedReceiver<LoadProgress>;

pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    mpsc::unbounded()
}

/// Result of an asset load: the fetched asset or the reason it could not be fetched.
#[derive(Debug)]
pub enum AssetLoad {
    Loaded(Box<GltfAsset>),
    Failed(anyhow::Error),
}

impl From<anyhow::Result<GltfAsset>> for AssetLoad {
    fn from(result: anyhow::Result<GltfAsset>) -> Self {
        match result {
            Ok(asset) => AssetLoad::Loaded(Box::new(asset)),
            Err(e) => AssetLoad::Failed(e),
        }
    }
}

/// Log every progress message of a load until the sending side is dropped.
pub async fn log_progress(file_name: String, mut progress: ProgressReceiver) {
    while let Some(update) = progress.next().await {
        match update.percent() {
            Some(percent) => log::info!("{file_name}: {percent:.0}% loaded"),
            None => log::info!("{file_name}: {} bytes loaded", update.loaded),
        }
    }
}

/// Resolve `uri` relative to the directory of `file_name`, the way glTF references its buffers and images.
pub fn sibling_path(file_name: &str, uri: &str) -> String {
    match file_name.rfind('/') {
        Some(idx) => format!("{}/{}", &file_name[..idx], uri),
        None => uri.to_string(),
    }
}

/// Asset path of a buffer or image `uri` referenced by the glTF file `file_name`.
///
/// glTF URIs are percent-encoded. The browser fetch resolves them as URLs as they
/// are, the filesystem needs them decoded.
pub fn resolve_uri(file_name: &str, uri: &str) -> String {
    #[cfg(not(target_arch = "wasm32"))]
    let uri = percent_encoding::percent_decode_str(uri).decode_utf8_lossy();
    sibling_path(file_name, &uri)
}
