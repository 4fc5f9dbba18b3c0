//! Runtime texture swapping.
//!
//! The [`TextureSelector`] owns the loaded scene, the texture catalog and a side
//! table holding the base-colour texture every mesh had when the scene was loaded.
//! Selecting a catalog name points every material at that texture, selecting the
//! [`ORIGINAL_SELECTION`] sentinel (or anything the catalog doesn't know) puts the
//! recorded originals back.

use std::collections::HashMap;

use crate::{
    config::ORIGINAL_SELECTION,
    data_structures::{
        material::{Material, MeshId},
        scene_graph::SceneNode,
        texture::TextureHandle,
    },
};

/// Anything whose meshes the selector can walk.
///
/// The visitor is called once per mesh with the mesh's id and its material, if it has one.
pub trait MeshSource {
    fn visit_meshes(&mut self, visitor: &mut dyn FnMut(MeshId, Option<&mut Material>));
}

impl MeshSource for Box<dyn SceneNode> {
    fn visit_meshes(&mut self, visitor: &mut dyn FnMut(MeshId, Option<&mut Material>)) {
        self.visit_meshes_mut(visitor);
    }
}

/// Named textures the user can pick from. Keeps insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextureCatalog {
    entries: Vec<(String, TextureHandle)>,
}

impl TextureCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `name`, replacing the texture of an existing entry with the same name.
    pub fn insert(&mut self, name: impl Into<String>, texture: TextureHandle) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = texture,
            None => self.entries.push((name, texture)),
        }
    }

    pub fn get(&self, name: &str) -> Option<TextureHandle> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, texture)| *texture)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Interpret a value coming from the selection control.
    pub fn resolve(&self, value: &str) -> Selection {
        if value.is_empty() || value == ORIGINAL_SELECTION {
            return Selection::Original;
        }
        match self.get(value) {
            Some(texture) => Selection::Catalog {
                name: value.to_string(),
                texture,
            },
            None => Selection::Unrecognized(value.to_string()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selection {
    /// Show the textures the meshes were loaded with.
    Original,
    Catalog { name: String, texture: TextureHandle },
    /// Neither a catalog name nor the sentinel. Treated like [`Selection::Original`].
    Unrecognized(String),
}

/// What a mesh looked like when its scene was captured.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MeshEntry {
    /// Base-colour texture at load time, `None` if the material had none.
    pub original: Option<TextureHandle>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectorPhase {
    /// No scene captured yet, selections are ignored.
    Empty,
    Captured,
    Applied,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Nothing captured yet; nothing changed.
    NotLoaded,
    Applied { name: String, meshes: usize },
    Restored { meshes: usize },
    /// The value was unknown and the originals were restored.
    FellBack { value: String, meshes: usize },
}

impl ApplyOutcome {
    /// Number of materials that were touched.
    pub fn meshes(&self) -> usize {
        match self {
            ApplyOutcome::NotLoaded => 0,
            ApplyOutcome::Applied { meshes, .. }
            | ApplyOutcome::Restored { meshes }
            | ApplyOutcome::FellBack { meshes, .. } => *meshes,
        }
    }
}

pub struct TextureSelector<S> {
    catalog: TextureCatalog,
    scene: Option<S>,
    entries: HashMap<MeshId, MeshEntry>,
    selection: Option<String>,
}

impl<S: MeshSource> TextureSelector<S> {
    pub fn new(catalog: TextureCatalog) -> Self {
        Self {
            catalog,
            scene: None,
            entries: HashMap::new(),
            selection: None,
        }
    }

    /// Take ownership of a freshly loaded scene and record the original texture of every
    /// mesh that has a material. Returns the number of entries.
    ///
    /// A previously captured scene is replaced together with its entries.
    pub fn capture(&mut self, mut scene: S) -> usize {
        if self.scene.is_some() {
            log::info!("replacing the loaded scene, dropping {} entries", self.entries.len());
        }
        self.entries.clear();
        self.selection = None;

        let entries = &mut self.entries;
        scene.visit_meshes(&mut |id, material| {
            let Some(material) = material else {
                log::debug!("mesh {id} has no material, not captured");
                return;
            };
            entries.entry(id).or_insert(MeshEntry {
                original: material.base_colour(),
            });
        });
        self.scene = Some(scene);
        log::info!("captured original textures of {} meshes", self.entries.len());
        self.entries.len()
    }

    /// Show `value` on every mesh with a material.
    ///
    /// Catalog names switch to the catalog texture, anything else restores the originals.
    /// Every touched material is flagged for a bind group rebuild.
    pub fn apply(&mut self, value: &str) -> ApplyOutcome {
        let Some(scene) = self.scene.as_mut() else {
            log::debug!("ignoring selection '{value}', no model loaded yet");
            return ApplyOutcome::NotLoaded;
        };

        let selection = self.catalog.resolve(value);
        let replacement = match &selection {
            Selection::Catalog { texture, .. } => Some(*texture),
            Selection::Original => None,
            Selection::Unrecognized(value) => {
                log::warn!("'{value}' is not in the texture catalog, restoring original textures");
                None
            }
        };

        let entries = &self.entries;
        let mut meshes = 0;
        scene.visit_meshes(&mut |id, material| {
            let Some(material) = material else {
                return;
            };
            let texture = match replacement {
                Some(texture) => Some(texture),
                None => entries.get(&id).and_then(|entry| entry.original),
            };
            material.set_base_colour(texture);
            material.mark_needs_update();
            meshes += 1;
        });

        self.selection = Some(value.to_string());
        match selection {
            Selection::Catalog { name, .. } => ApplyOutcome::Applied { name, meshes },
            Selection::Original => ApplyOutcome::Restored { meshes },
            Selection::Unrecognized(value) => ApplyOutcome::FellBack { value, meshes },
        }
    }

    pub fn entry(&self, id: MeshId) -> Option<&MeshEntry> {
        self.entries.get(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn phase(&self) -> SelectorPhase {
        match (&self.scene, &self.selection) {
            (None, _) => SelectorPhase::Empty,
            (Some(_), None) => SelectorPhase::Captured,
            (Some(_), Some(_)) => SelectorPhase::Applied,
        }
    }

    /// The last applied value since the scene was captured.
    pub fn selection(&self) -> Option<&str> {
        self.selection.as_deref()
    }

    pub fn catalog(&self) -> &TextureCatalog {
        &self.catalog
    }

    pub fn scene(&self) -> Option<&S> {
        self.scene.as_ref()
    }

    pub fn scene_mut(&mut self) -> Option<&mut S> {
        self.scene.as_mut()
    }
}
