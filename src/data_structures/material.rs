//! CPU-side mesh materials and mesh identity.

use std::fmt;

use crate::data_structures::texture::TextureHandle;

/// Stable identity of a mesh within a loaded scene graph.
///
/// glTF meshes are split into primitives and every primitive becomes its own
/// mesh, so the identity is the pair of the owning node's index and the
/// primitive's index within that node's mesh. Both come straight from the asset
/// and survive any rebuild of the GPU resources.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId {
    pub node: usize,
    pub primitive: usize,
}

impl MeshId {
    pub const fn new(node: usize, primitive: usize) -> Self {
        Self { node, primitive }
    }
}

impl fmt::Display for MeshId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node{}/prim{}", self.node, self.primitive)
    }
}

/// The material state the texture swap operates on.
///
/// GPU bind groups are derived from this state; whenever a slot changes the
/// material has to be flagged with [`mark_needs_update`](Self::mark_needs_update)
/// so the renderer rebuilds its bind group before the next frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub name: String,
    pub base_colour_factor: [f32; 4],
    base_colour: Option<TextureHandle>,
    normal: Option<TextureHandle>,
    needs_update: bool,
}

impl Material {
    pub fn new(name: impl Into<String>, base_colour: Option<TextureHandle>) -> Self {
        Self {
            name: name.into(),
            base_colour_factor: [1.0; 4],
            base_colour,
            normal: None,
            // a fresh material has no bind group yet
            needs_update: true,
        }
    }

    pub fn with_normal(mut self, normal: Option<TextureHandle>) -> Self {
        self.normal = normal;
        self
    }

    pub fn with_base_colour_factor(mut self, factor: [f32; 4]) -> Self {
        self.base_colour_factor = factor;
        self
    }

    /// The texture currently shown in the base-colour slot.
    pub fn base_colour(&self) -> Option<TextureHandle> {
        self.base_colour
    }

    pub fn set_base_colour(&mut self, texture: Option<TextureHandle>) {
        self.base_colour = texture;
    }

    pub fn normal(&self) -> Option<TextureHandle> {
        self.normal
    }

    pub fn mark_needs_update(&mut self) {
        self.needs_update = true;
    }

    pub fn needs_update(&self) -> bool {
        self.needs_update
    }

    /// Returns whether an update was pending and clears the flag.
    pub fn take_needs_update(&mut self) -> bool {
        std::mem::replace(&mut self.needs_update, false)
    }
}
