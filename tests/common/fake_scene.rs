#![allow(dead_code)]

use texswap::{
    data_structures::{
        material::{Material, MeshId},
        texture::TextureHandle,
    },
    selector::{MeshSource, TextureCatalog},
};

pub const T0: TextureHandle = TextureHandle::new(0);
pub const T1: TextureHandle = TextureHandle::new(1);
pub const T2: TextureHandle = TextureHandle::new(2);
pub const T3: TextureHandle = TextureHandle::new(3);

/// A scene without a GPU: a flat list of meshes, some of them without a material.
#[derive(Debug, Default)]
pub struct FakeScene {
    pub meshes: Vec<(MeshId, Option<Material>)>,
}

impl FakeScene {
    pub fn with_mesh(mut self, id: MeshId, material: Option<Material>) -> Self {
        self.meshes.push((id, material));
        self
    }

    pub fn material(&self, id: MeshId) -> Option<&Material> {
        self.meshes
            .iter()
            .find(|(mesh, _)| *mesh == id)
            .and_then(|(_, material)| material.as_ref())
    }

    pub fn material_mut(&mut self, id: MeshId) -> Option<&mut Material> {
        self.meshes
            .iter_mut()
            .find(|(mesh, _)| *mesh == id)
            .and_then(|(_, material)| material.as_mut())
    }

    /// Clear the update flag of every material, as a rendered frame would.
    pub fn settle(&mut self) {
        for (_, material) in self.meshes.iter_mut() {
            if let Some(material) = material {
                material.take_needs_update();
            }
        }
    }
}

impl MeshSource for FakeScene {
    fn visit_meshes(&mut self, visitor: &mut dyn FnMut(MeshId, Option<&mut Material>)) {
        for (id, material) in self.meshes.iter_mut() {
            visitor(*id, material.as_mut());
        }
    }
}

/// cardboard -> T1, wood -> T2
pub fn catalog() -> TextureCatalog {
    let mut catalog = TextureCatalog::new();
    catalog.insert("cardboard", T1);
    catalog.insert("wood", T2);
    catalog
}

pub fn textured(name: &str, texture: TextureHandle) -> Option<Material> {
    Some(Material::new(name, Some(texture)))
}
