//! Scene graph and hierarchical scene organization.
//!
//! A loaded glTF scene becomes a tree of [`SceneNode`]s: [`ContainerNode`]s only
//! group and transform their children, [`ModelNode`]s additionally own the GPU
//! meshes of one glTF node. World transforms are derived from the local ones by
//! [`SceneNode::update_world_transforms`] and uploaded in
//! [`SceneNode::write_to_buffers`], which also rebuilds the bind groups of
//! materials flagged for an update.

use std::collections::HashMap;

use log::warn;
use wgpu::util::DeviceExt;

use crate::{
    context::Context,
    data_structures::{
        instance::{Instance, InstanceRaw},
        material::{Material, MeshId},
        model::{Mesh, Model},
        texture::{Texture, TextureHandle, TextureStore},
    },
    render::Instanced,
    resources::{
        GltfAsset, ImageData,
        scene::{MaterialDescription, MeshDescription, NodeDescription},
    },
};

pub trait SceneNode {
    /// Recompute this node's world transform from its parent's and pass it down to the children.
    fn update_world_transforms(&mut self, parent: &Instance);

    fn add_child(&mut self, child: Box<dyn SceneNode>);

    /// Upload changed transforms and rebuild outdated material bind groups, recursively.
    fn write_to_buffers(&mut self, ctx: &Context);

    /// Call `visitor` for every mesh in this subtree, depth first.
    fn visit_meshes_mut(&mut self, visitor: &mut dyn FnMut(MeshId, Option<&mut Material>));

    fn get_render(&self) -> Vec<Instanced<'_>>;
}

pub struct ContainerNode {
    children: Vec<Box<dyn SceneNode>>,
    local: Instance,
    world: Instance,
}

impl ContainerNode {
    pub fn new(local: Instance) -> Self {
        Self {
            children: Vec::new(),
            world: local.clone(),
            local,
        }
    }
}

impl SceneNode for ContainerNode {
    fn update_world_transforms(&mut self, parent: &Instance) {
        self.world = parent * &self.local;
        for child in self.children.iter_mut() {
            child.update_world_transforms(&self.world);
        }
    }

    fn add_child(&mut self, child: Box<dyn SceneNode>) {
        self.children.push(child);
    }

    fn write_to_buffers(&mut self, ctx: &Context) {
        self.children
            .iter_mut()
            .for_each(|child| child.write_to_buffers(ctx));
    }

    fn visit_meshes_mut(&mut self, visitor: &mut dyn FnMut(MeshId, Option<&mut Material>)) {
        for child in self.children.iter_mut() {
            child.visit_meshes_mut(visitor);
        }
    }

    fn get_render(&self) -> Vec<Instanced<'_>> {
        self.children
            .iter()
            .flat_map(|child| child.get_render())
            .collect()
    }
}

/// A node that draws meshes. glTF nodes are never instanced, so the instance
/// buffer always holds exactly one world transform.
pub struct ModelNode {
    children: Vec<Box<dyn SceneNode>>,
    local: Instance,
    world: Instance,
    instance_buffer: wgpu::Buffer,
    transform_dirty: bool,
    model: Model,
}

impl ModelNode {
    pub fn new(device: &wgpu::Device, model: Model, local: Instance) -> Self {
        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Instance Buffer"),
            contents: bytemuck::cast_slice(&[local.to_raw()]),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        Self {
            children: Vec::new(),
            world: local.clone(),
            local,
            instance_buffer,
            transform_dirty: false,
            model,
        }
    }
}

impl SceneNode for ModelNode {
    fn update_world_transforms(&mut self, parent: &Instance) {
        let world = parent * &self.local;
        if world != self.world {
            self.world = world;
            self.transform_dirty = true;
        }
        for child in self.children.iter_mut() {
            child.update_world_transforms(&self.world);
        }
    }

    fn add_child(&mut self, child: Box<dyn SceneNode>) {
        self.children.push(child);
    }

    fn write_to_buffers(&mut self, ctx: &Context) {
        if self.transform_dirty {
            let raw: [InstanceRaw; 1] = [self.world.to_raw()];
            ctx.queue
                .write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&raw));
            self.transform_dirty = false;
        }
        for mesh in self.model.meshes.iter_mut() {
            mesh.refresh_bind_group(&ctx.device, &ctx.material_layout, &ctx.textures);
        }
        self.children
            .iter_mut()
            .for_each(|child| child.write_to_buffers(ctx));
    }

    fn visit_meshes_mut(&mut self, visitor: &mut dyn FnMut(MeshId, Option<&mut Material>)) {
        for mesh in self.model.meshes.iter_mut() {
            visitor(mesh.id, mesh.material.as_mut());
        }
        for child in self.children.iter_mut() {
            child.visit_meshes_mut(visitor);
        }
    }

    fn get_render(&self) -> Vec<Instanced<'_>> {
        let mut renders = vec![Instanced {
            instance: &self.instance_buffer,
            model: &self.model,
            amount: 1,
        }];
        renders.extend(self.children.iter().flat_map(|child| child.get_render()));
        renders
    }
}

/// Decodes asset images into the texture store on first use.
///
/// The same image may be used as colour (sRGB) and as normal map (linear), so it is
/// cached per colour space.
struct ImageDecoder<'a> {
    images: &'a [Option<ImageData>],
    cache: HashMap<(usize, bool), Option<TextureHandle>>,
}

impl ImageDecoder<'_> {
    fn texture(
        &mut self,
        image: usize,
        is_normal_map: bool,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        store: &mut TextureStore,
    ) -> Option<TextureHandle> {
        let images = self.images;
        *self
            .cache
            .entry((image, is_normal_map))
            .or_insert_with(|| {
                let data = images.get(image)?.as_ref()?;
                let label = format!("image{image}");
                match Texture::from_bytes(
                    device,
                    queue,
                    &data.bytes,
                    &label,
                    data.extension.as_deref(),
                    is_normal_map,
                ) {
                    Ok(texture) => Some(store.insert(texture)),
                    Err(e) => {
                        warn!("{label} could not be decoded: {e:#}");
                        None
                    }
                }
            })
    }
}

/// Upload a loaded asset: decode its images, create one material per mesh and the
/// node hierarchy with its GPU buffers.
pub fn build_scene_graph(asset: GltfAsset, ctx: &mut Context) -> anyhow::Result<Box<dyn SceneNode>> {
    let GltfAsset {
        name,
        scene,
        images,
    } = asset;

    let mut decoder = ImageDecoder {
        images: &images,
        cache: HashMap::new(),
    };
    let materials: Vec<Material> = scene
        .materials
        .iter()
        .map(|description| {
            mk_material(
                description,
                &mut decoder,
                &ctx.device,
                &ctx.queue,
                &mut ctx.textures,
            )
        })
        .collect();
    log::debug!(
        "{name}: {} textures decoded for {} materials",
        decoder.cache.values().flatten().count(),
        materials.len()
    );

    let mut roots: Vec<Box<dyn SceneNode>> = scene
        .roots
        .into_iter()
        .map(|node| build_node(node, &materials, &ctx.device))
        .collect();

    let mut root = if roots.len() == 1 {
        roots.remove(0)
    } else {
        if roots.is_empty() {
            warn!("{name} contains no nodes");
        }
        let mut container = ContainerNode::new(Instance::default());
        for node in roots {
            container.add_child(node);
        }
        Box::new(container)
    };
    root.update_world_transforms(&Instance::default());
    Ok(root)
}

fn mk_material(
    description: &MaterialDescription,
    decoder: &mut ImageDecoder,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    store: &mut TextureStore,
) -> Material {
    let base_colour = description
        .base_colour_image
        .and_then(|image| decoder.texture(image, false, device, queue, store));
    let normal = description
        .normal_image
        .and_then(|image| decoder.texture(image, true, device, queue, store));
    Material::new(description.name.clone(), base_colour)
        .with_normal(normal)
        .with_base_colour_factor(description.base_colour_factor)
}

fn build_node(
    node: NodeDescription,
    materials: &[Material],
    device: &wgpu::Device,
) -> Box<dyn SceneNode> {
    let NodeDescription {
        index,
        name,
        transform,
        meshes,
        children,
    } = node;

    let mut scene_node: Box<dyn SceneNode> = if meshes.is_empty() {
        Box::new(ContainerNode::new(transform))
    } else {
        let model = Model {
            meshes: meshes
                .into_iter()
                .map(|mesh| mk_mesh(mesh, materials, device))
                .collect(),
        };
        log::debug!(
            "node {index} ({}): {} meshes",
            name.as_deref().unwrap_or("unnamed"),
            model.meshes.len()
        );
        Box::new(ModelNode::new(device, model, transform))
    };
    for child in children {
        scene_node.add_child(build_node(child, materials, device));
    }
    scene_node
}

fn mk_mesh(mesh: MeshDescription, materials: &[Material], device: &wgpu::Device) -> Mesh {
    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{:?} Vertex Buffer", mesh.name)),
        contents: bytemuck::cast_slice(&mesh.vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });
    let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{:?} Index Buffer", mesh.name)),
        contents: bytemuck::cast_slice(&mesh.indices),
        usage: wgpu::BufferUsages::INDEX,
    });
    let material = mesh.material.and_then(|index| {
        let material = materials.get(index).cloned();
        if material.is_none() {
            warn!("mesh {} references missing material {index}", mesh.id);
        }
        material
    });
    Mesh::new(
        mesh.id,
        mesh.name,
        vertex_buffer,
        index_buffer,
        mesh.indices.len() as u32,
        material,
    )
}
