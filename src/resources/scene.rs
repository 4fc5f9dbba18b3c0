use anyhow::{Context as _, bail};
use cgmath::InnerSpace;

use crate::{
    data_structures::{instance::Instance, material::MeshId, model::ModelVertex},
    resources::{
        AssetLoad, ProgressSender, resolve_uri,
        texture::{load_binary, load_binary_with_progress},
    },
};

/// Encoded image as found in the asset, decoded once its colour space is known.
#[derive(Clone, Debug)]
pub struct ImageData {
    pub bytes: Vec<u8>,
    /// File extension hint derived from the mime type or the uri.
    pub extension: Option<String>,
}

/// A fetched glTF model: the CPU description of its scene plus the encoded images it references.
#[derive(Debug)]
pub struct GltfAsset {
    pub name: String,
    pub scene: SceneDescription,
    /// Indexed like the document's images; `None` where an image could not be fetched.
    pub images: Vec<Option<ImageData>>,
}

#[derive(Clone, Debug, Default)]
pub struct SceneDescription {
    pub roots: Vec<NodeDescription>,
    pub materials: Vec<MaterialDescription>,
}

impl SceneDescription {
    /// Depth-first iterator over every mesh in the scene.
    pub fn meshes(&self) -> impl Iterator<Item = &MeshDescription> {
        let mut stack: Vec<&NodeDescription> = self.roots.iter().rev().collect();
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.iter().rev());
            Some(node.meshes.iter())
        })
        .flatten()
    }
}

#[derive(Clone, Debug)]
pub struct NodeDescription {
    pub index: usize,
    pub name: Option<String>,
    pub transform: Instance,
    pub meshes: Vec<MeshDescription>,
    pub children: Vec<NodeDescription>,
}

#[derive(Clone, Debug)]
pub struct MeshDescription {
    pub id: MeshId,
    pub name: String,
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
    /// Index into [`SceneDescription::materials`]; `None` when the primitive has no material.
    pub material: Option<usize>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MaterialDescription {
    pub name: String,
    pub base_colour_factor: [f32; 4],
    /// Image index of the base colour texture.
    pub base_colour_image: Option<usize>,
    /// Image index of the normal texture.
    pub normal_image: Option<usize>,
}

/// Fetch and describe the glTF/GLB model at `file_name`.
///
/// Progress of the main file is reported on `progress`; the sender is dropped when the
/// load completes so a listener knows no more messages will follow.
pub async fn load_gltf_asset(file_name: &str, progress: Option<ProgressSender>) -> AssetLoad {
    let result = fetch_gltf_asset(file_name, progress).await;
    if let Err(e) = &result {
        log::error!("An error happened while loading {file_name}: {e:#}");
    }
    result.into()
}

async fn fetch_gltf_asset(
    file_name: &str,
    progress: Option<ProgressSender>,
) -> anyhow::Result<GltfAsset> {
    let gltf_bytes = load_binary_with_progress(file_name, progress.as_ref()).await?;
    drop(progress);
    let gltf = ::gltf::Gltf::from_slice(&gltf_bytes)
        .with_context(|| format!("{file_name} is not a valid glTF/GLB file"))?;

    // Load buffers
    let mut buffers: Vec<Vec<u8>> = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            ::gltf::buffer::Source::Bin => match gltf.blob.as_deref() {
                Some(blob) => buffers.push(blob.into()),
                None => bail!("{file_name} references a binary chunk it does not contain"),
            },
            ::gltf::buffer::Source::Uri(uri) => {
                if uri.starts_with("data:") {
                    bail!("{file_name}: embedded data uris are not supported");
                }
                let bin = load_binary(&resolve_uri(file_name, uri)).await?;
                buffers.push(bin);
            }
        }
    }

    // Load images
    let mut images = Vec::new();
    for image in gltf.images() {
        let data = match image.source() {
            ::gltf::image::Source::View { view, mime_type } => {
                let start = view.offset();
                let end = start + view.length();
                buffers
                    .get(view.buffer().index())
                    .and_then(|buffer| buffer.get(start..end))
                    .map(|bytes| ImageData {
                        bytes: bytes.to_vec(),
                        extension: extension_from_mime(mime_type),
                    })
            }
            ::gltf::image::Source::Uri { uri, mime_type } => {
                if uri.starts_with("data:") {
                    None
                } else {
                    match load_binary(&resolve_uri(file_name, uri)).await {
                        Ok(bytes) => Some(ImageData {
                            bytes,
                            extension: mime_type.and_then(extension_from_mime).or_else(|| {
                                uri.rsplit_once('.').map(|(_, ext)| ext.to_lowercase())
                            }),
                        }),
                        Err(e) => {
                            log::warn!("image {uri} of {file_name} could not be loaded: {e:#}");
                            None
                        }
                    }
                }
            }
        };
        if data.is_none() {
            log::warn!(
                "image {} of {file_name} is unavailable, its texture slots stay empty",
                image.index()
            );
        }
        images.push(data);
    }

    let scene = describe_scene(&gltf.document, &buffers);
    log::info!(
        "{file_name}: {} meshes, {} materials, {} images",
        scene.meshes().count(),
        scene.materials.len(),
        images.len()
    );

    Ok(GltfAsset {
        name: file_name.to_string(),
        scene,
        images,
    })
}

fn extension_from_mime(mime_type: &str) -> Option<String> {
    mime_type.split('/').next_back().map(str::to_string)
}

/// Build the CPU description of `document`'s scene from its resolved `buffers`.
///
/// Only the default scene is described, the first scene when the document names none.
pub fn describe_scene(document: &::gltf::Document, buffers: &[Vec<u8>]) -> SceneDescription {
    let materials = document
        .materials()
        .map(|material| {
            let pbr = material.pbr_metallic_roughness();
            MaterialDescription {
                name: material
                    .name()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("material{}", material.index().unwrap_or(0))),
                base_colour_factor: pbr.base_color_factor(),
                base_colour_image: pbr
                    .base_color_texture()
                    .map(|info| info.texture().source().index()),
                normal_image: material
                    .normal_texture()
                    .map(|normal| normal.texture().source().index()),
            }
        })
        .collect();

    let roots = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .map(|scene| {
            scene
                .nodes()
                .map(|node| describe_node(node, buffers))
                .collect()
        })
        .unwrap_or_default();

    SceneDescription { roots, materials }
}

fn describe_node(node: ::gltf::Node, buffers: &[Vec<u8>]) -> NodeDescription {
    let meshes = node
        .mesh()
        .map(|mesh| {
            mesh.primitives()
                .enumerate()
                .filter_map(|(prim_idx, primitive)| {
                    describe_primitive(MeshId::new(node.index(), prim_idx), &mesh, primitive, buffers)
                })
                .collect()
        })
        .unwrap_or_default();

    NodeDescription {
        index: node.index(),
        name: node.name().map(str::to_string),
        transform: Instance::from_decomposed(node.transform().decomposed()),
        meshes,
        children: node
            .children()
            .map(|child| describe_node(child, buffers))
            .collect(),
    }
}

fn describe_primitive(
    id: MeshId,
    mesh: &::gltf::Mesh,
    primitive: ::gltf::Primitive,
    buffers: &[Vec<u8>],
) -> Option<MeshDescription> {
    let name = mesh.name().unwrap_or("unknown_mesh").to_string();
    if primitive.mode() != ::gltf::mesh::Mode::Triangles {
        log::warn!("skipping {id} ({name}): only triangle primitives are drawn");
        return None;
    }
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));

    let Some(positions) = reader.read_positions() else {
        log::warn!("skipping {id} ({name}): the primitive has no positions");
        return None;
    };
    let mut vertices: Vec<ModelVertex> = positions
        .map(|position| ModelVertex {
            position,
            ..Default::default()
        })
        .collect();

    if let Some(normals) = reader.read_normals() {
        for (vertex, normal) in vertices.iter_mut().zip(normals) {
            vertex.normal = normal;
        }
    }
    if let Some(tex_coords) = reader.read_tex_coords(0) {
        for (vertex, tex_coord) in vertices.iter_mut().zip(tex_coords.into_f32()) {
            vertex.tex_coords = tex_coord;
        }
    }

    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..vertices.len() as u32).collect(),
    };
    if let Some(&out_of_range) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
        log::warn!("skipping {id} ({name}): index {out_of_range} is out of range");
        return None;
    }

    match reader.read_tangents() {
        Some(tangents) => {
            for (vertex, tangent) in vertices.iter_mut().zip(tangents) {
                // glTF tangents are vec4s, the 4th component gives the bitangent's sign
                let tangent: cgmath::Vector4<f32> = tangent.into();
                let normal: cgmath::Vector3<f32> = vertex.normal.into();
                vertex.tangent = tangent.truncate().into();
                vertex.bitangent = (normal.cross(tangent.truncate()) * tangent.w).into();
            }
        }
        None => compute_tangents(&mut vertices, &indices),
    }

    Some(MeshDescription {
        id,
        name,
        vertices,
        indices,
        material: primitive.material().index(),
    })
}

/// Fill in tangents and bitangents from positions and texture coordinates.
///
/// Normal maps need a tangent space per vertex; assets without tangents get one
/// averaged over the triangles a vertex belongs to. Triangles with degenerate texture
/// coordinates don't contribute, vertices left without a tangent get one
/// perpendicular to their normal.
pub fn compute_tangents(vertices: &mut [ModelVertex], indices: &[u32]) {
    let mut triangles_included = vec![0u32; vertices.len()];

    for c in indices.chunks_exact(3) {
        let (i0, i1, i2) = (c[0] as usize, c[1] as usize, c[2] as usize);
        let v0 = vertices[i0];
        let v1 = vertices[i1];
        let v2 = vertices[i2];

        let pos0: cgmath::Vector3<_> = v0.position.into();
        let pos1: cgmath::Vector3<_> = v1.position.into();
        let pos2: cgmath::Vector3<_> = v2.position.into();

        let uv0: cgmath::Vector2<_> = v0.tex_coords.into();
        let uv1: cgmath::Vector2<_> = v1.tex_coords.into();
        let uv2: cgmath::Vector2<_> = v2.tex_coords.into();

        // Edges of the triangle
        let delta_pos1 = pos1 - pos0;
        let delta_pos2 = pos2 - pos0;

        let delta_uv1 = uv1 - uv0;
        let delta_uv2 = uv2 - uv0;

        // Solving
        //     delta_pos1 = delta_uv1.x * T + delta_uv1.y * B
        //     delta_pos2 = delta_uv2.x * T + delta_uv2.y * B
        // for T and B.
        let det = delta_uv1.x * delta_uv2.y - delta_uv1.y * delta_uv2.x;
        if det.abs() <= f32::EPSILON {
            continue;
        }
        let r = 1.0 / det;
        let tangent = (delta_pos1 * delta_uv2.y - delta_pos2 * delta_uv1.y) * r;
        // The bitangent is flipped to get right-handed normal maps in wgpu's texture coordinates
        let bitangent = (delta_pos2 * delta_uv1.x - delta_pos1 * delta_uv2.x) * -r;

        for i in [i0, i1, i2] {
            vertices[i].tangent = (tangent + cgmath::Vector3::from(vertices[i].tangent)).into();
            vertices[i].bitangent =
                (bitangent + cgmath::Vector3::from(vertices[i].bitangent)).into();
            triangles_included[i] += 1;
        }
    }

    for (vertex, n) in vertices.iter_mut().zip(triangles_included) {
        if n == 0 {
            let (tangent, bitangent) = fallback_tangent_space(vertex.normal.into());
            vertex.tangent = tangent.into();
            vertex.bitangent = bitangent.into();
            continue;
        }
        let denom = 1.0 / n as f32;
        vertex.tangent = (cgmath::Vector3::from(vertex.tangent) * denom).into();
        vertex.bitangent = (cgmath::Vector3::from(vertex.bitangent) * denom).into();
    }
}

fn fallback_tangent_space(
    normal: cgmath::Vector3<f32>,
) -> (cgmath::Vector3<f32>, cgmath::Vector3<f32>) {
    if normal.magnitude2() <= f32::EPSILON {
        return (cgmath::Vector3::unit_x(), cgmath::Vector3::unit_y());
    }
    let normal = normal.normalize();
    let helper = if normal.x.abs() < 0.9 {
        cgmath::Vector3::unit_x()
    } else {
        cgmath::Vector3::unit_y()
    };
    let tangent = helper.cross(normal).normalize();
    let bitangent = normal.cross(tangent);
    (tangent, bitangent)
}
