use std::io::Read;

use anyhow::Context as _;
use wgpu::util::DeviceExt;

use crate::{
    config::CatalogEntry,
    data_structures::{
        material::Material,
        texture::{Texture, TextureStore, create_default_sampler},
    },
    resources::{LoadProgress, ProgressSender},
    selector::TextureCatalog,
};

/// Size of the chunks the native loader reads and reports progress for.
const READ_CHUNK_SIZE: usize = 64 * 1024;

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct MaterialUniform {
    base_colour_factor: [f32; 4],
}

/// Layout of group 0: base colour texture + sampler, normal texture + sampler, material uniform.
pub fn material_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 3,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 4,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
        label: Some("Material bind_group_layout"),
    })
}

/// Create the bind group for `material`, substituting the store's fallbacks for empty slots.
///
/// A handle that does not resolve in `textures` is treated like an empty slot.
pub fn mk_material_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    textures: &TextureStore,
    material: &Material,
) -> wgpu::BindGroup {
    let base_colour = material
        .base_colour()
        .and_then(|handle| textures.get(handle))
        .unwrap_or(textures.white());
    let normal = material
        .normal()
        .and_then(|handle| textures.get(handle))
        .unwrap_or(textures.flat_normal());
    mk_bind_group(
        device,
        layout,
        base_colour,
        normal,
        material.base_colour_factor,
        &material.name,
    )
}

/// Bind group for meshes that come without a material: plain white, unperturbed normals.
pub fn mk_default_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    textures: &TextureStore,
) -> wgpu::BindGroup {
    mk_bind_group(
        device,
        layout,
        textures.white(),
        textures.flat_normal(),
        [1.0; 4],
        "default material",
    )
}

fn mk_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    base_colour: &Texture,
    normal: &Texture,
    base_colour_factor: [f32; 4],
    label: &str,
) -> wgpu::BindGroup {
    let uniform = MaterialUniform { base_colour_factor };
    let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{label} uniform")),
        contents: bytemuck::cast_slice(&[uniform]),
        usage: wgpu::BufferUsages::UNIFORM,
    });
    let base_sampler = base_colour
        .sampler
        .clone()
        .unwrap_or_else(|| create_default_sampler(device));
    let normal_sampler = normal
        .sampler
        .clone()
        .unwrap_or_else(|| create_default_sampler(device));
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&base_colour.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&base_sampler),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::TextureView(&normal.view),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: wgpu::BindingResource::Sampler(&normal_sampler),
            },
            wgpu::BindGroupEntry {
                binding: 4,
                resource: buffer.as_entire_binding(),
            },
        ],
        label: Some(label),
    })
}

#[cfg(target_arch = "wasm32")]
fn format_url(file_name: &str) -> anyhow::Result<reqwest::Url> {
    let window = web_sys::window().context("no browser window")?;
    let origin = window
        .location()
        .origin()
        .map_err(|_| anyhow::anyhow!("cannot read the page origin"))?;
    let base = reqwest::Url::parse(&format!("{origin}/assets/"))?;
    Ok(base.join(file_name)?)
}

pub async fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    load_binary_with_progress(file_name, None).await
}

/// Fetch `file_name` from the assets, reporting progress on `progress` if given.
pub async fn load_binary_with_progress(
    file_name: &str,
    progress: Option<&ProgressSender>,
) -> anyhow::Result<Vec<u8>> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(file_name)?;
        let response = reqwest::get(url).await?.error_for_status()?;
        let total = response.content_length();
        let data = response.bytes().await?.to_vec();
        if let Some(progress) = progress {
            let loaded = data.len() as u64;
            let _ = progress.unbounded_send(LoadProgress {
                loaded,
                total: total.or(Some(loaded)),
            });
        }
        data
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = {
        let path = std::path::Path::new("./").join("assets").join(file_name);
        let file = std::fs::File::open(&path)
            .with_context(|| format!("cannot open {}", path.display()))?;
        let total = file.metadata().ok().map(|meta| meta.len());
        read_with_progress(file, total, progress)
            .with_context(|| format!("cannot read {}", path.display()))?
    };

    Ok(data)
}

/// Read `reader` to the end in fixed-size chunks, sending a [`LoadProgress`] after every chunk.
///
/// A closed progress channel is not an error, the read simply continues unobserved.
pub fn read_with_progress<R: Read>(
    mut reader: R,
    total: Option<u64>,
    progress: Option<&ProgressSender>,
) -> std::io::Result<Vec<u8>> {
    let mut data = Vec::with_capacity(total.unwrap_or(0) as usize);
    let mut chunk = vec![0; READ_CHUNK_SIZE];
    loop {
        let read = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(read) => read,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        data.extend_from_slice(&chunk[..read]);
        if let Some(progress) = progress {
            let _ = progress.unbounded_send(LoadProgress {
                loaded: data.len() as u64,
                total,
            });
        }
    }
    Ok(data)
}

pub async fn load_texture(
    file_name: &str,
    is_normal_map: bool,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<Texture> {
    let data = load_binary(file_name).await?;
    let extension = std::path::Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str());
    Texture::from_bytes(device, queue, &data, file_name, extension, is_normal_map)
}

/// Load every catalog texture into `store`.
///
/// Entries that fail to load are logged and left out, selecting them later restores
/// the original textures like any other unknown name.
pub async fn load_catalog(
    entries: &[CatalogEntry],
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    store: &mut TextureStore,
) -> TextureCatalog {
    let loads = entries
        .iter()
        .map(|entry| load_texture(&entry.path, false, device, queue));
    let textures = futures::future::join_all(loads).await;

    let mut catalog = TextureCatalog::new();
    for (entry, texture) in entries.iter().zip(textures) {
        match texture {
            Ok(texture) => {
                let handle = store.insert(texture);
                catalog.insert(entry.name.clone(), handle);
                log::info!("catalog texture '{}' loaded from {}", entry.name, entry.path);
            }
            Err(e) => {
                log::error!(
                    "catalog texture '{}' could not be loaded from {}: {:#}",
                    entry.name,
                    entry.path,
                    e
                );
            }
        }
    }
    catalog
}
