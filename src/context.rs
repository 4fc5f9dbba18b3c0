use std::sync::Arc;

use anyhow::Context as _;
use winit::{dpi::PhysicalSize, window::Window};

use crate::{
    camera::CameraResources,
    config::ViewerConfig,
    data_structures::texture::{Texture, TextureStore},
    pipelines::{basic::mk_basic_pipeline, light::LightResources},
    resources::texture::{material_layout, mk_default_bind_group},
};

/// GPU state of the viewer: device, surface, render targets, uniforms and the
/// texture store every material points into.
pub struct Context {
    pub window: Arc<Window>,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub is_surface_configured: bool,
    pub depth_texture: Texture,
    /// Multisampled colour target, `None` when antialiasing is disabled.
    pub msaa_framebuffer: Option<Texture>,
    pub sample_count: u32,
    pub camera: CameraResources,
    pub light: LightResources,
    pub material_layout: wgpu::BindGroupLayout,
    pub textures: TextureStore,
    /// Bind group for meshes without a material.
    pub default_material: wgpu::BindGroup,
    pub pipeline: wgpu::RenderPipeline,
    pub clear_colour: wgpu::Color,
    max_pixel_ratio: f64,
}

impl Context {
    pub async fn new(window: Arc<Window>, viewer: &ViewerConfig) -> anyhow::Result<Self> {
        let size = surface_extent(window.inner_size(), window.scale_factor(), viewer.max_pixel_ratio);

        // The instance is a handle to our GPU
        // Backends::PRIMARY => Vulkan + Metal + DX12 + Browser WebGPU, GL => WebGL2
        log::info!("WGPU setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("cannot create a surface for the window")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no suitable graphics adapter")?;
        log::info!("device and queue on {}", adapter.get_info().name);
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                // WebGL doesn't support all of wgpu's features, so if
                // we're building for the web we'll have to disable some.
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults()
                } else {
                    wgpu::Limits::default()
                },
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("cannot create the graphics device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        // The shader assumes an sRGB surface texture, other formats come out darker
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("the surface supports no texture format")?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let sample_count = supported_sample_count(&adapter, surface_format, viewer.sample_count);
        let depth_texture =
            Texture::create_depth_texture(&device, [config.width, config.height], sample_count, "depth_texture");
        let msaa_framebuffer = (sample_count > 1)
            .then(|| Texture::create_multisampled_framebuffer(&device, &config, sample_count));

        let camera = CameraResources::new(&device, &viewer.camera, config.width, config.height);
        let light = LightResources::new(&device, &viewer.light);

        let material_layout = material_layout(&device);
        let textures = TextureStore::new(&device, &queue);
        let default_material = mk_default_bind_group(&device, &material_layout, &textures);

        let pipeline = mk_basic_pipeline(
            &device,
            config.format,
            sample_count,
            &material_layout,
            &camera.bind_group_layout,
            &light.bind_group_layout,
        );

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            is_surface_configured: false,
            depth_texture,
            msaa_framebuffer,
            sample_count,
            camera,
            light,
            material_layout,
            textures,
            default_material,
            pipeline,
            clear_colour: viewer.clear_colour,
            max_pixel_ratio: viewer.max_pixel_ratio,
        })
    }

    /// Reconfigure the surface and every size dependent target for a window of
    /// `width` x `height` physical pixels.
    pub fn resize(&mut self, width: u32, height: u32) {
        let size = surface_extent(
            PhysicalSize::new(width, height),
            self.window.scale_factor(),
            self.max_pixel_ratio,
        );
        if size.width == 0 || size.height == 0 {
            return;
        }
        self.config.width = size.width;
        self.config.height = size.height;
        self.surface.configure(&self.device, &self.config);
        self.is_surface_configured = true;

        self.depth_texture = Texture::create_depth_texture(
            &self.device,
            [size.width, size.height],
            self.sample_count,
            "depth_texture",
        );
        if self.sample_count > 1 {
            self.msaa_framebuffer = Some(Texture::create_multisampled_framebuffer(
                &self.device,
                &self.config,
                self.sample_count,
            ));
        }
        self.camera.resize(size.width, size.height);
    }
}

/// Size of the render surface for a window of `physical` pixels.
///
/// Only the browser canvas backing store is capped to `max_pixel_ratio`, native
/// swapchains have to match the window.
pub fn surface_extent(physical: PhysicalSize<u32>, scale_factor: f64, max_pixel_ratio: f64) -> PhysicalSize<u32> {
    if cfg!(target_arch = "wasm32") {
        surface_size(physical, scale_factor, max_pixel_ratio)
    } else {
        physical
    }
}

/// Physical window size limited to `max_pixel_ratio` device pixels per logical pixel.
pub fn surface_size(physical: PhysicalSize<u32>, scale_factor: f64, max_pixel_ratio: f64) -> PhysicalSize<u32> {
    if scale_factor <= max_pixel_ratio || scale_factor <= 0.0 {
        return physical;
    }
    let ratio = max_pixel_ratio / scale_factor;
    PhysicalSize::new(
        (physical.width as f64 * ratio).round() as u32,
        (physical.height as f64 * ratio).round() as u32,
    )
}

/// The highest sample count up to `requested` the adapter can render `format` with.
fn supported_sample_count(adapter: &wgpu::Adapter, format: wgpu::TextureFormat, requested: u32) -> u32 {
    let flags = adapter.get_texture_format_features(format).flags;
    let supported = [16, 8, 4, 2]
        .into_iter()
        .filter(|&count| count <= requested)
        .find(|&count| flags.sample_count_supported(count))
        .unwrap_or(1);
    if supported != requested {
        log::warn!("{requested}x MSAA is not supported, using {supported}x");
    }
    supported
}
