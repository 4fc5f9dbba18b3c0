//! Application event loop.
//!
//! The viewer is a winit [`ApplicationHandler`]. Startup creates the window and
//! the render [`Context`], loads the texture catalog and starts fetching the
//! model in the background. Everything that touches the GPU or the scene runs on
//! the event loop: the fetched model arrives as a [`ViewerEvent::Loaded`], is
//! turned into a scene graph and handed to the [`TextureSelector`], which then
//! reacts to [`ViewerEvent::Select`]s from the selection control.
//!
//! # Frame
//!
//! 1. Advance the orbit camera and upload its uniform
//! 2. Upload changed transforms, rebuild bind groups of updated materials
//! 3. Draw the scene into the (multisampled) colour target and present
//! 4. Request the next redraw

use std::{fmt::Debug, iter, sync::Arc};

use instant::Instant;
use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    keyboard::PhysicalKey,
    window::Window,
};

use crate::{
    config::ViewerConfig,
    context::Context,
    data_structures::scene_graph::{SceneNode, build_scene_graph},
    render::draw_instanced,
    resources::{AssetLoad, load_gltf_asset, log_progress, progress_channel, texture::load_catalog},
    selector::{ApplyOutcome, TextureSelector},
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Events sent to the event loop from outside of it.
pub enum ViewerEvent {
    /// The render context finished its asynchronous setup (the browser can't block on it).
    #[cfg(target_arch = "wasm32")]
    Initialized(AppState),
    Loaded(AssetLoad),
    /// A value picked on the selection control.
    Select(String),
}

impl Debug for ViewerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(target_arch = "wasm32")]
            ViewerEvent::Initialized(_) => f.write_str("Initialized"),
            ViewerEvent::Loaded(load) => f.debug_tuple("Loaded").field(load).finish(),
            ViewerEvent::Select(value) => f.debug_tuple("Select").field(value).finish(),
        }
    }
}

pub struct AppState {
    pub ctx: Context,
    pub selector: TextureSelector<Box<dyn SceneNode>>,
    last_frame: Instant,
}

impl AppState {
    async fn new(window: Arc<Window>, config: &ViewerConfig) -> anyhow::Result<Self> {
        let mut ctx = Context::new(window, config).await?;
        let catalog = load_catalog(&config.catalog, &ctx.device, &ctx.queue, &mut ctx.textures).await;
        log::info!(
            "texture catalog: [{}]",
            catalog.names().collect::<Vec<_>>().join(", ")
        );
        Ok(Self {
            ctx,
            selector: TextureSelector::new(catalog),
            last_frame: Instant::now(),
        })
    }

    /// Build the scene graph of a fetched model and capture its textures.
    ///
    /// Returns whether a scene was captured.
    fn on_loaded(&mut self, load: AssetLoad) -> bool {
        let asset = match load {
            AssetLoad::Loaded(asset) => asset,
            // already logged by the loader
            AssetLoad::Failed(_) => return false,
        };
        let name = asset.name.clone();
        match build_scene_graph(*asset, &mut self.ctx) {
            Ok(scene) => {
                let captured = self.selector.capture(scene);
                log::info!("{name} is ready, {captured} meshes can swap textures");
                self.ctx.window.request_redraw();
                true
            }
            Err(e) => {
                log::error!("cannot upload {name}: {e:#}");
                false
            }
        }
    }

    fn select(&mut self, value: &str) {
        match self.selector.apply(value) {
            ApplyOutcome::NotLoaded => log::info!("'{value}' selected before the model loaded"),
            ApplyOutcome::Applied { name, meshes } => {
                log::info!("showing '{name}' on {meshes} meshes")
            }
            ApplyOutcome::Restored { meshes } => {
                log::info!("restored original textures on {meshes} meshes")
            }
            ApplyOutcome::FellBack { value, meshes } => {
                log::info!("restored original textures on {meshes} meshes for unknown '{value}'")
            }
        }
        self.ctx.window.request_redraw();
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.ctx.resize(width, height);
    }

    fn update(&mut self) {
        let now = Instant::now();
        let dt = now - self.last_frame;
        self.last_frame = now;

        self.ctx.camera.update(&self.ctx.queue, dt);
        if let Some(scene) = self.selector.scene_mut() {
            scene.write_to_buffers(&self.ctx);
        }
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        // invoke main render loop
        self.ctx.window.request_redraw();

        // Rendering requires the surface to be configured
        if !self.ctx.is_surface_configured {
            return Ok(());
        }
        self.update();

        let output = self.ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let (target, resolve_target) = match &self.ctx.msaa_framebuffer {
            Some(msaa) => (&msaa.view, Some(&view)),
            None => (&view, None),
        };

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.ctx.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.ctx.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });

            if let Some(scene) = self.selector.scene() {
                let instanced = scene.get_render();
                draw_instanced(&self.ctx, &mut render_pass, &instanced);
            }
        }

        self.ctx.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

struct App {
    config: ViewerConfig,
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    proxy: EventLoopProxy<ViewerEvent>,
    state: Option<AppState>,
    #[cfg(target_arch = "wasm32")]
    select_bound: bool,
}

impl App {
    fn new(event_loop: &EventLoop<ViewerEvent>, config: ViewerConfig) -> anyhow::Result<Self> {
        Ok(Self {
            config,
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime: tokio::runtime::Runtime::new()?,
            proxy: event_loop.create_proxy(),
            state: None,
            #[cfg(target_arch = "wasm32")]
            select_bound: false,
        })
    }

    /// Start fetching the model. The result comes back as [`ViewerEvent::Loaded`].
    fn load_model(&self) {
        let path = self.config.model_path.clone();
        let proxy = self.proxy.clone();
        let load = async move {
            let (progress, progress_listener) = progress_channel();
            let (load, ()) = futures::join!(
                load_gltf_asset(&path, Some(progress)),
                log_progress(path.clone(), progress_listener)
            );
            if proxy.send_event(ViewerEvent::Loaded(load)).is_err() {
                log::warn!("event loop closed before {path} finished loading");
            }
        };

        #[cfg(not(target_arch = "wasm32"))]
        self.async_runtime.spawn(load);

        #[cfg(target_arch = "wasm32")]
        wasm_bindgen_futures::spawn_local(load);
    }

    fn start(&mut self, mut state: AppState) {
        let size = state.ctx.window.inner_size();
        state.resize(size.width, size.height);
        self.state = Some(state);
        self.load_model();
    }

    fn on_scene_captured(&mut self) {
        #[cfg(target_arch = "wasm32")]
        if !self.select_bound {
            crate::ui::bind_select_element(&self.config.select_element_id, self.proxy.clone());
            self.select_bound = true;
        }

        #[cfg(not(target_arch = "wasm32"))]
        if let Some(state) = &self.state {
            let names: Vec<_> = state
                .selector
                .catalog()
                .names()
                .enumerate()
                .map(|(idx, name)| format!("{} = {name}", idx + 1))
                .collect();
            log::info!("texture keys: 0 = original, {}", names.join(", "));
        }
    }
}

impl ApplicationHandler<ViewerEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title("texswap");

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            let window = web_sys::window().unwrap_throw();
            let document = window.document().unwrap_throw();
            match document.query_selector(&self.config.canvas_selector) {
                Ok(Some(canvas)) => {
                    let html_canvas_element = canvas.unchecked_into();
                    window_attributes = window_attributes.with_canvas(Some(html_canvas_element));
                }
                _ => log::warn!(
                    "no canvas matches '{}', creating one",
                    self.config.canvas_selector
                ),
            }
            let width = window.inner_width().ok().and_then(|w| w.as_f64());
            let height = window.inner_height().ok().and_then(|h| h.as_f64());
            if let (Some(width), Some(height)) = (width, height) {
                window_attributes =
                    window_attributes.with_inner_size(winit::dpi::LogicalSize::new(width, height));
            }
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("cannot create the window: {e}");
                event_loop.exit();
                return;
            }
        };

        let config = self.config.clone();
        let init_future = async move { AppState::new(window, &config).await };

        #[cfg(not(target_arch = "wasm32"))]
        {
            match self.async_runtime.block_on(init_future) {
                Ok(state) => self.start(state),
                Err(e) => {
                    log::error!("App initialization failed: {e:#}");
                    event_loop.exit();
                }
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                match init_future.await {
                    Ok(state) => {
                        if proxy.send_event(ViewerEvent::Initialized(state)).is_err() {
                            log::error!("event loop closed during initialization");
                        }
                    }
                    Err(e) => log::error!("App initialization failed: {e:#}"),
                }
            });
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: ViewerEvent) {
        log::debug!("{event:?}");
        match event {
            #[cfg(target_arch = "wasm32")]
            ViewerEvent::Initialized(state) => self.start(state),
            ViewerEvent::Loaded(load) => {
                let Some(state) = &mut self.state else {
                    log::warn!("model arrived without a render context");
                    return;
                };
                if state.on_loaded(load) {
                    self.on_scene_captured();
                }
            }
            ViewerEvent::Select(value) => {
                if let Some(state) = &mut self.state {
                    state.select(&value);
                }
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::RedrawRequested => match state.render() {
                Ok(_) => {}
                // Reconfigure the surface if it's lost or outdated
                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                    let size = state.ctx.window.inner_size();
                    state.resize(size.width, size.height);
                }
                Err(e) => {
                    log::error!("Unable to render {e}");
                }
            },
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                #[cfg(not(target_arch = "wasm32"))]
                if code == winit::keyboard::KeyCode::Escape {
                    event_loop.exit();
                    return;
                }
                if let Some(value) = crate::ui::selection_for_key(code, state.selector.catalog()) {
                    state.select(&value);
                }
            }
            event => {
                state.ctx.camera.controller.process_window_event(&event);
            }
        }
    }
}

/// Open the viewer and run it until the window is closed.
pub fn run(config: ViewerConfig) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::log_1(&format!("Could not initialize logger: {e}").into());
        }
    }

    let event_loop: EventLoop<ViewerEvent> = EventLoop::with_user_event().build()?;

    let mut app = App::new(&event_loop, config)?;

    event_loop.run_app(&mut app)?;

    Ok(())
}
