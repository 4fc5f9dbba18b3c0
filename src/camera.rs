//! Orbit camera, projection and mouse controls.
//!
//! The camera orbits a target point on a sphere. Dragging with the left button
//! rotates around the target, dragging with the right button pans the target and
//! the wheel moves the camera closer or further away. With damping enabled the
//! input is not applied at once but eased in over the following frames.

use std::f32::consts::{PI, TAU};

use cgmath::*;
use instant::Duration;
use wgpu::util::DeviceExt;
use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
};

use crate::config::CameraConfig;

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Keeps the polar angle away from the poles where the view matrix degenerates.
const POLAR_EPSILON: f32 = 1e-6;
/// Radius factor of one wheel step at zoom speed 1.
const ZOOM_STEP: f32 = 0.95;
/// Damping factors are given per frame at this rate.
const DAMPING_REFERENCE_FPS: f32 = 60.0;
/// Pixels a pixel-based scroll delta counts as one wheel line.
const PIXELS_PER_LINE: f32 = 100.0;

/// A camera on a sphere around `target`.
///
/// `theta` is the azimuth around the y axis measured from +z, `phi` the polar angle
/// measured from +y.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitCamera {
    pub target: Point3<f32>,
    pub radius: f32,
    pub theta: f32,
    pub phi: f32,
}

impl OrbitCamera {
    /// Place the camera at `position`, looking at `target`.
    pub fn from_position(position: Point3<f32>, target: Point3<f32>) -> Self {
        let offset = position - target;
        let radius = offset.magnitude();
        let (theta, phi) = if radius == 0.0 {
            (0.0, PI / 2.0)
        } else {
            (
                offset.x.atan2(offset.z),
                (offset.y / radius).clamp(-1.0, 1.0).acos(),
            )
        };
        Self {
            target,
            radius,
            theta,
            phi,
        }
    }

    pub fn eye(&self) -> Point3<f32> {
        let (sin_phi, cos_phi) = self.phi.sin_cos();
        let (sin_theta, cos_theta) = self.theta.sin_cos();
        self.target
            + Vector3::new(
                self.radius * sin_phi * sin_theta,
                self.radius * cos_phi,
                self.radius * sin_phi * cos_theta,
            )
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.eye(), self.target, Vector3::unit_y())
    }

    /// Unit vectors pointing right and up on screen.
    fn screen_axes(&self) -> (Vector3<f32>, Vector3<f32>) {
        let forward = self.target - self.eye();
        if forward.magnitude2() == 0.0 {
            return (Vector3::unit_x(), Vector3::unit_y());
        }
        let forward = forward.normalize();
        let right = forward.cross(Vector3::unit_y()).normalize();
        let up = right.cross(forward).normalize();
        (right, up)
    }
}

pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_position: [f32; 4],
    pub view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        Self {
            view_position: [0.0; 4],
            view_proj: cgmath::Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &OrbitCamera, projection: &Projection) {
        self.view_position = camera.eye().to_homogeneous().into();
        self.view_proj = (projection.calc_matrix() * camera.calc_matrix()).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// Turns mouse input into orbit motion.
///
/// Input only accumulates; [`update`](Self::update) applies it to a camera, all at
/// once or damped depending on the damping factor.
#[derive(Debug)]
pub struct CameraController {
    rotate_speed: f32,
    zoom_speed: f32,
    pan_speed: f32,
    damping_factor: Option<f32>,
    min_distance: f32,
    max_distance: f32,
    fovy: Rad<f32>,
    viewport_height: f32,

    pending_theta: f32,
    pending_phi: f32,
    pending_pan: Vector2<f32>,
    pan_offset: Vector3<f32>,
    scale: f32,

    rotating: bool,
    panning: bool,
    cursor: Option<PhysicalPosition<f64>>,
}

impl CameraController {
    pub fn new(config: &CameraConfig, viewport_height: u32) -> Self {
        Self {
            rotate_speed: config.rotate_speed,
            zoom_speed: config.zoom_speed,
            pan_speed: config.pan_speed,
            damping_factor: config.damping_factor.map(|factor| factor.clamp(0.0, 1.0)),
            min_distance: config.min_distance,
            max_distance: config.max_distance,
            fovy: Deg(config.fovy).into(),
            viewport_height: viewport_height.max(1) as f32,
            pending_theta: 0.0,
            pending_phi: 0.0,
            pending_pan: Vector2::zero(),
            pan_offset: Vector3::zero(),
            scale: 1.0,
            rotating: false,
            panning: false,
            cursor: None,
        }
    }

    pub fn set_viewport_height(&mut self, height: u32) {
        self.viewport_height = height.max(1) as f32;
    }

    /// Orbit by a cursor movement of `dx`, `dy` pixels. A drag across the full
    /// viewport height turns the camera once around.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.pending_theta -= TAU * dx / self.viewport_height * self.rotate_speed;
        self.pending_phi -= TAU * dy / self.viewport_height * self.rotate_speed;
    }

    /// Move the target with a cursor movement of `dx`, `dy` pixels.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        self.pending_pan += Vector2::new(dx, dy);
    }

    /// Positive steps move the camera closer to the target.
    pub fn zoom(&mut self, steps: f32) {
        self.scale *= ZOOM_STEP.powf(steps * self.zoom_speed);
    }

    /// Returns whether the event was consumed.
    pub fn process_window_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::MouseInput { state, button, .. } => {
                let pressed = *state == ElementState::Pressed;
                match button {
                    MouseButton::Left => self.rotating = pressed,
                    MouseButton::Right => self.panning = pressed,
                    _ => return false,
                }
                true
            }
            WindowEvent::CursorMoved { position, .. } => {
                let last = self.cursor.replace(*position);
                match last {
                    Some(last) if self.rotating || self.panning => {
                        let dx = (position.x - last.x) as f32;
                        let dy = (position.y - last.y) as f32;
                        if self.rotating {
                            self.rotate(dx, dy);
                        } else {
                            self.pan(dx, dy);
                        }
                        true
                    }
                    _ => false,
                }
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                false
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(position) => position.y as f32 / PIXELS_PER_LINE,
                };
                self.zoom(steps);
                true
            }
            _ => false,
        }
    }

    /// Whether input is still waiting to be applied.
    pub fn is_moving(&self) -> bool {
        const REST: f32 = 1e-6;
        self.pending_theta.abs() > REST
            || self.pending_phi.abs() > REST
            || self.pending_pan.magnitude2() > 0.0
            || self.pan_offset.magnitude2() > REST * REST
            || (self.scale - 1.0).abs() > REST
    }

    /// Apply pending input to `camera`. `dt` is the time since the last update.
    pub fn update(&mut self, camera: &mut OrbitCamera, dt: Duration) {
        // Pan in screen space, scaled so the target follows the cursor at the target's depth
        if self.pending_pan != Vector2::zero() {
            let (right, up) = camera.screen_axes();
            let half_height = camera.radius * (self.fovy / 2.0).tan();
            let per_pixel = 2.0 * half_height / self.viewport_height * self.pan_speed;
            self.pan_offset +=
                (-right * self.pending_pan.x + up * self.pending_pan.y) * per_pixel;
            self.pending_pan = Vector2::zero();
        }

        let applied = match self.damping_factor {
            Some(factor) => {
                let frames = dt.as_secs_f32() * DAMPING_REFERENCE_FPS;
                1.0 - (1.0 - factor).powf(frames)
            }
            None => 1.0,
        };

        camera.theta += self.pending_theta * applied;
        camera.phi = (camera.phi + self.pending_phi * applied).clamp(POLAR_EPSILON, PI - POLAR_EPSILON);
        camera.target += self.pan_offset * applied;
        camera.radius = (camera.radius * self.scale)
            .clamp(self.min_distance.max(f32::EPSILON), self.max_distance);
        self.scale = 1.0;

        let remaining = 1.0 - applied;
        self.pending_theta *= remaining;
        self.pending_phi *= remaining;
        self.pan_offset *= remaining;
    }
}

/// Everything the renderer needs for the camera: state, controls and GPU uniform.
pub struct CameraResources {
    pub camera: OrbitCamera,
    pub projection: Projection,
    pub controller: CameraController,
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl CameraResources {
    pub fn new(device: &wgpu::Device, config: &CameraConfig, width: u32, height: u32) -> Self {
        let camera = OrbitCamera::from_position(config.position.into(), config.target.into());
        let projection = Projection::new(width, height, Deg(config.fovy), config.znear, config.zfar);
        let controller = CameraController::new(config, height);

        let mut uniform = CameraUniform::new();
        uniform.update_view_proj(&camera, &projection);

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("camera_bind_group_layout"),
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        Self {
            camera,
            projection,
            controller,
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.projection.resize(width, height);
        self.controller.set_viewport_height(height);
    }

    /// Advance the controls by `dt` and upload the new view projection.
    pub fn update(&mut self, queue: &wgpu::Queue, dt: Duration) {
        self.controller.update(&mut self.camera, dt);
        self.uniform.update_view_proj(&self.camera, &self.projection);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}
