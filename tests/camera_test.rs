use std::f32::consts::PI;

use cgmath::{InnerSpace, Point3, Vector3};
use instant::Duration;
use texswap::{
    camera::{CameraController, OrbitCamera, Projection},
    config::CameraConfig,
};
use winit::event::{DeviceId, MouseScrollDelta, TouchPhase, WindowEvent};

const FRAME: Duration = Duration::from_micros(16_667);
const EPSILON: f32 = 1e-4;

fn assert_close(actual: Point3<f32>, expected: Point3<f32>) {
    assert!(
        (actual - expected).magnitude() < EPSILON,
        "{actual:?} is not close to {expected:?}"
    );
}

fn default_camera() -> OrbitCamera {
    let config = CameraConfig::default();
    OrbitCamera::from_position(config.position.into(), config.target.into())
}

fn undamped() -> CameraConfig {
    CameraConfig {
        damping_factor: None,
        ..Default::default()
    }
}

#[test]
fn camera_starts_at_the_configured_position() {
    let camera = default_camera();

    assert_close(camera.eye(), Point3::new(2.0, 2.0, 5.0));
    assert_eq!(camera.target, Point3::new(0.0, 0.0, 0.0));
    assert!((camera.radius - 33f32.sqrt()).abs() < EPSILON);
}

#[test]
fn undamped_rotation_is_applied_at_once() {
    let mut camera = default_camera();
    let mut controller = CameraController::new(&undamped(), 600);
    let theta = camera.theta;

    // a drag across half of the viewport height turns half way around
    controller.rotate(-300.0, 0.0);
    controller.update(&mut camera, FRAME);

    assert!((camera.theta - (theta + PI)).abs() < EPSILON);
    assert!(!controller.is_moving());
}

#[test]
fn damped_rotation_converges_to_the_full_rotation() {
    let mut camera = default_camera();
    let mut controller = CameraController::new(&CameraConfig::default(), 600);
    let theta = camera.theta;
    let target = theta - PI / 2.0;

    controller.rotate(150.0, 0.0);
    controller.update(&mut camera, FRAME);
    let after_one_frame = camera.theta;
    assert!(after_one_frame < theta && after_one_frame > target);
    assert!(controller.is_moving());

    for _ in 0..1000 {
        controller.update(&mut camera, FRAME);
    }
    assert!((camera.theta - target).abs() < EPSILON);
    assert!(!controller.is_moving());
}

#[test]
fn damping_does_not_depend_on_the_frame_rate() {
    let mut fast = default_camera();
    let mut slow = default_camera();
    let mut fast_controller = CameraController::new(&CameraConfig::default(), 600);
    let mut slow_controller = CameraController::new(&CameraConfig::default(), 600);

    fast_controller.rotate(100.0, 0.0);
    slow_controller.rotate(100.0, 0.0);
    fast_controller.update(&mut fast, FRAME / 2);
    fast_controller.update(&mut fast, FRAME / 2);
    slow_controller.update(&mut slow, FRAME);

    assert!((fast.theta - slow.theta).abs() < EPSILON);
}

#[test]
fn polar_angle_never_crosses_the_poles() {
    let mut camera = default_camera();
    let mut controller = CameraController::new(&undamped(), 600);

    controller.rotate(0.0, 10_000.0);
    controller.update(&mut camera, FRAME);
    assert!(camera.phi > 0.0 && camera.phi < PI);
    assert!(camera.eye().y > 0.0);

    controller.rotate(0.0, -20_000.0);
    controller.update(&mut camera, FRAME);
    assert!(camera.phi > 0.0 && camera.phi < PI);
    assert!(camera.eye().y < 0.0);
}

#[test]
fn zoom_is_clamped_to_the_distance_limits() {
    let mut camera = default_camera();
    let config = CameraConfig {
        damping_factor: None,
        min_distance: 2.0,
        max_distance: 10.0,
        ..Default::default()
    };
    let mut controller = CameraController::new(&config, 600);

    controller.zoom(100.0);
    controller.update(&mut camera, FRAME);
    assert!((camera.radius - 2.0).abs() < EPSILON);

    controller.zoom(-1000.0);
    controller.update(&mut camera, FRAME);
    assert!((camera.radius - 10.0).abs() < EPSILON);
}

#[test]
fn wheel_moves_the_camera_closer() {
    let mut camera = default_camera();
    let radius = camera.radius;
    let mut controller = CameraController::new(&undamped(), 600);

    let consumed = controller.process_window_event(&WindowEvent::MouseWheel {
        device_id: unsafe { DeviceId::dummy() },
        delta: MouseScrollDelta::LineDelta(0.0, 1.0),
        phase: TouchPhase::Moved,
    });
    controller.update(&mut camera, FRAME);

    assert!(consumed);
    assert!(camera.radius < radius);
    assert_close(camera.target, Point3::new(0.0, 0.0, 0.0));
}

#[test]
fn panning_moves_target_and_eye_together() {
    let mut camera = default_camera();
    let offset = camera.eye() - camera.target;
    let mut controller = CameraController::new(&undamped(), 600);

    controller.pan(-50.0, 0.0);
    controller.update(&mut camera, FRAME);

    assert!(camera.target != Point3::new(0.0, 0.0, 0.0));
    let moved: Vector3<f32> = camera.eye() - camera.target;
    assert!((moved - offset).magnitude() < EPSILON);
}

#[test]
fn projection_follows_the_surface_size() {
    let mut projection = Projection::new(800, 600, cgmath::Deg(75.0), 0.9, 100.0);
    assert!((projection.aspect() - 800.0 / 600.0).abs() < EPSILON);

    projection.resize(1000, 500);
    assert!((projection.aspect() - 2.0).abs() < EPSILON);

    // a zero height while minimised must not produce an infinite aspect
    projection.resize(1000, 0);
    assert!(projection.aspect().is_finite());
}
