pub mod fake_scene;
