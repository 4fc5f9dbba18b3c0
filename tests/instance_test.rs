use cgmath::{Deg, InnerSpace, Quaternion, Rotation3, Vector3};
use texswap::data_structures::{
    instance::Instance,
    material::{Material, MeshId},
    texture::TextureHandle,
};

const EPSILON: f32 = 1e-5;

#[test]
fn child_transform_is_composed_with_its_parent() {
    let parent = Instance {
        position: Vector3::new(1.0, 0.0, 0.0),
        rotation: Quaternion::from_angle_y(Deg(90.0)),
        scale: Vector3::new(2.0, 2.0, 2.0),
    };
    let child = Instance::from(Vector3::new(1.0, 0.0, 0.0));

    let world = &parent * &child;

    // scaled to 2 along x, turned onto -z, then moved by the parent's offset
    assert!((world.position - Vector3::new(1.0, 0.0, -2.0)).magnitude() < EPSILON);
    assert_eq!(world.scale, Vector3::new(2.0, 2.0, 2.0));
}

#[test]
fn gltf_rotation_order_is_xyzw() {
    let instance = Instance::from_decomposed(([0.0; 3], [0.0, 0.0, 0.0, 1.0], [1.0; 3]));

    assert_eq!(instance, Instance::new());
}

#[test]
fn material_update_flag_is_consumed_once() {
    let mut material = Material::new("worktop", Some(TextureHandle::new(0)));
    assert!(material.take_needs_update());
    assert!(!material.take_needs_update());

    material.set_base_colour(Some(TextureHandle::new(1)));
    material.mark_needs_update();
    assert!(material.needs_update());
    assert!(material.take_needs_update());
    assert_eq!(material.base_colour(), Some(TextureHandle::new(1)));
}

#[test]
fn mesh_ids_order_by_node_then_primitive() {
    let mut ids = vec![MeshId::new(2, 0), MeshId::new(1, 1), MeshId::new(1, 0)];
    ids.sort();

    assert_eq!(ids, vec![MeshId::new(1, 0), MeshId::new(1, 1), MeshId::new(2, 0)]);
    assert_eq!(MeshId::new(3, 1).to_string(), "node3/prim1");
}
