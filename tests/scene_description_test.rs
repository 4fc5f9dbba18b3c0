use texswap::{
    data_structures::material::MeshId,
    resources::scene::{MaterialDescription, SceneDescription, describe_scene},
};

/// A root node translated along x with two children: one with a two-primitive mesh
/// (textured and untextured material), one with a mesh without a material.
const SCENE_JSON: &str = r#"{
    "asset": { "version": "2.0" },
    "scene": 0,
    "scenes": [{ "nodes": [0] }],
    "nodes": [
        { "name": "root", "children": [1, 2], "translation": [1.0, 0.0, 0.0] },
        { "name": "counter", "mesh": 0 },
        { "name": "bare", "mesh": 1, "scale": [2.0, 2.0, 2.0] }
    ],
    "meshes": [
        {
            "name": "counter",
            "primitives": [
                { "attributes": { "POSITION": 0, "TEXCOORD_0": 1 }, "indices": 2, "material": 0 },
                { "attributes": { "POSITION": 0 }, "material": 1 }
            ]
        },
        { "name": "bare", "primitives": [{ "attributes": { "POSITION": 0 } }] }
    ],
    "materials": [
        {
            "name": "worktop",
            "pbrMetallicRoughness": {
                "baseColorTexture": { "index": 0 },
                "baseColorFactor": [1.0, 0.5, 0.5, 1.0]
            },
            "normalTexture": { "index": 1 }
        },
        { "name": "plain" }
    ],
    "textures": [{ "source": 0 }, { "source": 1 }],
    "images": [{ "uri": "worktop.png" }, { "uri": "worktop_normal.png" }],
    "buffers": [{ "uri": "triangle.bin", "byteLength": 68 }],
    "bufferViews": [
        { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
        { "buffer": 0, "byteOffset": 36, "byteLength": 24 },
        { "buffer": 0, "byteOffset": 60, "byteLength": 6 }
    ],
    "accessors": [
        { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] },
        { "bufferView": 1, "componentType": 5126, "count": 3, "type": "VEC2" },
        { "bufferView": 2, "componentType": 5123, "count": 3, "type": "SCALAR" }
    ]
}"#;

fn triangle_buffer() -> Vec<u8> {
    let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    let tex_coords: [f32; 6] = [0.0, 0.0, 1.0, 0.0, 0.0, 1.0];
    let indices: [u16; 4] = [0, 1, 2, 0];

    let mut buffer = Vec::new();
    buffer.extend_from_slice(bytemuck::cast_slice(&positions));
    buffer.extend_from_slice(bytemuck::cast_slice(&tex_coords));
    buffer.extend_from_slice(bytemuck::cast_slice(&indices));
    buffer
}

fn describe() -> SceneDescription {
    let gltf = gltf::Gltf::from_slice(SCENE_JSON.as_bytes()).expect("valid test document");
    describe_scene(&gltf.document, &[triangle_buffer()])
}

#[test]
fn every_primitive_becomes_a_mesh_keyed_by_node_and_primitive() {
    let scene = describe();

    let ids: Vec<MeshId> = scene.meshes().map(|mesh| mesh.id).collect();
    assert_eq!(
        ids,
        vec![MeshId::new(1, 0), MeshId::new(1, 1), MeshId::new(2, 0)]
    );
}

#[test]
fn meshes_reference_their_own_material() {
    let scene = describe();

    let materials: Vec<Option<usize>> = scene.meshes().map(|mesh| mesh.material).collect();
    assert_eq!(materials, vec![Some(0), Some(1), None]);
}

#[test]
fn materials_point_at_their_images() {
    let scene = describe();

    assert_eq!(
        scene.materials,
        vec![
            MaterialDescription {
                name: "worktop".to_string(),
                base_colour_factor: [1.0, 0.5, 0.5, 1.0],
                base_colour_image: Some(0),
                normal_image: Some(1),
            },
            MaterialDescription {
                name: "plain".to_string(),
                base_colour_factor: [1.0; 4],
                base_colour_image: None,
                normal_image: None,
            },
        ]
    );
}

#[test]
fn node_hierarchy_and_transforms_are_kept() {
    let scene = describe();

    assert_eq!(scene.roots.len(), 1);
    let root = &scene.roots[0];
    assert_eq!(root.name.as_deref(), Some("root"));
    assert!(root.meshes.is_empty());
    assert_eq!(root.transform.position, cgmath::Vector3::new(1.0, 0.0, 0.0));

    let children: Vec<_> = root.children.iter().map(|child| child.index).collect();
    assert_eq!(children, vec![1, 2]);
    assert_eq!(root.children[1].transform.scale, cgmath::Vector3::new(2.0, 2.0, 2.0));
}

#[test]
fn missing_indices_are_generated() {
    let scene = describe();

    let untextured = scene.meshes().nth(1).unwrap();
    assert_eq!(untextured.indices, vec![0, 1, 2]);
    assert_eq!(untextured.vertices.len(), 3);
}

#[test]
fn tangents_are_computed_from_texture_coordinates() {
    let scene = describe();

    let textured = scene.meshes().next().unwrap();
    assert_eq!(textured.indices, vec![0, 1, 2]);
    for vertex in &textured.vertices {
        assert_eq!(vertex.tangent, [1.0, 0.0, 0.0]);
        assert_eq!(vertex.bitangent, [0.0, -1.0, 0.0]);
    }
    assert_eq!(textured.vertices[1].tex_coords, [1.0, 0.0]);
}

#[test]
fn degenerate_texture_coordinates_get_a_fallback_tangent() {
    let scene = describe();

    // no UVs, no normals: every triangle is degenerate in texture space
    let untextured = scene.meshes().nth(1).unwrap();
    for vertex in &untextured.vertices {
        assert_eq!(vertex.tangent, [1.0, 0.0, 0.0]);
        assert_eq!(vertex.bitangent, [0.0, 1.0, 0.0]);
    }
}

#[test]
fn first_scene_is_used_when_none_is_marked_default() {
    let json = r#"{
        "asset": { "version": "2.0" },
        "scenes": [{ "nodes": [0] }, { "nodes": [1, 0] }],
        "nodes": [{ "name": "a" }, { "name": "b" }]
    }"#;
    let gltf = gltf::Gltf::from_slice(json.as_bytes()).expect("valid test document");

    let scene = describe_scene(&gltf.document, &[]);

    let roots: Vec<_> = scene.roots.iter().map(|root| root.name.as_deref()).collect();
    assert_eq!(roots, vec![Some("a")]);
}
