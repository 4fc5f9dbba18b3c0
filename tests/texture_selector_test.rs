mod common;

use common::fake_scene::{FakeScene, T0, T1, T2, T3, catalog, textured};
use texswap::{
    config::ORIGINAL_SELECTION,
    data_structures::{
        material::{Material, MeshId},
        texture::TextureHandle,
    },
    selector::{ApplyOutcome, MeshEntry, Selection, SelectorPhase, TextureCatalog, TextureSelector},
};

const M: MeshId = MeshId::new(0, 0);

fn texture_of(selector: &TextureSelector<FakeScene>, id: MeshId) -> Option<TextureHandle> {
    selector
        .scene()
        .and_then(|scene| scene.material(id))
        .and_then(Material::base_colour)
}

#[test]
fn capture_records_the_original_of_every_mesh_with_a_material() {
    let scene = FakeScene::default()
        .with_mesh(MeshId::new(0, 0), textured("floor", T0))
        .with_mesh(MeshId::new(0, 1), textured("wall", T3))
        .with_mesh(MeshId::new(4, 0), Some(Material::new("untextured", None)));
    let mut selector = TextureSelector::new(catalog());

    assert_eq!(selector.capture(scene), 3);

    assert_eq!(selector.len(), 3);
    assert_eq!(selector.entry(MeshId::new(0, 0)), Some(&MeshEntry { original: Some(T0) }));
    assert_eq!(selector.entry(MeshId::new(0, 1)), Some(&MeshEntry { original: Some(T3) }));
    assert_eq!(selector.entry(MeshId::new(4, 0)), Some(&MeshEntry { original: None }));
    assert_eq!(selector.phase(), SelectorPhase::Captured);
}

#[test]
fn known_name_is_applied_to_every_mesh_with_a_material() {
    let scene = FakeScene::default()
        .with_mesh(MeshId::new(0, 0), textured("floor", T0))
        .with_mesh(MeshId::new(1, 0), textured("wall", T3))
        .with_mesh(MeshId::new(2, 0), Some(Material::new("untextured", None)));
    let mut selector = TextureSelector::new(catalog());
    selector.capture(scene);
    if let Some(scene) = selector.scene_mut() {
        scene.settle();
    }

    let outcome = selector.apply("cardboard");

    assert_eq!(
        outcome,
        ApplyOutcome::Applied {
            name: "cardboard".to_string(),
            meshes: 3
        }
    );
    let scene = selector.scene().unwrap();
    for (_, material) in &scene.meshes {
        let material = material.as_ref().unwrap();
        assert_eq!(material.base_colour(), Some(T1));
        assert!(material.needs_update());
    }
    assert_eq!(selector.phase(), SelectorPhase::Applied);
    assert_eq!(selector.selection(), Some("cardboard"));
}

#[test]
fn sentinel_restores_the_captured_textures() {
    let scene = FakeScene::default()
        .with_mesh(MeshId::new(0, 0), textured("floor", T0))
        .with_mesh(MeshId::new(0, 1), textured("wall", T3))
        .with_mesh(MeshId::new(1, 0), Some(Material::new("untextured", None)));
    let mut selector = TextureSelector::new(catalog());
    selector.capture(scene);
    selector.apply("wood");
    if let Some(scene) = selector.scene_mut() {
        scene.settle();
    }

    let outcome = selector.apply(ORIGINAL_SELECTION);

    assert_eq!(outcome, ApplyOutcome::Restored { meshes: 3 });
    assert_eq!(texture_of(&selector, MeshId::new(0, 0)), Some(T0));
    assert_eq!(texture_of(&selector, MeshId::new(0, 1)), Some(T3));
    assert_eq!(texture_of(&selector, MeshId::new(1, 0)), None);
    let scene = selector.scene().unwrap();
    assert!(
        scene
            .meshes
            .iter()
            .all(|(_, material)| material.as_ref().unwrap().needs_update())
    );
}

#[test]
fn unknown_value_falls_back_to_the_originals() {
    let scene = FakeScene::default().with_mesh(M, textured("floor", T0));
    let mut selector = TextureSelector::new(catalog());
    selector.capture(scene);
    selector.apply("wood");

    let outcome = selector.apply("marble");

    assert_eq!(
        outcome,
        ApplyOutcome::FellBack {
            value: "marble".to_string(),
            meshes: 1
        }
    );
    assert_eq!(texture_of(&selector, M), Some(T0));
    assert_eq!(selector.selection(), Some("marble"));
}

#[test]
fn selection_before_capture_changes_nothing() {
    let mut selector: TextureSelector<FakeScene> = TextureSelector::new(catalog());

    assert_eq!(selector.apply("wood"), ApplyOutcome::NotLoaded);
    assert_eq!(selector.apply(ORIGINAL_SELECTION), ApplyOutcome::NotLoaded);

    assert_eq!(selector.phase(), SelectorPhase::Empty);
    assert!(selector.is_empty());
    assert!(selector.scene().is_none());
    assert_eq!(selector.selection(), None);
}

#[test]
fn wood_default_cardboard_scenario() {
    let scene = FakeScene::default().with_mesh(M, textured("kitchen", T0));
    let mut selector = TextureSelector::new(catalog());

    selector.capture(scene);
    assert_eq!(selector.entry(M).map(|entry| entry.original), Some(Some(T0)));

    selector.apply("wood");
    assert_eq!(texture_of(&selector, M), Some(T2));

    selector.apply("default");
    assert_eq!(texture_of(&selector, M), Some(T0));

    selector.apply("cardboard");
    assert_eq!(texture_of(&selector, M), Some(T1));
}

#[test]
fn mesh_without_material_is_never_captured_and_skipped_by_apply() {
    let bare = MeshId::new(3, 0);
    let scene = FakeScene::default()
        .with_mesh(M, textured("kitchen", T0))
        .with_mesh(bare, None);
    let mut selector = TextureSelector::new(catalog());

    assert_eq!(selector.capture(scene), 1);
    assert!(selector.entry(bare).is_none());

    assert_eq!(selector.apply("wood").meshes(), 1);
    assert_eq!(selector.apply("default").meshes(), 1);
    assert!(selector.scene().unwrap().material(bare).is_none());
}

#[test]
fn capture_keeps_the_first_original_of_a_repeated_id() {
    let scene = FakeScene::default()
        .with_mesh(M, textured("first", T0))
        .with_mesh(M, textured("second", T3));
    let mut selector = TextureSelector::new(catalog());

    assert_eq!(selector.capture(scene), 1);
    assert_eq!(selector.entry(M), Some(&MeshEntry { original: Some(T0) }));
}

#[test]
fn second_capture_replaces_scene_and_entries() {
    let mut selector = TextureSelector::new(catalog());
    selector.capture(FakeScene::default().with_mesh(M, textured("old", T0)));
    selector.apply("wood");

    let other = MeshId::new(7, 2);
    let captured = selector.capture(FakeScene::default().with_mesh(other, textured("new", T3)));

    assert_eq!(captured, 1);
    assert!(selector.entry(M).is_none());
    assert_eq!(selector.entry(other), Some(&MeshEntry { original: Some(T3) }));
    assert_eq!(selector.phase(), SelectorPhase::Captured);
    assert_eq!(selector.selection(), None);

    selector.apply("cardboard");
    selector.apply(ORIGINAL_SELECTION);
    assert_eq!(texture_of(&selector, other), Some(T3));
}

#[test]
fn original_is_restored_even_after_the_material_changed_elsewhere() {
    let mut selector = TextureSelector::new(catalog());
    selector.capture(FakeScene::default().with_mesh(M, textured("kitchen", T0)));

    selector
        .scene_mut()
        .and_then(|scene| scene.material_mut(M))
        .unwrap()
        .set_base_colour(Some(T3));
    selector.apply(ORIGINAL_SELECTION);

    assert_eq!(texture_of(&selector, M), Some(T0));
}

#[test]
fn catalog_keeps_insertion_order_and_replaces_duplicates() {
    let mut catalog = TextureCatalog::new();
    assert!(catalog.is_empty());

    catalog.insert("wood", T2);
    catalog.insert("cardboard", T1);
    catalog.insert("wood", T3);

    assert_eq!(catalog.len(), 2);
    assert_eq!(catalog.names().collect::<Vec<_>>(), vec!["wood", "cardboard"]);
    assert_eq!(catalog.get("wood"), Some(T3));
    assert_eq!(catalog.get("marble"), None);
}

#[test]
fn catalog_resolves_selection_values() {
    let catalog = catalog();

    assert_eq!(catalog.resolve(ORIGINAL_SELECTION), Selection::Original);
    assert_eq!(catalog.resolve(""), Selection::Original);
    assert_eq!(
        catalog.resolve("wood"),
        Selection::Catalog {
            name: "wood".to_string(),
            texture: T2
        }
    );
    assert_eq!(
        catalog.resolve("Wood"),
        Selection::Unrecognized("Wood".to_string())
    );
}
