use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use futures::{executor::block_on, future::Shared};
use levelwalk::{error::LoadError, resources::AssetLoader};

use crate::common::test_utils::{
    LEVEL, MemorySource, NodeDef, assert_vec3_eq, full_level, glb, gltf_embedded, gltf_external,
    loader, loader_on,
};

mod common;

#[test]
fn should_load_glb_into_scene_asset() {
    let source = MemorySource::new().with_file(LEVEL, glb(&full_level()));
    let loader = loader(source);

    let asset = block_on(loader.load(LEVEL)).unwrap();

    let names: Vec<_> = asset.children().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec![".collision__001", ".floor", "N_table", "Misc_plant"]);
    let table = &asset.children()[2];
    assert_vec3_eq(table.transform.position, [2.0, 0.4, 2.0]);
    let mesh = table.mesh.as_ref().unwrap();
    assert_eq!(mesh.primitives.len(), 1);
    assert_eq!(mesh.primitives[0].triangle_count(), 12);
    // generated, since the file carries no normals
    assert_eq!(mesh.primitives[0].normals.len(), 8);
    assert_eq!(asset.node_count(), 4);
}

#[test]
fn should_keep_nested_nodes() {
    let level = vec![NodeDef::group("N_set").with_child(
        NodeDef::cube("seat", [0.5; 3]).with_child(NodeDef::cube("cushion", [0.4, 0.1, 0.4])),
    )];
    let loader = loader(MemorySource::new().with_file(LEVEL, glb(&level)));

    let asset = block_on(loader.load(LEVEL)).unwrap();

    assert_eq!(asset.children().len(), 1);
    assert_eq!(asset.node_count(), 3);
    let names: Vec<_> = asset.mesh_nodes().iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, vec!["seat", "cushion"]);
}

#[test]
fn should_load_gltf_with_embedded_buffer() {
    let loader = loader(MemorySource::new().with_file("level.gltf", gltf_embedded(&full_level())));

    let asset = block_on(loader.load("level.gltf")).unwrap();

    assert_eq!(asset.children().len(), 4);
    assert_eq!(asset.mesh_nodes().len(), 4);
}

#[test]
fn should_fetch_external_buffer_next_to_document() {
    let (json, bin) = gltf_external(&full_level(), "level.bin");
    let source = MemorySource::new()
        .with_file("maps/level.gltf", json)
        .with_file("maps/level.bin", bin);
    let loader = loader(source.clone());

    let asset = block_on(loader.load("maps/level.gltf")).unwrap();

    assert_eq!(asset.children()[2].name, "N_table");
    assert_eq!(source.fetches(), 2);
}

#[test]
fn should_fail_when_external_buffer_is_missing() {
    let (json, _) = gltf_external(&full_level(), "level.bin");
    let loader = loader(MemorySource::new().with_file("level.gltf", json));

    let err = block_on(loader.load("level.gltf")).unwrap_err();

    assert!(matches!(err, LoadError::Fetch { .. }), "{:?}", err);
    assert_eq!(err.path(), "level.bin");
}

#[test]
fn should_run_post_load_hook_before_publication() {
    let bytes = glb(&full_level());
    let with_hook = loader(MemorySource::new().with_file(LEVEL, bytes.clone()));
    let without_hook = AssetLoader::new(MemorySource::new().with_file(LEVEL, bytes));

    let hooked = block_on(with_hook.load(LEVEL)).unwrap();
    let plain = block_on(without_hook.load(LEVEL)).unwrap();

    assert!(hooked.children()[0].cast_shadow && hooked.children()[0].receive_shadow);
    assert!(hooked.children()[2].cast_shadow);
    assert!(!hooked.children()[3].cast_shadow);
    assert!(plain.children().iter().all(|c| !c.cast_shadow && !c.receive_shadow));
}

#[tokio::test]
async fn should_coalesce_concurrent_loads() {
    let (source, gate) = MemorySource::new()
        .with_file(LEVEL, glb(&full_level()))
        .gated();
    let loader = loader(source.clone());

    let first = tokio::spawn(loader.load(LEVEL));
    let second = tokio::spawn(loader.load(LEVEL));
    tokio::task::yield_now().await;
    assert!(loader.is_requested(LEVEL));
    assert!(loader.peek(LEVEL).is_none());

    gate.send(()).unwrap();
    let first = first.await.unwrap().unwrap();
    let second = second.await.unwrap().unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(source.fetches(), 1);
}

#[test]
fn should_serve_later_loads_from_cache() {
    let source = MemorySource::new().with_file(LEVEL, glb(&full_level()));
    let loader = loader(source.clone());

    let first = block_on(loader.load(LEVEL)).unwrap();
    let again = block_on(loader.load(LEVEL)).unwrap();

    assert!(Arc::ptr_eq(&first, &again));
    assert_eq!(source.fetches(), 1);
    assert!(Arc::ptr_eq(&loader.peek(LEVEL).unwrap().unwrap(), &first));
}

#[test]
fn should_share_preload_with_first_mount() {
    let source = MemorySource::new().with_file(LEVEL, glb(&full_level()));
    let loader = loader(source.clone());

    let preload = loader.preload(LEVEL);
    let mount = loader.load(LEVEL);

    assert!(Shared::ptr_eq(&preload, &mount));
    block_on(preload).unwrap();
    assert!(mount.peek().is_some_and(|result| result.is_ok()));
    assert_eq!(source.fetches(), 1);
}

#[test]
fn should_report_missing_asset_as_fetch_error() {
    let loader = loader(MemorySource::new());

    let err = block_on(loader.load("missing.glb")).unwrap_err();

    assert!(matches!(err, LoadError::Fetch { .. }), "{:?}", err);
    assert_eq!(err.path(), "missing.glb");
}

#[test]
fn should_report_garbage_as_parse_error() {
    let loader = loader(MemorySource::new().with_file(LEVEL, b"definitely not gltf".to_vec()));

    let err = block_on(loader.load(LEVEL)).unwrap_err();

    assert!(matches!(err, LoadError::Parse { .. }), "{:?}", err);
    assert_eq!(err.path(), LEVEL);
}

#[test]
fn should_retry_after_failure() {
    let source = MemorySource::new();
    let loader = loader(source.clone());
    assert!(block_on(loader.load(LEVEL)).is_err());

    source.insert(LEVEL, glb(&full_level()));
    let asset = block_on(loader.load(LEVEL)).unwrap();

    assert_eq!(asset.children().len(), 4);
    assert_eq!(source.fetches(), 2);
}

#[test]
fn should_share_load_for_rooted_path() {
    let source = MemorySource::new().with_file(LEVEL, glb(&full_level()));
    let loader = loader(source.clone());

    let plain = block_on(loader.load(LEVEL)).unwrap();
    let rooted = block_on(loader.load(&format!("/{}", LEVEL))).unwrap();

    assert!(Arc::ptr_eq(&plain, &rooted));
    assert_eq!(source.fetches(), 1);
    assert!(loader.is_requested(&format!("/{}", LEVEL)));
}

#[test]
fn should_drive_load_on_attached_runtime() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let source = MemorySource::new().with_file(LEVEL, glb(&full_level()));
    let loader = loader_on(source.clone(), runtime.handle().clone());

    drop(loader.load(LEVEL));
    let mut settled = None;
    for _ in 0..1000 {
        settled = loader.peek(LEVEL);
        if settled.is_some() {
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(1));
    }

    assert_eq!(settled.unwrap().unwrap().children().len(), 4);
    assert_eq!(source.fetches(), 1);
}

#[tokio::test]
async fn should_finish_load_after_first_caller_drops_out() {
    let (source, gate) = MemorySource::new()
        .with_file(LEVEL, glb(&full_level()))
        .gated();
    let loader = loader(source.clone());

    let mut abandoned = loader.load(LEVEL);
    assert!(futures::poll!(&mut abandoned).is_pending());
    drop(abandoned);

    let later = loader.load(LEVEL);
    gate.send(()).unwrap();

    assert!(later.await.is_ok());
    assert_eq!(source.fetches(), 1);
}

#[test]
fn should_install_global_loader_once() {
    let first = AssetLoader::global(|| AssetLoader::new(MemorySource::new()));
    let called = AtomicBool::new(false);
    let second = AssetLoader::global(|| {
        called.store(true, Ordering::SeqCst);
        AssetLoader::new(MemorySource::new())
    });

    assert!(Arc::ptr_eq(&first, &second));
    assert!(!called.load(Ordering::SeqCst));
}
