use levelwalk::{
    data_structures::scene_graph::SceneAsset,
    level::{
        NodeClass, Partition, classify,
        partition::{FLOOR_MARKER, WALL_MARKER, propagate_shadows},
    },
};

use crate::common::test_utils::{NodeDef, asset, full_level};

mod common;

#[test]
fn should_classify_markers_exactly() {
    assert_eq!(classify(".collision__001"), NodeClass::Wall);
    assert_eq!(classify(".floor"), NodeClass::Floor);
    assert_eq!(classify(".collision__002"), NodeClass::Unclassified);
    assert_eq!(classify(".floor2"), NodeClass::Unclassified);
    assert_eq!(classify("floor"), NodeClass::Unclassified);
}

#[test]
fn should_classify_furniture_by_prefix() {
    for name in ["N", "N_chair", "U_shelf", "U2_lamp", "Kitchen"] {
        assert_eq!(classify(name), NodeClass::Furniture, "{}", name);
    }
    for name in ["", "n_chair", "Misc", "Table", "_N"] {
        assert_eq!(classify(name), NodeClass::Unclassified, "{:?}", name);
    }
}

#[test]
fn should_partition_root_children_in_file_order() {
    let level = asset(&[
        NodeDef::cube("U_shelf", [0.5; 3]),
        NodeDef::cube(FLOOR_MARKER, [0.5; 3]),
        NodeDef::cube("Lamp", [0.5; 3]),
        NodeDef::cube(WALL_MARKER, [0.5; 3]),
        NodeDef::cube("K_stool", [0.5; 3]),
    ]);

    let partition = Partition::of(&level);

    assert_eq!(partition.wall, Some(3));
    assert_eq!(partition.floor, Some(1));
    assert_eq!(partition.furniture, vec![0, 4]);
    assert_eq!(partition.unclassified, vec![2]);
    assert_eq!(
        partition.collidable().collect::<Vec<_>>(),
        vec![
            (NodeClass::Wall, 3),
            (NodeClass::Floor, 1),
            (NodeClass::Furniture, 0),
            (NodeClass::Furniture, 4),
        ]
    );
    assert_eq!(partition.class_of(2), NodeClass::Unclassified);
    assert_eq!(partition.class_of(4), NodeClass::Furniture);
}

#[test]
fn should_only_classify_direct_children() {
    let level = asset(&[NodeDef::group("Group")
        .with_child(NodeDef::cube(WALL_MARKER, [1.0; 3]))
        .with_child(NodeDef::cube("N_nested", [1.0; 3]))]);

    let partition = Partition::of(&level);

    assert_eq!(partition.wall, None);
    assert!(partition.furniture.is_empty());
    assert_eq!(partition.unclassified, vec![0]);
}

#[test]
fn should_keep_first_duplicate_marker() {
    let level = asset(&[
        NodeDef::cube(FLOOR_MARKER, [1.0; 3]),
        NodeDef::cube(FLOOR_MARKER, [2.0; 3]),
    ]);

    let partition = Partition::of(&level);

    assert_eq!(partition.floor, Some(0));
    assert_eq!(partition.unclassified, vec![1]);
    assert_eq!(partition.collidable_count(), 1);
}

#[test]
fn should_partition_empty_asset() {
    let partition = Partition::of(&asset(&[]));

    assert_eq!(partition, Partition::default());
    assert_eq!(partition.collidable_count(), 0);
}

fn shadow_flags(asset: &SceneAsset) -> Vec<(String, bool, bool)> {
    let mut flags = Vec::new();
    asset.root.traverse(&mut |node| {
        if node.is_mesh() {
            flags.push((node.name.clone(), node.cast_shadow, node.receive_shadow));
        }
    });
    flags
}

#[test]
fn should_enable_shadows_on_collidable_subtrees_only() {
    let mut specs = full_level();
    specs[2] = specs[2]
        .clone()
        .with_child(NodeDef::cube("leg", [0.05, 0.4, 0.05]));
    let mut level = (*asset(&specs)).clone();

    propagate_shadows(&mut level);

    assert_eq!(
        shadow_flags(&level),
        vec![
            (".collision__001".to_string(), true, true),
            (".floor".to_string(), true, true),
            ("N_table".to_string(), true, true),
            ("leg".to_string(), true, true),
            ("Misc_plant".to_string(), false, false),
        ]
    );
}

#[test]
fn should_propagate_shadows_idempotently() {
    let mut level = (*asset(&full_level())).clone();

    propagate_shadows(&mut level);
    let once = shadow_flags(&level);
    propagate_shadows(&mut level);

    assert_eq!(shadow_flags(&level), once);
}

#[test]
fn should_leave_unclassified_flags_untouched() {
    let mut level = (*asset(&[NodeDef::cube("Misc", [1.0; 3])])).clone();
    level.root.children[0].cast_shadow = true;

    propagate_shadows(&mut level);

    assert_eq!(
        shadow_flags(&level),
        vec![("Misc".to_string(), true, false)]
    );
}
