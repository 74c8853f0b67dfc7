use levelwalk::config::{SceneConfig, hex_color};

use crate::common::test_utils::approx_eq;

mod common;

#[test]
fn should_default_to_walkthrough_parameters() {
    let config = SceneConfig::default();

    assert_eq!(config.asset.root, "assets");
    assert_eq!(config.asset.path, "825.glb");
    assert_eq!(config.asset.root_alignment_degrees, [0.0, 0.0, 0.0]);
    assert_eq!(config.physics.gravity, [0.0, -9.81, 0.0]);
    assert_eq!(config.ground.size, 100.0);
    assert_eq!(config.ground.friction, 0.7);
    assert_eq!(config.character.spawn, [4.0, 7.0, 0.0]);
    assert_eq!(config.character.max_velocity * config.character.sprint_multiplier, 10.0);
    assert_eq!(config.camera.fov_degrees, 45.0);
    assert_eq!(config.lighting.sun.shadow_extent, 12.0);
    assert_eq!(config.window.max_frames, None);
}

#[test]
fn should_convert_hex_colors_to_linear() {
    assert!(hex_color(0xffffff).iter().all(|&c| approx_eq(c, 1.0)));
    assert_eq!(hex_color(0x000000), [0.0, 0.0, 0.0, 1.0]);

    // sRGB 0x30 is darker once linearized
    let ground = hex_color(0x303030);
    assert!(ground[0] > 0.0 && ground[0] < 48.0 / 255.0);
    assert!(approx_eq(ground[0], ground[2]));

    let [r, g, b, _] = hex_color(0xff0000);
    assert!(approx_eq(r, 1.0));
    assert_eq!((g, b), (0.0, 0.0));
}
