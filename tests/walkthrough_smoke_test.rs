#[cfg(feature = "integration-tests")]
mod common;

#[test]
#[cfg(feature = "integration-tests")]
fn should_render_level_until_frame_limit() {
    use crate::common::test_utils::{LEVEL, config, full_level, glb};

    let root = std::env::temp_dir().join(format!("levelwalk-smoke-{}", std::process::id()));
    std::fs::create_dir_all(&root).unwrap();
    std::fs::write(root.join(LEVEL), glb(&full_level())).unwrap();

    let mut config = config();
    config.asset.root = root.to_string_lossy().into_owned();
    config.window.max_frames = Some(120);

    levelwalk::flow::run(config).unwrap();

    std::fs::remove_dir_all(&root).unwrap();
}
