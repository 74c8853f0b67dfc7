//! Scene parameters.
//!
//! All tunables of the walkthrough live here as plain data with defaults. Only
//! the asset location and a frame limit can be overridden from the
//! environment; everything else is compiled in.

use std::env;

use winit::keyboard::KeyCode;

/// Everything the scene needs to know before it is mounted.
#[derive(Clone, Debug, Default)]
pub struct SceneConfig {
    pub asset: AssetConfig,
    pub physics: PhysicsConfig,
    pub ground: GroundConfig,
    pub character: CharacterConfig,
    pub camera: CameraConfig,
    pub lighting: LightingConfig,
    pub post: PostProcessingConfig,
    pub keyboard: KeyboardMap,
    pub window: WindowConfig,
}

impl SceneConfig {
    /// Defaults overlaid with `LEVELWALK_ASSET_ROOT`, `LEVELWALK_ASSET` and
    /// `LEVELWALK_MAX_FRAMES`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(root) = env::var("LEVELWALK_ASSET_ROOT") {
            config.asset.root = root;
        }
        if let Ok(path) = env::var("LEVELWALK_ASSET") {
            config.asset.path = path;
        }
        if let Ok(frames) = env::var("LEVELWALK_MAX_FRAMES") {
            match frames.parse::<u64>() {
                Ok(frames) => config.window.max_frames = Some(frames),
                Err(e) => log::warn!("Ignoring LEVELWALK_MAX_FRAMES={:?}: {}", frames, e),
            }
        }
        config
    }
}

#[derive(Clone, Debug)]
pub struct AssetConfig {
    /// Directory the asset path is resolved against.
    pub root: String,
    pub path: String,
    /// XYZ Euler rotation in degrees applied on top of the asset's own root.
    pub root_alignment_degrees: [f32; 3],
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            root: "assets".to_string(),
            path: "825.glb".to_string(),
            root_alignment_degrees: [0.0, 0.0, 0.0],
        }
    }
}

#[derive(Clone, Debug)]
pub struct PhysicsConfig {
    pub gravity: [f32; 3],
    pub timestep: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: [0.0, -9.81, 0.0],
            timestep: 1.0 / 60.0,
        }
    }
}

/// The generated ground plane that exists regardless of the asset.
#[derive(Clone, Debug)]
pub struct GroundConfig {
    pub size: f32,
    pub color: [f32; 4],
    pub friction: f32,
}

impl Default for GroundConfig {
    fn default() -> Self {
        Self {
            size: 100.0,
            color: hex_color(0x303030),
            friction: 0.7,
        }
    }
}

/// Initial values handed to the character controller.
#[derive(Clone, Debug)]
pub struct CharacterConfig {
    pub capsule_half_height: f32,
    pub capsule_radius: f32,
    pub spawn: [f32; 3],
    pub float_height: f32,
    pub max_velocity: f32,
    pub turn_velocity_multiplier: f32,
    pub turn_speed: f32,
    pub jump_velocity: f32,
    pub sprint_multiplier: f32,
    pub color: [f32; 4],
    /// The visible capsule is smaller than the collider.
    pub visual_radius: f32,
    pub visual_length: f32,
}

impl Default for CharacterConfig {
    fn default() -> Self {
        Self {
            capsule_half_height: 0.35,
            capsule_radius: 0.3,
            // elevated to avoid spawning inside the floor
            spawn: [4.0, 7.0, 0.0],
            float_height: 0.1,
            max_velocity: 5.0,
            turn_velocity_multiplier: 0.2,
            turn_speed: 10.0,
            jump_velocity: 5.0,
            sprint_multiplier: 2.0,
            color: [0.0, 0.0, 1.0, 1.0],
            visual_radius: 0.1,
            visual_length: 0.2,
        }
    }
}

#[derive(Clone, Debug)]
pub struct CameraConfig {
    pub fov_degrees: f32,
    pub start_position: [f32; 3],
    pub init_distance: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub follow_multiplier: f32,
    pub near: f32,
    pub far: f32,
    /// Radians of orbit per pixel of mouse drag.
    pub drag_sensitivity: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 45.0,
            start_position: [8.0, 8.0, 10.0],
            init_distance: 5.0,
            min_distance: 1.0,
            max_distance: 10.0,
            follow_multiplier: 10.0,
            near: 0.1,
            far: 500.0,
            drag_sensitivity: 0.005,
        }
    }
}

#[derive(Clone, Debug)]
pub struct LightingConfig {
    pub hemisphere_sky: [f32; 4],
    pub hemisphere_ground: [f32; 4],
    pub hemisphere_intensity: f32,
    pub ambient_intensity: f32,
    pub sun: DirectionalLightConfig,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            hemisphere_sky: hex_color(0xffffff),
            hemisphere_ground: hex_color(0xd3d3d3),
            hemisphere_intensity: 0.8,
            ambient_intensity: 0.5,
            sun: DirectionalLightConfig::default(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct DirectionalLightConfig {
    /// Shines from here towards the origin.
    pub position: [f32; 3],
    pub intensity: f32,
    pub color: [f32; 4],
    pub cast_shadow: bool,
    pub shadow_map_size: u32,
    pub shadow_near: f32,
    pub shadow_far: f32,
    /// Half extent of the orthographic shadow frustum.
    pub shadow_extent: f32,
}

impl Default for DirectionalLightConfig {
    fn default() -> Self {
        Self {
            position: [5.0, 10.0, 5.0],
            intensity: 3.0,
            color: hex_color(0xffffff),
            cast_shadow: true,
            shadow_map_size: 2048,
            shadow_near: 0.1,
            shadow_far: 50.0,
            shadow_extent: 12.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToneMapping {
    None,
    AcesFilmic,
}

#[derive(Clone, Debug)]
pub struct PostProcessingConfig {
    pub tone_mapping: ToneMapping,
    pub exposure: f32,
    pub bloom: BloomConfig,
    pub brightness: f32,
    pub contrast: f32,
    pub vignette: VignetteConfig,
}

impl Default for PostProcessingConfig {
    fn default() -> Self {
        Self {
            tone_mapping: ToneMapping::AcesFilmic,
            // keeps whites soft-clipped
            exposure: 1.1,
            bloom: BloomConfig::default(),
            brightness: 0.0,
            contrast: 0.08,
            vignette: VignetteConfig::default(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct BloomConfig {
    pub enabled: bool,
    pub mipmap_blur: bool,
    pub intensity: f32,
    /// Only fragments brighter than this bloom.
    pub luminance_threshold: f32,
    pub luminance_smoothing: f32,
}

impl Default for BloomConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mipmap_blur: true,
            intensity: 0.15,
            luminance_threshold: 1.0,
            luminance_smoothing: 0.25,
        }
    }
}

#[derive(Clone, Debug)]
pub struct VignetteConfig {
    pub enabled: bool,
    pub eskil: bool,
    pub offset: f32,
    pub darkness: f32,
}

impl Default for VignetteConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            eskil: false,
            offset: 0.3,
            darkness: 0.2,
        }
    }
}

/// Logical actions consumed by the character controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    Forward,
    Backward,
    Leftward,
    Rightward,
    Jump,
    Run,
    Action1,
    Action2,
    Action3,
    Action4,
}

impl Action {
    pub const ALL: [Action; 10] = [
        Action::Forward,
        Action::Backward,
        Action::Leftward,
        Action::Rightward,
        Action::Jump,
        Action::Run,
        Action::Action1,
        Action::Action2,
        Action::Action3,
        Action::Action4,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Action::Forward => "forward",
            Action::Backward => "backward",
            Action::Leftward => "leftward",
            Action::Rightward => "rightward",
            Action::Jump => "jump",
            Action::Run => "run",
            Action::Action1 => "action1",
            Action::Action2 => "action2",
            Action::Action3 => "action3",
            Action::Action4 => "action4",
        }
    }
}

/// Physical keys per action, plus the raw debug toggle.
#[derive(Clone, Debug)]
pub struct KeyboardMap {
    pub bindings: Vec<(Action, Vec<KeyCode>)>,
    pub debug_toggle: KeyCode,
}

impl KeyboardMap {
    pub fn action_for(&self, key: KeyCode) -> Option<Action> {
        self.bindings
            .iter()
            .find(|(_, keys)| keys.contains(&key))
            .map(|(action, _)| *action)
    }

    pub fn keys_for(&self, action: Action) -> &[KeyCode] {
        self.bindings
            .iter()
            .find(|(a, _)| *a == action)
            .map(|(_, keys)| keys.as_slice())
            .unwrap_or(&[])
    }
}

impl Default for KeyboardMap {
    fn default() -> Self {
        Self {
            bindings: vec![
                (Action::Forward, vec![KeyCode::ArrowUp, KeyCode::KeyW]),
                (Action::Backward, vec![KeyCode::ArrowDown, KeyCode::KeyS]),
                (Action::Leftward, vec![KeyCode::ArrowLeft, KeyCode::KeyA]),
                (Action::Rightward, vec![KeyCode::ArrowRight, KeyCode::KeyD]),
                (Action::Jump, vec![KeyCode::Space]),
                (Action::Run, vec![KeyCode::ShiftLeft, KeyCode::ShiftRight]),
                (Action::Action1, vec![KeyCode::Digit1]),
                (Action::Action2, vec![KeyCode::Digit2]),
                (Action::Action3, vec![KeyCode::Digit3]),
                (Action::Action4, vec![KeyCode::KeyF]),
            ],
            debug_toggle: KeyCode::KeyP,
        }
    }
}

#[derive(Clone, Debug)]
pub struct WindowConfig {
    pub title: String,
    pub clear_color: [f64; 4],
    /// Exit after this many frames; used for smoke runs.
    pub max_frames: Option<u64>,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "levelwalk | WASD to move, SPACE to jump, SHIFT to run, P to toggle physics debug"
                .to_string(),
            clear_color: [0.0, 0.0, 0.0, 1.0],
            max_frames: None,
        }
    }
}

/// `0xRRGGBB` to linear RGBA.
pub fn hex_color(rgb: u32) -> [f32; 4] {
    let channel = |shift: u32| srgb_to_linear(((rgb >> shift) & 0xff) as f32 / 255.0);
    [channel(16), channel(8), channel(0), 1.0]
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}
