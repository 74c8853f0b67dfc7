//! Camera relative character controller.
//!
//! The controller turns held actions into a desired translation, hands it to
//! the physics backend and keeps the vertical velocity and heading that the
//! backend does not track.

use std::f32::consts::PI;

use cgmath::{Deg, InnerSpace, Point3, Quaternion, Rad, Rotation3, Vector3};

use crate::{
    camera::FollowCamera,
    config::{Action, CharacterConfig},
    data_structures::instance::Instance,
    input::ActionState,
    physics::{CharacterBody, CharacterMotion, PhysicsBackend},
};

#[derive(Debug, Clone)]
pub struct CharacterController {
    config: CharacterConfig,
    position: Vector3<f32>,
    vertical_velocity: f32,
    /// Heading around +Y in radians; 0 faces +Z.
    facing: f32,
    grounded: bool,
}

impl CharacterController {
    pub fn new(config: &CharacterConfig) -> Self {
        let [x, y, z] = config.spawn;
        Self {
            config: config.clone(),
            position: Vector3::new(x, y, z),
            vertical_velocity: 0.0,
            facing: 0.0,
            grounded: false,
        }
    }

    pub fn body(&self) -> CharacterBody {
        CharacterBody {
            half_height: self.config.capsule_half_height,
            radius: self.config.capsule_radius,
            float_height: self.config.float_height,
            position: self.position,
        }
    }

    pub fn position(&self) -> Point3<f32> {
        Point3::new(self.position.x, self.position.y, self.position.z)
    }

    pub fn facing(&self) -> f32 {
        self.facing
    }

    pub fn grounded(&self) -> bool {
        self.grounded
    }

    pub fn vertical_velocity(&self) -> f32 {
        self.vertical_velocity
    }

    /// Horizontal speed for the current input, sprint included.
    pub fn speed(&self, actions: &ActionState) -> f32 {
        if actions.is_held(Action::Run) {
            self.config.max_velocity * self.config.sprint_multiplier
        } else {
            self.config.max_velocity
        }
    }

    /// Translation the character wants this frame.
    ///
    /// `forward` and `right` are the camera's horizontal axes. Also updates
    /// the heading and the vertical velocity.
    pub fn desired_translation(
        &mut self,
        actions: &ActionState,
        forward: Vector3<f32>,
        right: Vector3<f32>,
        gravity: f32,
        dt: f32,
    ) -> Vector3<f32> {
        let direction = forward * actions.axis(Action::Forward, Action::Backward)
            + right * actions.axis(Action::Rightward, Action::Leftward);

        let horizontal = if direction.magnitude2() > f32::EPSILON {
            let direction = direction.normalize();
            let remaining = self.turn_towards(direction.x.atan2(direction.z), dt);
            direction * self.speed(actions) * self.turn_slowdown(remaining) * dt
        } else {
            Vector3::new(0.0, 0.0, 0.0)
        };

        if self.grounded && actions.is_held(Action::Jump) {
            self.vertical_velocity = self.config.jump_velocity;
            self.grounded = false;
        }
        self.vertical_velocity += gravity * dt;

        Vector3::new(horizontal.x, self.vertical_velocity * dt, horizontal.z)
    }

    /// Turns part of the way to `target` and returns the angle still left.
    fn turn_towards(&mut self, target: f32, dt: f32) -> f32 {
        let mut diff = (target - self.facing) % (2.0 * PI);
        if diff > PI {
            diff -= 2.0 * PI;
        } else if diff < -PI {
            diff += 2.0 * PI;
        }
        let t = (self.config.turn_speed * dt).min(1.0);
        self.facing += diff * t;
        diff * (1.0 - t)
    }

    /// Speed factor while the body still faces away from its heading:
    /// 1 when aligned, `turn_velocity_multiplier` when facing backwards.
    pub fn turn_slowdown(&self, remaining: f32) -> f32 {
        let alignment = (1.0 + remaining.cos()) / 2.0;
        let m = self.config.turn_velocity_multiplier;
        m + (1.0 - m) * alignment
    }

    pub fn apply_motion(&mut self, motion: CharacterMotion) {
        self.grounded = motion.grounded;
        if self.grounded && self.vertical_velocity < 0.0 {
            self.vertical_velocity = 0.0;
        }
        // bumped the ceiling
        if !self.grounded && self.vertical_velocity > 0.0 && motion.translation.y <= 0.0 {
            self.vertical_velocity = 0.0;
        }
    }

    /// One controller tick against the physics backend. The body moves on
    /// the next physics step; call [`CharacterController::sync`] afterwards.
    pub fn update<P: PhysicsBackend>(
        &mut self,
        physics: &mut P,
        handle: P::Handle,
        actions: &ActionState,
        camera: &FollowCamera,
        gravity: f32,
        dt: f32,
    ) {
        let desired =
            self.desired_translation(actions, camera.forward(), camera.right(), gravity, dt);
        let motion = physics.move_character(handle, desired, dt);
        self.apply_motion(motion);
    }

    /// Reads the body position back after a physics step.
    pub fn sync<P: PhysicsBackend>(&mut self, physics: &P, handle: P::Handle) {
        if let Some(pose) = physics.body_pose(handle) {
            self.position = pose.position;
        }
    }

    pub fn trigger(&self, action: Action) {
        match action {
            Action::Action1 | Action::Action2 | Action::Action3 | Action::Action4 => {
                log::info!("{} triggered at {:?}", action.name(), self.position);
            }
            _ => {}
        }
    }

    /// Pose of the visible capsule, centred on the body and turned to the heading.
    pub fn visual_transform(&self) -> Instance {
        Instance {
            rotation: Quaternion::from_angle_y(Rad(self.facing)),
            ..Instance::from(self.position)
        }
    }

    /// Radius and cylinder length of the visible capsule, which is smaller
    /// than the collider.
    pub fn visual_dimensions(&self) -> (f32, f32) {
        (self.config.visual_radius, self.config.visual_length)
    }

    pub fn color(&self) -> [f32; 4] {
        self.config.color
    }

    /// Heading in degrees, for logging.
    pub fn facing_degrees(&self) -> Deg<f32> {
        Rad(self.facing).into()
    }
}
