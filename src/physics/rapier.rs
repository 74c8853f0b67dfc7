use std::collections::HashMap;

use anyhow::{bail, ensure};
use cgmath::Vector3;
use rapier3d::{
    control::{CharacterAutostep, CharacterLength, KinematicCharacterController},
    na::{self, Isometry3, Translation3, UnitQuaternion},
    prelude::*,
};

use crate::{
    config::PhysicsConfig,
    data_structures::{instance::Instance, scene_graph::Geometry},
    level::{BodyKind, BodySource, PhysicsBodyDescriptor, ShapeApprox},
    physics::{CharacterBody, CharacterMotion, DebugLine, PhysicsBackend},
};

/// Half thickness of the slab standing in for the infinitely thin ground plane.
const GROUND_HALF_THICKNESS: f32 = 0.05;

const FIXED_COLOR: [f32; 4] = [0.1, 0.9, 0.2, 1.0];
const KINEMATIC_COLOR: [f32; 4] = [0.95, 0.8, 0.1, 1.0];

struct Character {
    controller: KinematicCharacterController,
    shape: SharedShape,
}

pub struct RapierWorld {
    gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    characters: HashMap<RigidBodyHandle, Character>,
    debug: bool,
}

impl RapierWorld {
    pub fn new(config: &PhysicsConfig) -> Self {
        let [gx, gy, gz] = config.gravity;
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = config.timestep;
        Self {
            gravity: vector![gx, gy, gz],
            integration_parameters,
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            characters: HashMap::new(),
            debug: false,
        }
    }

    /// Friction of the first collider attached to `handle`.
    pub fn friction(&self, handle: RigidBodyHandle) -> Option<f32> {
        let body = self.bodies.get(handle)?;
        let collider = self.colliders.get(*body.colliders().first()?)?;
        Some(collider.friction())
    }

    pub fn is_fixed(&self, handle: RigidBodyHandle) -> bool {
        self.bodies.get(handle).is_some_and(|body| body.is_fixed())
    }

    fn collider_for(body: &PhysicsBodyDescriptor) -> anyhow::Result<ColliderBuilder> {
        match (body.shape, &body.source) {
            (ShapeApprox::Implicit, BodySource::GroundPlane { size }) => {
                let half = size / 2.0;
                Ok(ColliderBuilder::cuboid(half, GROUND_HALF_THICKNESS, half)
                    .translation(vector![0.0, -GROUND_HALF_THICKNESS, 0.0]))
            }
            (ShapeApprox::Implicit, BodySource::Node(_)) => {
                bail!("{} asks for an implicit shape but has no generated primitive", body.name())
            }
            (ShapeApprox::Hull, _) => {
                let geometry = body.geometry();
                ensure!(!geometry.vertices.is_empty(), "{} has no vertices to build a hull from", body.name());
                let points = to_points(&geometry);
                match ColliderBuilder::convex_hull(&points) {
                    Some(builder) => Ok(builder),
                    None => {
                        log::warn!(
                            "Convex hull for {} is degenerate, using its triangle mesh instead",
                            body.name()
                        );
                        trimesh(body.name(), geometry)
                    }
                }
            }
            (ShapeApprox::Trimesh, _) => trimesh(body.name(), body.geometry()),
        }
    }
}

fn to_points(geometry: &Geometry) -> Vec<Point<Real>> {
    geometry
        .vertices
        .iter()
        .map(|v| point![v[0], v[1], v[2]])
        .collect()
}

fn trimesh(name: &str, geometry: Geometry) -> anyhow::Result<ColliderBuilder> {
    ensure!(!geometry.is_empty(), "{} has no triangles to build a trimesh from", name);
    let points = to_points(&geometry);
    Ok(ColliderBuilder::trimesh(points, geometry.triangles))
}

pub(crate) fn to_isometry(pose: &Instance) -> Isometry3<Real> {
    let q = pose.rotation;
    let rotation = UnitQuaternion::from_quaternion(na::Quaternion::new(q.s, q.v.x, q.v.y, q.v.z));
    Isometry3::from_parts(
        Translation3::new(pose.position.x, pose.position.y, pose.position.z),
        rotation,
    )
}

pub(crate) fn to_instance(iso: &Isometry3<Real>) -> Instance {
    let t = iso.translation.vector;
    let q = iso.rotation;
    Instance {
        position: Vector3::new(t.x, t.y, t.z),
        rotation: cgmath::Quaternion::new(q.w, q.i, q.j, q.k),
        scale: Vector3::new(1.0, 1.0, 1.0),
    }
}

impl PhysicsBackend for RapierWorld {
    type Handle = RigidBodyHandle;

    fn insert_body(&mut self, body: &PhysicsBodyDescriptor) -> anyhow::Result<RigidBodyHandle> {
        let collider = Self::collider_for(body)?;
        let collider = match body.friction {
            Some(friction) => collider.friction(friction),
            None => collider,
        };
        let rigid_body = match body.kind {
            BodyKind::Fixed => RigidBodyBuilder::fixed(),
        }
        .position(to_isometry(&body.pose))
        .build();

        let handle = self.bodies.insert(rigid_body);
        self.colliders
            .insert_with_parent(collider.build(), handle, &mut self.bodies);
        log::debug!("Inserted {:?} body for {} ({:?})", body.group, body.name(), body.shape);
        Ok(handle)
    }

    fn remove_body(&mut self, handle: RigidBodyHandle) {
        self.characters.remove(&handle);
        self.bodies.remove(
            handle,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
    }

    fn body_pose(&self, handle: RigidBodyHandle) -> Option<Instance> {
        self.bodies.get(handle).map(|body| to_instance(body.position()))
    }

    fn body_count(&self) -> usize {
        self.bodies.len()
    }

    fn insert_character(&mut self, body: &CharacterBody) -> RigidBodyHandle {
        let p = body.position;
        let rigid_body = RigidBodyBuilder::kinematic_position_based()
            .translation(vector![p.x, p.y, p.z])
            .build();
        let handle = self.bodies.insert(rigid_body);
        let collider = ColliderBuilder::capsule_y(body.half_height, body.radius).build();
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);

        let controller = KinematicCharacterController {
            offset: CharacterLength::Absolute(body.float_height),
            snap_to_ground: Some(CharacterLength::Absolute(0.2)),
            autostep: Some(CharacterAutostep {
                max_height: CharacterLength::Absolute(0.3),
                min_width: CharacterLength::Absolute(0.2),
                include_dynamic_bodies: false,
            }),
            ..Default::default()
        };
        self.characters.insert(
            handle,
            Character {
                controller,
                shape: SharedShape::capsule_y(body.half_height, body.radius),
            },
        );
        handle
    }

    fn move_character(
        &mut self,
        handle: RigidBodyHandle,
        desired: Vector3<f32>,
        dt: f32,
    ) -> CharacterMotion {
        let (Some(character), Some(body)) = (self.characters.get(&handle), self.bodies.get(handle))
        else {
            log::warn!("move_character called with unknown handle {:?}", handle);
            return CharacterMotion::default();
        };
        let position = *body.position();
        let movement = character.controller.move_shape(
            dt,
            &self.bodies,
            &self.colliders,
            &self.query_pipeline,
            character.shape.as_ref(),
            &position,
            vector![desired.x, desired.y, desired.z],
            QueryFilter::default().exclude_rigid_body(handle),
            |_| {},
        );
        let next = position.translation.vector + movement.translation;
        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_next_kinematic_translation(next);
        }
        CharacterMotion {
            translation: Vector3::new(
                movement.translation.x,
                movement.translation.y,
                movement.translation.z,
            ),
            grounded: movement.grounded,
        }
    }

    fn step(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }

    fn set_debug(&mut self, enabled: bool) {
        self.debug = enabled;
    }

    fn debug_enabled(&self) -> bool {
        self.debug
    }

    fn debug_lines(&self) -> Vec<DebugLine> {
        if !self.debug {
            return Vec::new();
        }
        let mut lines = Vec::new();
        for (_, collider) in self.colliders.iter() {
            let color = match collider.parent().and_then(|parent| self.bodies.get(parent)) {
                Some(body) if body.is_kinematic() => KINEMATIC_COLOR,
                _ => FIXED_COLOR,
            };
            let aabb = collider.compute_aabb();
            aabb_lines(
                [aabb.mins.x, aabb.mins.y, aabb.mins.z],
                [aabb.maxs.x, aabb.maxs.y, aabb.maxs.z],
                color,
                &mut lines,
            );
        }
        lines
    }
}

fn aabb_lines(min: [f32; 3], max: [f32; 3], color: [f32; 4], out: &mut Vec<DebugLine>) {
    let corner = |i: usize| {
        [
            if i & 1 == 0 { min[0] } else { max[0] },
            if i & 2 == 0 { min[1] } else { max[1] },
            if i & 4 == 0 { min[2] } else { max[2] },
        ]
    };
    // corners that differ in exactly one bit share an edge
    for a in 0..8usize {
        for bit in [1usize, 2, 4] {
            let b = a | bit;
            if b != a {
                out.push(DebugLine {
                    from: corner(a),
                    to: corner(b),
                    color,
                });
            }
        }
    }
}
