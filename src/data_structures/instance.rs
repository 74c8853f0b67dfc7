//! Node transformation data.
//!
//! Every scene node, physics body pose and draw item carries an [`Instance`]:
//! position, rotation and scale. Composition with `*` follows scene-graph
//! semantics (`parent * local`).

use std::ops::Mul;

use cgmath::{Deg, Euler, InnerSpace, Matrix3, Matrix4, One, Quaternion, Vector3};

/// Position, rotation (as quaternion) and scale of a node.
#[derive(Clone, Debug, PartialEq)]
pub struct Instance {
    pub position: Vector3<f32>,
    pub rotation: Quaternion<f32>,
    pub scale: Vector3<f32>,
}

impl Instance {
    /// Identity transformation (no move, rotate, or scale).
    pub fn new() -> Self {
        Self {
            position: Vector3::new(0.0, 0.0, 0.0),
            // `Quaternion::one()` is the identity quaternion (no rotation)
            rotation: Quaternion::one(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    /// Builds an instance from glTF's decomposed `(translation, [x, y, z, w], scale)`.
    pub fn from_decomposed(decomposed: ([f32; 3], [f32; 4], [f32; 3])) -> Self {
        let (t, r, s) = decomposed;
        Self {
            position: t.into(),
            rotation: Quaternion::new(r[3], r[0], r[1], r[2]),
            scale: s.into(),
        }
    }

    /// Rotation from XYZ Euler angles given in degrees.
    pub fn from_euler_degrees(angles: [f32; 3]) -> Self {
        Self {
            rotation: Quaternion::from(Euler {
                x: Deg(angles[0]),
                y: Deg(angles[1]),
                z: Deg(angles[2]),
            }),
            ..Default::default()
        }
    }

    pub fn with_position(mut self, position: Vector3<f32>) -> Self {
        self.position = position;
        self
    }

    pub fn with_scale(mut self, scale: Vector3<f32>) -> Self {
        self.scale = scale;
        self
    }

    /// The same pose with unit scale. Rigid bodies cannot carry scale, so it is
    /// baked into collider vertices instead.
    pub fn without_scale(&self) -> Self {
        Self {
            position: self.position,
            rotation: self.rotation,
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    /// Decomposes an affine matrix into translation, rotation and scale.
    ///
    /// Shear cannot be represented and is dropped. A mirrored basis ends up as
    /// a negative z scale.
    pub fn from_matrix(m: Matrix4<f32>) -> Self {
        let position = m.w.truncate();
        let (x, y, z) = (m.x.truncate(), m.y.truncate(), m.z.truncate());
        let (sx, sy, mut sz) = (x.magnitude(), y.magnitude(), z.magnitude());
        if sx < f32::EPSILON || sy < f32::EPSILON || sz < f32::EPSILON {
            return Self {
                position,
                rotation: Quaternion::one(),
                scale: Vector3::new(sx, sy, sz),
            };
        }
        // Gram-Schmidt
        let ax = x / sx;
        let ay = (y - ax * ax.dot(y)).normalize();
        let az = ax.cross(ay);
        if az.dot(z) < 0.0 {
            sz = -sz;
        }
        Self {
            position,
            rotation: Quaternion::from(Matrix3::from_cols(ax, ay, az)).normalize(),
            scale: Vector3::new(sx, sy, sz),
        }
    }

    pub fn to_matrix(&self) -> cgmath::Matrix4<f32> {
        cgmath::Matrix4::from_translation(self.position)
            * cgmath::Matrix4::from(self.rotation)
            * cgmath::Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }
}

impl Mul<Instance> for Instance {
    type Output = Self;

    fn mul(self, rhs: Instance) -> Self::Output {
        &self * &rhs
    }
}

impl<'a, 'b> Mul<&'b Instance> for &'a Instance {
    type Output = Instance;

    fn mul(self, rhs: &'b Instance) -> Self::Output {
        // TRS composition is only exact when the parent scales uniformly or
        // the child is not rotated; otherwise go through the matrices.
        let uniform = self.scale.x == self.scale.y && self.scale.y == self.scale.z;
        if !uniform && rhs.rotation != Quaternion::one() {
            return Instance::from_matrix(self.to_matrix() * rhs.to_matrix());
        }

        let new_rotation = self.rotation * rhs.rotation;

        let new_scale = Vector3::new(
            self.scale.x * rhs.scale.x,
            self.scale.y * rhs.scale.y,
            self.scale.z * rhs.scale.z,
        );
        let scaled_rhs_pos = Vector3::new(
            self.scale.x * rhs.position.x,
            self.scale.y * rhs.position.y,
            self.scale.z * rhs.position.z,
        );
        let new_position = self.position + (self.rotation * scaled_rhs_pos);

        Instance {
            position: new_position,
            rotation: new_rotation,
            scale: new_scale,
        }
    }
}

impl From<Vector3<f32>> for Instance {
    fn from(position: Vector3<f32>) -> Self {
        Instance {
            position,
            ..Default::default()
        }
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self::new()
    }
}
