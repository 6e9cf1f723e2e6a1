//! Vector aliases and the 4×4 [`Matrix`] used by the scene and the renderer.
//!
//! All factories follow one convention: right-handed view space looking down
//! `-Z`, OpenGL clip space with NDC depth in `[-1, 1]`. The conversion to the
//! wgpu depth range happens when a projection is uploaded, see
//! [`OPENGL_TO_WGPU_MATRIX`].

use std::ops::{Index, IndexMut, Mul};

use cgmath::{InnerSpace, Matrix as _, Point3, Rad, SquareMatrix, Transform as _, Zero};

pub type Vector2f = cgmath::Vector2<f32>;
pub type Vector3f = cgmath::Vector3<f32>;
pub type Vector4f = cgmath::Vector4<f32>;
pub type Vector2i = cgmath::Vector2<i32>;
pub type Vector3i = cgmath::Vector3<i32>;

/// Remaps OpenGL clip-space depth `[-1, 1]` to the `[0, 1]` range wgpu expects.
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Normalisation that maps the zero vector to itself instead of NaN.
pub trait NormalizeOrZero {
    fn normalize_or_zero(self) -> Self;
}

impl NormalizeOrZero for Vector3f {
    fn normalize_or_zero(self) -> Self {
        let len = self.magnitude();
        if len == 0.0 { Self::zero() } else { self / len }
    }
}

impl NormalizeOrZero for Vector2f {
    fn normalize_or_zero(self) -> Self {
        let len = self.magnitude();
        if len == 0.0 { Self::zero() } else { self / len }
    }
}

/// Column-major 4×4 float matrix. `Default` is the identity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Matrix(pub cgmath::Matrix4<f32>);

impl Default for Matrix {
    fn default() -> Self {
        Self::identity()
    }
}

impl Matrix {
    pub fn identity() -> Self {
        Self(cgmath::Matrix4::identity())
    }

    /// Perspective projection; `fov` is the vertical field of view.
    pub fn perspective<A: Into<Rad<f32>>>(fov: A, aspect: f32, near: f32, far: f32) -> Self {
        Self(cgmath::perspective(fov, aspect, near, far))
    }

    /// View matrix for an eye at `eye` looking at `target`.
    pub fn look_at(eye: Vector3f, target: Vector3f, up: Vector3f) -> Self {
        Self(cgmath::Matrix4::look_at_rh(
            Point3::new(eye.x, eye.y, eye.z),
            Point3::new(target.x, target.y, target.z),
            up,
        ))
    }

    /// `T · Rz · Ry · Rx · S`, rotation angles in radians.
    pub fn model(position: Vector3f, rotation: Vector3f, scale: Vector3f) -> Self {
        Self(
            cgmath::Matrix4::from_translation(position)
                * cgmath::Matrix4::from(rotation_matrix(rotation))
                * cgmath::Matrix4::from_nonuniform_scale(scale.x, scale.y, scale.z),
        )
    }

    pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Self {
        Self(cgmath::ortho(left, right, bottom, top, near, far))
    }

    pub fn transform_point(&self, point: Vector3f) -> Vector3f {
        let p = self.0.transform_point(Point3::new(point.x, point.y, point.z));
        Vector3f::new(p.x, p.y, p.z)
    }

    /// Applies the matrix to `(x, y, z, 1)` without the perspective divide.
    pub fn transform_homogeneous(&self, point: Vector3f) -> Vector4f {
        self.0 * point.extend(1.0)
    }

    pub fn inverse(&self) -> Option<Self> {
        self.0.invert().map(Self)
    }

    /// Inverse transpose, used to carry normals through non-uniform scale.
    /// Singular matrices fall back to the identity.
    pub fn inverse_transpose(&self) -> Self {
        match self.0.invert() {
            Some(inverse) => Self(inverse.transpose()),
            None => Self::identity(),
        }
    }

    pub fn to_cols_array(&self) -> [[f32; 4]; 4] {
        self.0.into()
    }
}

/// Rotation `Rz · Ry · Rx` for Euler angles in radians.
pub fn rotation_matrix(rotation: Vector3f) -> cgmath::Matrix3<f32> {
    cgmath::Matrix3::from_angle_z(Rad(rotation.z))
        * cgmath::Matrix3::from_angle_y(Rad(rotation.y))
        * cgmath::Matrix3::from_angle_x(Rad(rotation.x))
}

impl Index<usize> for Matrix {
    type Output = f32;

    fn index(&self, index: usize) -> &f32 {
        let linear: &[f32; 16] = self.0.as_ref();
        &linear[index]
    }
}

impl IndexMut<usize> for Matrix {
    fn index_mut(&mut self, index: usize) -> &mut f32 {
        let linear: &mut [f32; 16] = self.0.as_mut();
        &mut linear[index]
    }
}

impl Mul for Matrix {
    type Output = Matrix;

    fn mul(self, rhs: Matrix) -> Matrix {
        Matrix(self.0 * rhs.0)
    }
}

impl From<cgmath::Matrix4<f32>> for Matrix {
    fn from(m: cgmath::Matrix4<f32>) -> Self {
        Self(m)
    }
}

impl From<Matrix> for [[f32; 4]; 4] {
    fn from(m: Matrix) -> Self {
        m.to_cols_array()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_identity() {
        let m = Matrix::default();
        for i in 0..16 {
            let expected = if i % 5 == 0 { 1.0 } else { 0.0 };
            assert_eq!(m[i], expected, "element {i}");
        }
    }

    #[test]
    fn linear_index_is_column_major() {
        let m = Matrix::model(
            Vector3f::new(1.0, 2.0, 3.0),
            Vector3f::zero(),
            Vector3f::new(1.0, 1.0, 1.0),
        );
        assert_eq!(m[12], 1.0);
        assert_eq!(m[13], 2.0);
        assert_eq!(m[14], 3.0);
    }

    #[test]
    fn singular_inverse_transpose_falls_back_to_identity() {
        let flat = Matrix::model(Vector3f::zero(), Vector3f::zero(), Vector3f::new(1.0, 0.0, 1.0));
        assert_eq!(flat.inverse_transpose(), Matrix::identity());
    }
}
