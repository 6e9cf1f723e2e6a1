//! Camera, projection parameters and the WASD/mouse-look controller.

use cgmath::{Deg, Matrix as _, Rad};

use crate::{
    config::CameraConfig,
    data_structures::scene_graph::Transform,
    input::Input,
    math::{Matrix, OPENGL_TO_WGPU_MATRIX, Vector3f, rotation_matrix},
};
use winit::event::MouseButton;

/// Perspective parameters. The aspect ratio comes from the render target.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    pub fov: Rad<f32>,
    pub near: f32,
    pub far: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(fov: F, near: f32, far: f32) -> Self {
        Self {
            fov: fov.into(),
            near,
            far,
        }
    }

    pub fn matrix(&self, width: u32, height: u32) -> Matrix {
        let aspect = if height == 0 {
            1.0
        } else {
            width as f32 / height as f32
        };
        Matrix::perspective(self.fov, aspect, self.near, self.far)
    }
}

impl From<&CameraConfig> for Projection {
    fn from(config: &CameraConfig) -> Self {
        Self::new(Deg(config.fov_deg), config.near, config.far)
    }
}

/// A viewpoint in the scene. Scale in the transform is ignored.
///
/// The transform is relative to a parent world matrix, which is the identity
/// unless the camera follows an entity (see [`crate::flow::World::camera_parent`]).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub transform: Transform,
    projection: Matrix,
    parent_world: Matrix,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Transform::default())
    }
}

impl Camera {
    pub fn new(transform: Transform) -> Self {
        Self {
            transform,
            projection: Matrix::identity(),
            parent_world: Matrix::identity(),
        }
    }

    pub fn from_config(config: &CameraConfig) -> Self {
        Self::new(Transform {
            position: config.position.into(),
            rotation: config.rotation.into(),
            ..Default::default()
        })
    }

    /// Recompute the projection for a target of `width`×`height` pixels.
    pub fn update_projection(&mut self, projection: &Projection, width: u32, height: u32) {
        self.projection = projection.matrix(width, height);
    }

    /// OpenGL-convention projection set by the last [`Camera::update_projection`].
    pub fn projection(&self) -> Matrix {
        self.projection
    }

    /// Projection remapped to the wgpu depth range.
    pub fn wgpu_projection(&self) -> Matrix {
        Matrix(OPENGL_TO_WGPU_MATRIX) * self.projection
    }

    pub fn parent_world(&self) -> Matrix {
        self.parent_world
    }

    pub fn set_parent_world(&mut self, parent_world: Matrix) {
        self.parent_world = parent_world;
    }

    /// Inverse of the camera's world transform. A singular parent is ignored.
    pub fn view_matrix(&self) -> Matrix {
        let inverse_rotation = rotation_matrix(self.transform.rotation).transpose();
        let translation = -(inverse_rotation * self.transform.position);
        let mut view = cgmath::Matrix4::from(inverse_rotation);
        view.w = translation.extend(1.0);
        match self.parent_world.inverse() {
            Some(inverse_parent) => Matrix(view) * inverse_parent,
            None => Matrix(view),
        }
    }

    pub fn world_position(&self) -> Vector3f {
        self.parent_world.transform_point(self.transform.position)
    }

    /// Viewing direction relative to the parent, the local `-Z` axis.
    pub fn forward(&self) -> Vector3f {
        rotation_matrix(self.transform.rotation) * Vector3f::new(0.0, 0.0, -1.0)
    }

    pub fn right(&self) -> Vector3f {
        rotation_matrix(self.transform.rotation) * Vector3f::new(1.0, 0.0, 0.0)
    }

    pub fn up(&self) -> Vector3f {
        rotation_matrix(self.transform.rotation) * Vector3f::new(0.0, 1.0, 0.0)
    }
}

/// Moves a camera from an input snapshot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraController {
    pub speed: f32,
    pub sensitivity: f32,
}

impl CameraController {
    /// Pitch stays just short of straight up or down.
    const MAX_PITCH: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

    pub fn new(speed: f32, sensitivity: f32) -> Self {
        Self { speed, sensitivity }
    }

    pub fn update(&self, camera: &mut Camera, input: &Input, dt: f32) {
        let navigation = input.navigation();
        let step = camera.right() * navigation.x + camera.forward() * navigation.y;
        camera.transform.position += step * self.speed * dt;

        if input.mouse.is_pressed(MouseButton::Right) {
            let delta = input.mouse.delta();
            let rotation = &mut camera.transform.rotation;
            rotation.y -= delta.x * self.sensitivity;
            let pitch = rotation.x - delta.y * self.sensitivity;
            rotation.x = pitch.clamp(-Self::MAX_PITCH, Self::MAX_PITCH);
        }
    }
}

impl From<&CameraConfig> for CameraController {
    fn from(config: &CameraConfig) -> Self {
        Self::new(config.speed, config.sensitivity)
    }
}
