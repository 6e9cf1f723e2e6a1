//! Components attachable to scene entities.
//!
//! A [`Component`] is one of a closed set of kinds, looked up by its
//! [`ComponentKind`] tag. Mesh and material components are plain data that the
//! geometry pass reads; behaviours run once per frame and may move their entity.

use std::fmt::Debug;

use crate::{
    data_structures::{model::Material, scene_graph::Transform},
    resources::MeshId,
};

/// Per-frame logic attached to an entity.
pub trait Behaviour {
    fn update(&mut self, transform: &mut Transform, dt: f32);
}

impl<F> Behaviour for F
where
    F: FnMut(&mut Transform, f32),
{
    fn update(&mut self, transform: &mut Transform, dt: f32) {
        self(transform, dt)
    }
}

/// Refers to a mesh in [`crate::resources::Assets`]. Does not own it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MeshComponent {
    pub mesh: MeshId,
}

#[derive(Clone, Debug)]
pub struct MaterialComponent {
    pub material: Material,
}

/// Tag of a [`Component`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Mesh,
    Material,
    Behaviour,
}

pub enum Component {
    Mesh(MeshComponent),
    Material(MaterialComponent),
    Behaviour(Box<dyn Behaviour>),
}

impl Component {
    pub fn mesh(mesh: MeshId) -> Self {
        Component::Mesh(MeshComponent { mesh })
    }

    pub fn material(material: Material) -> Self {
        Component::Material(MaterialComponent { material })
    }

    pub fn behaviour(behaviour: impl Behaviour + 'static) -> Self {
        Component::Behaviour(Box::new(behaviour))
    }

    pub fn kind(&self) -> ComponentKind {
        match self {
            Component::Mesh(_) => ComponentKind::Mesh,
            Component::Material(_) => ComponentKind::Material,
            Component::Behaviour(_) => ComponentKind::Behaviour,
        }
    }

    /// Runs the behaviour, if any. Meshes and materials have nothing to do.
    pub fn update(&mut self, transform: &mut Transform, dt: f32) {
        match self {
            Component::Behaviour(behaviour) => behaviour.update(transform, dt),
            Component::Mesh(_) | Component::Material(_) => (),
        }
    }
}

impl Debug for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Component::Mesh(mesh) => f.debug_tuple("Mesh").field(mesh).finish(),
            Component::Material(material) => f
                .debug_tuple("Material")
                .field(&material.material.name)
                .finish(),
            Component::Behaviour(_) => f.write_str("Behaviour(..)"),
        }
    }
}
