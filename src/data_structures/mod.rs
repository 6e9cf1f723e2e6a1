//! Engine data structures: scene graph, components, G-buffer, meshes and textures.
//!
//! This module contains the core data types for scene representation:
//!
//! - `scene_graph` holds entities, their transforms and the hierarchy between them
//! - `component` contains the components entities carry (mesh, material, behaviour)
//! - `gbuffer` owns the attachments the geometry pass renders into
//! - `model` contains vertex formats, meshes and materials
//! - `texture` contains GPU texture wrapper and creation utilities

pub mod component;
pub mod gbuffer;
pub mod model;
pub mod scene_graph;
pub mod texture;
