//! deferred-ngin
//!
//! A small deferred-shading renderer. Scene geometry is drawn once into a
//! G-buffer of five floating point targets (position, colour, tangent,
//! bitangent, normal) plus depth, and a full-screen pass then either lights
//! the colour target or shows one of the raw channels.
//!
//! High-level modules
//! - `camera`: camera transform, projection and the WASD/mouse controller
//! - `config`: TOML configuration with defaults for every field
//! - `context`: window, surface and GPU device ownership
//! - `data_structures`: G-buffer, textures, meshes and the scene graph
//! - `flow`: event loop, frame pacing and the per-frame sequence
//! - `input`: keyboard and mouse state with per-frame edge detection
//! - `math`: vector aliases and the column-major [`math::Matrix`]
//! - `pipelines`: shaders and pipeline layouts of both passes
//! - `render`: the geometry pass, the screen pass and frame composition
//! - `resources`: asset loading and the mesh arena
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod flow;
pub mod input;
pub mod logging;
pub mod math;
pub mod pipelines;
pub mod render;
pub mod resources;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath;
pub use wgpu;
pub use winit::event::DeviceEvent;
pub use winit::event::WindowEvent;
pub use winit::keyboard::KeyCode;
