//! Error types of the core.
//!
//! Startup failures ([`SetupError`], [`RenderError::IncompleteFramebuffer`])
//! abort initialisation. Everything else is reported per frame and the frame
//! loop keeps running.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    /// The draw was requested without one of its required inputs.
    #[error("missing render parameter: {0}")]
    MissingParameter(&'static str),
    #[error("G-buffer is incomplete: {0}")]
    IncompleteFramebuffer(String),
    #[error("G-buffer attachments have been destroyed")]
    Destroyed,
    #[error("geometry pass has room for {capacity} draws, all of them are used")]
    DrawCapacityExceeded { capacity: usize },
    #[error("entity is not part of the scene")]
    UnknownEntity,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SceneError {
    #[error("entity is not part of the scene")]
    UnknownEntity,
    #[error("an entity cannot be its own parent")]
    SelfParent,
    #[error("adding this child would create a cycle")]
    Cycle,
}

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("no suitable graphics adapter found")]
    NoAdapter,
    #[error("failed to request a graphics device: {0}")]
    Device(String),
    #[error("failed to create the window surface: {0}")]
    Surface(String),
    #[error("adapter supports {supported} bytes per sample across colour attachments, the G-buffer needs {required}")]
    UnsupportedLimits { required: u32, supported: u32 },
}
