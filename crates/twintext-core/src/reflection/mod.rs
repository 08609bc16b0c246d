//! Reflection companions: a mirrored, fading raster copy rendered beneath a shape.

mod config;
mod engine;
mod mask;

pub use config::ReflectionConfig;
pub use engine::{PoseKind, ReflectionEngine, ReflectionState};
pub use mask::{paint_reflection, reflection_height};
