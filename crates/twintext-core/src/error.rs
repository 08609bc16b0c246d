//! Error types for the sync engine.

use crate::shapes::ShapeId;
use thiserror::Error;

/// Errors raised while syncing a linked text pair.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SyncError {
    #[error("Shape {0} has no tag or text sub-node attached yet")]
    MissingSubNode(ShapeId),
    #[error("Unknown shape: {0}")]
    UnknownShape(ShapeId),
    #[error("Shape {0} is not part of a linked text pair")]
    NotLinked(ShapeId),
    #[error("Shape {id} is not a {expected} shape")]
    WrongVariant { id: ShapeId, expected: &'static str },
    #[error("Arc percent must be finite, got {0}")]
    InvalidPercent(f64),
}

/// Reflection configuration validation failures.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Opacity must be within [0, 1], got {0}")]
    Opacity(f64),
    #[error("Offset must be a finite value >= 0, got {0}")]
    Offset(f64),
    #[error("Reflect height ratio must be within (0, 1], got {0}")]
    HeightRatio(f64),
}

/// Errors raised by the reflection engine.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ReflectionError {
    #[error("Reflection engine is not attached")]
    Detached,
    #[error("Unknown shape: {0}")]
    UnknownShape(ShapeId),
    #[error("Shape {0} is not an image shape")]
    NotAnImage(ShapeId),
    #[error("Shape {0} already has a reflection attached")]
    AlreadyAttached(ShapeId),
    #[error("Shape {0} cannot be reflected; only text shapes have reflections")]
    UnsupportedSource(ShapeId),
    #[error("Invalid reflection config: {0}")]
    InvalidConfig(#[from] ConfigError),
}

/// Rasterization failures.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RasterError {
    #[error("Shape has an empty self rectangle")]
    EmptyShape,
    #[error("Surface error: {0}")]
    Surface(String),
}

/// Drawing context failures.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DrawError {
    #[error("Image of {width}x{height} does not match its pixel buffer")]
    MalformedImage { width: u32, height: u32 },
    #[error("Draw backend error: {0}")]
    Backend(String),
}

/// Result type for rasterization.
pub type RasterResult<T> = Result<T, RasterError>;
