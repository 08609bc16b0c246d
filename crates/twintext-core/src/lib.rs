//! TwinText Core Library
//!
//! Platform-agnostic sync engine for linked straight/curved text shapes and
//! their reflection companions.

pub mod canvas;
pub mod draw;
pub mod error;
pub mod events;
pub mod geometry;
pub mod linked;
pub mod raster;
pub mod reflection;
pub mod router;
pub mod shapes;

pub use canvas::{Canvas, CanvasDocument};
pub use draw::{CompositeMode, ContextGuard, DrawContext, FillStyle, GradientStop, LinearGradient};
pub use error::{ConfigError, DrawError, RasterError, RasterResult, ReflectionError, SyncError};
pub use events::{DomainEvent, EventChannel};
pub use geometry::align_centers;
pub use linked::{LinkedTextPair, PairSync, Propagation};
pub use raster::{Bitmap, BoxFuture, PendingRaster, RasterCompletion, Rasterizer, ShapeSnapshot};
pub use reflection::{PoseKind, ReflectionConfig, ReflectionEngine, ReflectionState, paint_reflection};
pub use router::{NodeEvent, TransformEventRouter, TransformHandle};
