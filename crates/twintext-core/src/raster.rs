//! Asynchronous rasterization seam.
//!
//! The host supplies a [`Rasterizer`]; the reflection engine hands it a snapshot
//! of the source shape and receives a future resolving to a [`Bitmap`]. Requests
//! carry a sequence number so only the latest one is applied.

use crate::error::RasterResult;
use crate::shapes::{Shape, ShapeId};
use kurbo::Rect;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

/// Boxed future for async operations (compatible with WASM).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Premultiplied RGBA8 pixels, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Bitmap {
    /// Wrap a pixel buffer; returns `None` if its length does not match the dimensions.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        (data.len() == width as usize * height as usize * 4).then_some(Self {
            width,
            height,
            data,
        })
    }

    /// A fully transparent bitmap.
    pub fn transparent(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * 4],
        }
    }

    /// Alpha of the pixel at (x, y), or `None` outside the bitmap.
    pub fn alpha_at(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let index = (y as usize * self.width as usize + x as usize) * 4 + 3;
        self.data.get(index).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// A frozen copy of a shape taken at request time, with rotation zeroed.
#[derive(Debug, Clone)]
pub struct ShapeSnapshot {
    pub shape: Shape,
    /// Local rectangle the bitmap must cover, one pixel per local unit.
    pub local_rect: Rect,
}

impl ShapeSnapshot {
    pub fn capture(shape: &Shape) -> Self {
        Self {
            shape: shape.clone(),
            local_rect: shape.local_rect(),
        }
    }
}

/// Host rasterization backend.
pub trait Rasterizer {
    /// Start rasterizing `snapshot`. The returned future may resolve at any later point.
    fn rasterize(&self, snapshot: ShapeSnapshot) -> BoxFuture<'static, RasterResult<Bitmap>>;
}

/// An in-flight rasterization request.
pub struct PendingRaster {
    pub source: ShapeId,
    pub seq: u64,
    future: BoxFuture<'static, RasterResult<Bitmap>>,
}

impl PendingRaster {
    pub fn new(source: ShapeId, seq: u64, future: BoxFuture<'static, RasterResult<Bitmap>>) -> Self {
        Self { source, seq, future }
    }

    /// Wait for the rasterizer to finish.
    pub async fn wait(self) -> RasterCompletion {
        RasterCompletion {
            source: self.source,
            seq: self.seq,
            result: self.future.await,
        }
    }

    /// Block the current thread until the rasterizer finishes.
    pub fn block_on(self) -> RasterCompletion {
        pollster::block_on(self.wait())
    }
}

impl fmt::Debug for PendingRaster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingRaster")
            .field("source", &self.source)
            .field("seq", &self.seq)
            .finish_non_exhaustive()
    }
}

/// A resolved rasterization, ready to be applied by the engine that requested it.
#[derive(Debug, Clone)]
pub struct RasterCompletion {
    pub source: ShapeId,
    pub seq: u64,
    pub result: RasterResult<Bitmap>,
}
