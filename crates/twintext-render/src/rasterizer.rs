//! CPU rasterizer for reflection sources.

use twintext_core::draw::DrawContext;
use twintext_core::error::{RasterError, RasterResult};
use twintext_core::raster::{Bitmap, BoxFuture, Rasterizer, ShapeSnapshot};

use crate::skia::SkiaContext;
use crate::text::paint_text;

/// Paints shape snapshots into bitmaps with tiny-skia.
///
/// Work happens on the calling thread; the returned future is already resolved.
#[derive(Debug, Clone, Copy)]
pub struct SkiaRasterizer {
    pixel_ratio: f64,
}

impl Default for SkiaRasterizer {
    fn default() -> Self {
        Self { pixel_ratio: 1.0 }
    }
}

impl SkiaRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pixels per local unit. Values below a tenth are raised to a tenth.
    pub fn with_pixel_ratio(mut self, ratio: f64) -> Self {
        self.pixel_ratio = ratio.max(0.1);
        self
    }

    pub fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    /// Paint `snapshot` synchronously.
    pub fn rasterize_now(&self, snapshot: &ShapeSnapshot) -> RasterResult<Bitmap> {
        let rect = snapshot.local_rect;
        if rect.width() <= 0.0 || rect.height() <= 0.0 {
            return Err(RasterError::EmptyShape);
        }
        let width = (rect.width() * self.pixel_ratio).ceil() as u32;
        let height = (rect.height() * self.pixel_ratio).ceil() as u32;
        let mut ctx = SkiaContext::new(width, height).map_err(|e| RasterError::Surface(e.to_string()))?;
        ctx.scale(self.pixel_ratio, self.pixel_ratio);
        ctx.translate(-rect.x0, -rect.y0);
        paint_text(&mut ctx, &snapshot.shape);
        log::trace!("Rasterized {} into {width}x{height}", snapshot.shape.id());
        Ok(ctx.into_bitmap())
    }
}

impl Rasterizer for SkiaRasterizer {
    fn rasterize(&self, snapshot: ShapeSnapshot) -> BoxFuture<'static, RasterResult<Bitmap>> {
        let result = self.rasterize_now(&snapshot);
        Box::pin(async move { result })
    }
}
