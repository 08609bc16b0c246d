//! Renderer trait abstraction.

use kurbo::Size;
use peniko::Color;
use thiserror::Error;
use twintext_core::canvas::Canvas;
use twintext_core::error::DrawError;
use twintext_core::raster::Bitmap;
use twintext_core::shapes::ShapeId;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Render failed: {0}")]
    RenderFailed(String),
    #[error("Surface error: {0}")]
    Surface(String),
    #[error(transparent)]
    Draw(#[from] DrawError),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// Context for a single render frame.
pub struct RenderContext<'a> {
    /// The canvas to render.
    pub canvas: &'a Canvas,
    /// Viewport size in logical pixels.
    pub viewport_size: Size,
    /// Device pixel ratio (for HiDPI).
    pub scale_factor: f64,
    /// Background color.
    pub background_color: Color,
    /// Shape ID currently being edited inline (skipped, the host draws its editor instead).
    pub editing_shape_id: Option<ShapeId>,
}

impl<'a> RenderContext<'a> {
    /// Create a new render context.
    pub fn new(canvas: &'a Canvas, viewport_size: Size) -> Self {
        Self {
            canvas,
            viewport_size,
            scale_factor: 1.0,
            background_color: Color::from_rgba8(250, 250, 250, 255),
            editing_shape_id: canvas.editing_shape(),
        }
    }

    /// Set the scale factor for HiDPI.
    pub fn with_scale_factor(mut self, scale_factor: f64) -> Self {
        self.scale_factor = scale_factor;
        self
    }

    /// Set the background color.
    pub fn with_background(mut self, color: Color) -> Self {
        self.background_color = color;
        self
    }

    /// Set the shape ID being edited (will be skipped when rendering).
    pub fn with_editing_shape(mut self, shape_id: Option<ShapeId>) -> Self {
        self.editing_shape_id = shape_id;
        self
    }

    /// Surface size in physical pixels.
    pub fn pixel_size(&self) -> (u32, u32) {
        let width = (self.viewport_size.width * self.scale_factor).ceil().max(1.0);
        let height = (self.viewport_size.height * self.scale_factor).ceil().max(1.0);
        (width as u32, height as u32)
    }
}

/// Trait for rendering backends.
pub trait Renderer: Send + Sync {
    /// Paint one frame of the canvas.
    fn render(&mut self, ctx: &RenderContext) -> RenderResult<Bitmap>;

    /// Get the background color (for clearing).
    fn background_color(&self, ctx: &RenderContext) -> Color {
        ctx.background_color
    }
}
