//! tiny-skia based renderer implementation.

use twintext_core::draw::{ContextGuard, DrawContext};
use twintext_core::raster::Bitmap;
use twintext_core::reflection::{ReflectionConfig, paint_reflection};
use twintext_core::shapes::{Image, Paint, SerializableColor, Shape, ShapeTrait};

use crate::renderer::{RenderContext, RenderResult, Renderer};
use crate::skia::SkiaContext;
use crate::text::paint_text;

/// CPU renderer painting a canvas into a bitmap.
#[derive(Debug, Default)]
pub struct SkiaRenderer {
    frames: u64,
}

impl SkiaRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames rendered so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

fn render_shape(surface: &mut SkiaContext, shape: &Shape) -> RenderResult<()> {
    let mut ctx = ContextGuard::new(surface);
    ctx.transform(shape.node().transform());
    match shape {
        Shape::Image(image) => render_image(&mut ctx, image),
        text => {
            paint_text(&mut *ctx, text);
            Ok(())
        }
    }
}

fn render_image(ctx: &mut SkiaContext, image: &Image) -> RenderResult<()> {
    let Some(bitmap) = image.bitmap() else {
        return Ok(());
    };
    match image.paint() {
        Paint::Bitmap => ctx.draw_image(bitmap, image.local_rect())?,
        Paint::ReflectionMask(config) => {
            let frame = match image.cached_frame() {
                Some(frame) => frame,
                None => {
                    let frame = reflection_frame(image, bitmap, config)?;
                    image.set_cached_frame(frame.clone());
                    frame
                }
            };
            ctx.draw_image(&frame, image.paint_rect())?;
        }
    }
    Ok(())
}

/// Paint the mirrored band of `image` into a bitmap covering its paint rectangle.
fn reflection_frame(image: &Image, bitmap: &Bitmap, config: &ReflectionConfig) -> RenderResult<Bitmap> {
    let rect = image.paint_rect();
    let width = rect.width().ceil().max(1.0) as u32;
    let height = rect.height().ceil().max(1.0) as u32;
    let mut frame = SkiaContext::new(width, height)?;
    // Stretch to the whole-pixel frame so it maps back onto the rect exactly.
    if rect.width() > 0.0 && rect.height() > 0.0 {
        frame.scale(width as f64 / rect.width(), height as f64 / rect.height());
    }
    paint_reflection(&mut frame, bitmap, image.size, config)?;
    Ok(frame.into_bitmap())
}

impl Renderer for SkiaRenderer {
    fn render(&mut self, ctx: &RenderContext) -> RenderResult<Bitmap> {
        let (width, height) = ctx.pixel_size();
        let mut surface = SkiaContext::new(width, height)?;
        surface.clear(SerializableColor::from(self.background_color(ctx)));
        surface.scale(ctx.scale_factor, ctx.scale_factor);

        // Draw all shapes in z-order (skip shape being edited, the host draws its editor)
        for shape in ctx.canvas.document.shapes_ordered() {
            if !shape.is_visible() || ctx.editing_shape_id == Some(shape.id()) {
                continue;
            }
            render_shape(&mut surface, shape)?;
        }

        self.frames += 1;
        Ok(surface.into_bitmap())
    }
}
