//! `DrawContext` backed by a tiny-skia pixmap.

use kurbo::{Affine, Rect};
use tiny_skia::{
    BlendMode, Color, FilterQuality, IntSize, Paint, Pixmap, PixmapPaint, Point, Shader, SpreadMode,
    Transform,
};
use twintext_core::draw::{CompositeMode, DrawContext, FillStyle, LinearGradient};
use twintext_core::error::DrawError;
use twintext_core::raster::Bitmap;
use twintext_core::shapes::SerializableColor;

use crate::renderer::{RenderResult, RendererError};

#[derive(Debug, Clone)]
struct State {
    transform: Affine,
    alpha: f64,
    composite: CompositeMode,
    fill: FillStyle,
}

impl Default for State {
    fn default() -> Self {
        Self {
            transform: Affine::IDENTITY,
            alpha: 1.0,
            composite: CompositeMode::SourceOver,
            fill: FillStyle::default(),
        }
    }
}

/// A CPU drawing surface with canvas-style save/restore state.
pub struct SkiaContext {
    pixmap: Pixmap,
    state: State,
    stack: Vec<State>,
}

impl SkiaContext {
    /// Create a transparent surface of `width` x `height` pixels.
    pub fn new(width: u32, height: u32) -> RenderResult<Self> {
        let pixmap = Pixmap::new(width, height)
            .ok_or_else(|| RendererError::Surface(format!("cannot allocate {width}x{height} surface")))?;
        Ok(Self {
            pixmap,
            state: State::default(),
            stack: Vec::new(),
        })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Fill the whole surface, ignoring transform and composite state.
    pub fn clear(&mut self, color: SerializableColor) {
        self.pixmap.fill(to_color(color, 1.0));
    }

    /// Alpha of the pixel at (x, y).
    pub fn alpha_at(&self, x: u32, y: u32) -> Option<u8> {
        self.pixmap.pixel(x, y).map(|p| p.alpha())
    }

    /// Number of saved states not yet restored.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn current_transform(&self) -> Affine {
        self.state.transform
    }

    /// Take the painted pixels.
    pub fn into_bitmap(self) -> Bitmap {
        let (width, height) = (self.pixmap.width(), self.pixmap.height());
        Bitmap {
            width,
            height,
            data: self.pixmap.take(),
        }
    }

    fn blend_mode(&self) -> BlendMode {
        match self.state.composite {
            CompositeMode::SourceOver => BlendMode::SourceOver,
            CompositeMode::DestinationOut => BlendMode::DestinationOut,
        }
    }

    fn shader(&self) -> Option<Shader<'static>> {
        let alpha = self.state.alpha;
        match &self.state.fill {
            FillStyle::Solid(color) => Some(Shader::SolidColor(to_color(*color, alpha))),
            FillStyle::Gradient(gradient) => linear_shader(gradient, alpha),
        }
    }
}

impl DrawContext for SkiaContext {
    fn save(&mut self) {
        self.stack.push(self.state.clone());
    }

    fn restore(&mut self) {
        if let Some(state) = self.stack.pop() {
            self.state = state;
        }
    }

    fn transform(&mut self, affine: Affine) {
        self.state.transform = self.state.transform * affine;
    }

    fn set_global_alpha(&mut self, alpha: f64) {
        self.state.alpha = alpha.clamp(0.0, 1.0);
    }

    fn set_composite(&mut self, mode: CompositeMode) {
        self.state.composite = mode;
    }

    fn set_fill(&mut self, fill: FillStyle) {
        self.state.fill = fill;
    }

    fn fill_rect(&mut self, rect: Rect) {
        let Some(rect) = to_rect(rect) else {
            return;
        };
        let Some(shader) = self.shader() else {
            log::trace!("Skipping fill with a degenerate gradient");
            return;
        };
        let paint = Paint {
            shader,
            blend_mode: self.blend_mode(),
            anti_alias: true,
            ..Paint::default()
        };
        self.pixmap
            .fill_rect(rect, &paint, to_transform(self.state.transform), None);
    }

    fn draw_image(&mut self, image: &Bitmap, dest: Rect) -> Result<(), DrawError> {
        if image.is_empty() || dest.width() <= 0.0 || dest.height() <= 0.0 {
            return Ok(());
        }
        let malformed = || DrawError::MalformedImage {
            width: image.width,
            height: image.height,
        };
        let size = IntSize::from_wh(image.width, image.height).ok_or_else(malformed)?;
        let source = Pixmap::from_vec(image.data.clone(), size).ok_or_else(malformed)?;

        let placement = Affine::translate(dest.origin().to_vec2())
            * Affine::scale_non_uniform(
                dest.width() / image.width as f64,
                dest.height() / image.height as f64,
            );
        let paint = PixmapPaint {
            opacity: self.state.alpha as f32,
            blend_mode: self.blend_mode(),
            quality: FilterQuality::Bilinear,
        };
        let transform = to_transform(self.state.transform).pre_concat(to_transform(placement));
        self.pixmap
            .draw_pixmap(0, 0, source.as_ref(), &paint, transform, None);
        Ok(())
    }
}

fn to_transform(affine: Affine) -> Transform {
    let [a, b, c, d, e, f] = affine.as_coeffs();
    Transform::from_row(a as f32, b as f32, c as f32, d as f32, e as f32, f as f32)
}

fn to_rect(rect: Rect) -> Option<tiny_skia::Rect> {
    tiny_skia::Rect::from_ltrb(rect.x0 as f32, rect.y0 as f32, rect.x1 as f32, rect.y1 as f32)
}

fn to_color(color: SerializableColor, alpha: f64) -> Color {
    let a = (color.a as f64 * alpha).round().clamp(0.0, 255.0) as u8;
    Color::from_rgba8(color.r, color.g, color.b, a)
}

fn linear_shader(gradient: &LinearGradient, alpha: f64) -> Option<Shader<'static>> {
    let stops = gradient
        .stops
        .iter()
        .map(|stop| tiny_skia::GradientStop::new(stop.offset as f32, to_color(stop.color, alpha)))
        .collect::<Vec<_>>();
    tiny_skia::LinearGradient::new(
        Point::from_xy(gradient.start.x as f32, gradient.start.y as f32),
        Point::from_xy(gradient.end.x as f32, gradient.end.y as f32),
        stops,
        SpreadMode::Pad,
        Transform::identity(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Point as KPoint;

    fn opaque(width: u32, height: u32) -> Bitmap {
        let data = [255u8, 0, 0, 255].repeat((width * height) as usize);
        Bitmap::new(width, height, data).expect("valid buffer")
    }

    #[test]
    fn test_save_restore_state() {
        let mut ctx = SkiaContext::new(10, 10).unwrap();
        ctx.save();
        ctx.translate(5.0, 0.0);
        ctx.set_global_alpha(0.5);
        assert_eq!(ctx.depth(), 1);
        ctx.restore();
        assert_eq!(ctx.current_transform(), Affine::IDENTITY);
        assert_eq!(ctx.depth(), 0);
        // Unbalanced restore is ignored
        ctx.restore();
        assert_eq!(ctx.depth(), 0);
    }

    #[test]
    fn test_fill_rect_respects_transform() {
        let mut ctx = SkiaContext::new(20, 20).unwrap();
        ctx.translate(10.0, 10.0);
        ctx.set_fill(FillStyle::Solid(SerializableColor::black()));
        ctx.fill_rect(Rect::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(ctx.alpha_at(15, 15), Some(255));
        assert_eq!(ctx.alpha_at(5, 5), Some(0));
    }

    #[test]
    fn test_draw_image_scales_into_dest() {
        let mut ctx = SkiaContext::new(20, 20).unwrap();
        ctx.draw_image(&opaque(2, 2), Rect::new(0.0, 0.0, 20.0, 10.0)).unwrap();
        assert_eq!(ctx.alpha_at(10, 5), Some(255));
        assert_eq!(ctx.alpha_at(10, 15), Some(0));
    }

    #[test]
    fn test_draw_image_global_alpha() {
        let mut ctx = SkiaContext::new(4, 4).unwrap();
        ctx.set_global_alpha(0.5);
        ctx.draw_image(&opaque(4, 4), Rect::new(0.0, 0.0, 4.0, 4.0)).unwrap();
        let alpha = ctx.alpha_at(2, 2).unwrap();
        assert!((120..=135).contains(&alpha), "alpha {alpha}");
    }

    #[test]
    fn test_malformed_image_is_rejected() {
        let mut ctx = SkiaContext::new(4, 4).unwrap();
        let bad = Bitmap {
            width: 4,
            height: 4,
            data: vec![0; 3],
        };
        let err = ctx.draw_image(&bad, Rect::new(0.0, 0.0, 4.0, 4.0)).unwrap_err();
        assert_eq!(err, DrawError::MalformedImage { width: 4, height: 4 });
    }

    #[test]
    fn test_destination_out_gradient_erases() {
        let mut ctx = SkiaContext::new(10, 10).unwrap();
        ctx.clear(SerializableColor::black());
        let white = SerializableColor::white();
        let gradient = LinearGradient::new(KPoint::ZERO, KPoint::new(10.0, 0.0))
            .with_stop(0.0, white)
            .with_stop(1.0, white.with_alpha(0.0));
        ctx.set_composite(CompositeMode::DestinationOut);
        ctx.set_fill(FillStyle::Gradient(gradient));
        ctx.fill_rect(Rect::new(0.0, 0.0, 10.0, 10.0));

        let left = ctx.alpha_at(0, 5).unwrap();
        let right = ctx.alpha_at(9, 5).unwrap();
        assert!(left < 30, "left {left}");
        assert!(right > 220, "right {right}");
    }
}
