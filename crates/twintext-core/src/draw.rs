//! Drawing-context abstraction used by paint routines.

use crate::error::DrawError;
use crate::raster::Bitmap;
use crate::shapes::SerializableColor;
use kurbo::{Affine, Point, Rect};
use std::ops::{Deref, DerefMut};

/// How new pixels combine with what is already on the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompositeMode {
    /// Paint over existing pixels.
    #[default]
    SourceOver,
    /// Erase existing pixels by the source alpha.
    DestinationOut,
}

/// A color stop along a gradient, `offset` in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    pub offset: f64,
    pub color: SerializableColor,
}

/// Linear gradient between two points in the current user space.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearGradient {
    pub start: Point,
    pub end: Point,
    pub stops: Vec<GradientStop>,
}

impl LinearGradient {
    pub fn new(start: Point, end: Point) -> Self {
        Self {
            start,
            end,
            stops: Vec::new(),
        }
    }

    /// Add a color stop; stops are kept sorted by offset.
    pub fn with_stop(mut self, offset: f64, color: SerializableColor) -> Self {
        let offset = offset.clamp(0.0, 1.0);
        let index = self.stops.partition_point(|s| s.offset <= offset);
        self.stops.insert(index, GradientStop { offset, color });
        self
    }

    /// Alpha at parameter `t` in [0, 1], interpolated between the surrounding stops.
    pub fn alpha_at(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        let (Some(first), Some(last)) = (self.stops.first(), self.stops.last()) else {
            return 0.0;
        };
        if t <= first.offset {
            return first.color.a as f64 / 255.0;
        }
        if t >= last.offset {
            return last.color.a as f64 / 255.0;
        }
        for pair in self.stops.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if t >= a.offset && t <= b.offset {
                let span = (b.offset - a.offset).max(f64::EPSILON);
                let k = (t - a.offset) / span;
                return (a.color.a as f64 + (b.color.a as f64 - a.color.a as f64) * k) / 255.0;
            }
        }
        last.color.a as f64 / 255.0
    }
}

/// Fill used by `fill_rect`.
#[derive(Debug, Clone, PartialEq)]
pub enum FillStyle {
    Solid(SerializableColor),
    Gradient(LinearGradient),
}

impl Default for FillStyle {
    fn default() -> Self {
        FillStyle::Solid(SerializableColor::black())
    }
}

/// A 2D drawing surface with canvas-style state.
///
/// Transform, global alpha, composite mode and fill style are part of the
/// state saved by `save` and restored by `restore`.
pub trait DrawContext {
    fn save(&mut self);

    fn restore(&mut self);

    /// Post-multiply the current transform by `affine`.
    fn transform(&mut self, affine: Affine);

    fn translate(&mut self, dx: f64, dy: f64) {
        self.transform(Affine::translate((dx, dy)));
    }

    fn scale(&mut self, sx: f64, sy: f64) {
        self.transform(Affine::scale_non_uniform(sx, sy));
    }

    fn set_global_alpha(&mut self, alpha: f64);

    fn set_composite(&mut self, mode: CompositeMode);

    fn set_fill(&mut self, fill: FillStyle);

    /// Fill `rect` with the current fill style.
    fn fill_rect(&mut self, rect: Rect);

    /// Draw `image` stretched into `dest`.
    fn draw_image(&mut self, image: &Bitmap, dest: Rect) -> Result<(), DrawError>;
}

/// Saves the context state on creation and restores it when dropped,
/// so every exit path (including `?`) leaves the context as it was found.
pub struct ContextGuard<'a, C: DrawContext + ?Sized> {
    ctx: &'a mut C,
}

impl<'a, C: DrawContext + ?Sized> ContextGuard<'a, C> {
    pub fn new(ctx: &'a mut C) -> Self {
        ctx.save();
        Self { ctx }
    }
}

impl<C: DrawContext + ?Sized> Deref for ContextGuard<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        self.ctx
    }
}

impl<C: DrawContext + ?Sized> DerefMut for ContextGuard<'_, C> {
    fn deref_mut(&mut self) -> &mut C {
        self.ctx
    }
}

impl<C: DrawContext + ?Sized> Drop for ContextGuard<'_, C> {
    fn drop(&mut self) {
        self.ctx.restore();
    }
}

#[cfg(test)]
pub(crate) mod recording {
    //! A drawing context that records calls instead of drawing.

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Op {
        Save,
        Restore,
        Transform(Affine),
        Alpha(f64),
        Composite(CompositeMode),
        Fill(FillStyle),
        FillRect(Rect),
        DrawImage(Rect),
    }

    #[derive(Debug, Default)]
    pub struct RecordingContext {
        pub ops: Vec<Op>,
        pub fail_images: bool,
        depth: usize,
    }

    impl RecordingContext {
        pub fn failing() -> Self {
            Self {
                fail_images: true,
                ..Self::default()
            }
        }

        /// Number of unmatched `save` calls.
        pub fn depth(&self) -> usize {
            self.depth
        }
    }

    impl DrawContext for RecordingContext {
        fn save(&mut self) {
            self.depth += 1;
            self.ops.push(Op::Save);
        }

        fn restore(&mut self) {
            self.depth = self.depth.saturating_sub(1);
            self.ops.push(Op::Restore);
        }

        fn transform(&mut self, affine: Affine) {
            self.ops.push(Op::Transform(affine));
        }

        fn set_global_alpha(&mut self, alpha: f64) {
            self.ops.push(Op::Alpha(alpha));
        }

        fn set_composite(&mut self, mode: CompositeMode) {
            self.ops.push(Op::Composite(mode));
        }

        fn set_fill(&mut self, fill: FillStyle) {
            self.ops.push(Op::Fill(fill));
        }

        fn fill_rect(&mut self, rect: Rect) {
            self.ops.push(Op::FillRect(rect));
        }

        fn draw_image(&mut self, image: &Bitmap, dest: Rect) -> Result<(), DrawError> {
            if self.fail_images {
                return Err(DrawError::MalformedImage {
                    width: image.width,
                    height: image.height,
                });
            }
            self.ops.push(Op::DrawImage(dest));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::recording::{Op, RecordingContext};
    use super::*;

    #[test]
    fn test_guard_restores_on_drop() {
        let mut ctx = RecordingContext::default();
        {
            let mut guard = ContextGuard::new(&mut ctx);
            guard.translate(1.0, 2.0);
            assert_eq!(guard.depth(), 1);
        }
        assert_eq!(ctx.depth(), 0);
        assert_eq!(ctx.ops.first(), Some(&Op::Save));
        assert_eq!(ctx.ops.last(), Some(&Op::Restore));
    }

    #[test]
    fn test_guard_restores_on_error() {
        fn draw(ctx: &mut RecordingContext) -> Result<(), DrawError> {
            let mut guard = ContextGuard::new(ctx);
            guard.set_global_alpha(0.5);
            guard.draw_image(&Bitmap::transparent(1, 1), Rect::new(0.0, 0.0, 1.0, 1.0))?;
            guard.fill_rect(Rect::new(0.0, 0.0, 1.0, 1.0));
            Ok(())
        }

        let mut ctx = RecordingContext::failing();
        assert!(draw(&mut ctx).is_err());
        assert_eq!(ctx.depth(), 0);
        assert!(!ctx.ops.iter().any(|op| matches!(op, Op::FillRect(_))));
    }

    #[test]
    fn test_gradient_stops_sorted() {
        let gradient = LinearGradient::new(Point::ZERO, Point::new(0.0, 10.0))
            .with_stop(1.0, SerializableColor::transparent())
            .with_stop(0.0, SerializableColor::white());
        assert!((gradient.stops[0].offset).abs() < f64::EPSILON);
        assert!((gradient.alpha_at(0.0) - 1.0).abs() < f64::EPSILON);
        assert!((gradient.alpha_at(0.5) - 0.5).abs() < 0.01);
        assert!(gradient.alpha_at(1.0).abs() < f64::EPSILON);
    }
}
