//! Paint routine for a reflected image: a mirrored copy of the source bitmap
//! beneath the source footprint, fading out with distance.

use super::ReflectionConfig;
use crate::draw::{CompositeMode, ContextGuard, DrawContext, FillStyle, LinearGradient};
use crate::error::DrawError;
use crate::raster::Bitmap;
use crate::shapes::SerializableColor;
use kurbo::{Point, Rect, Size};

/// Height of the mirrored band for a source of `source_height`.
pub fn reflection_height(source_height: f64, config: &ReflectionConfig) -> f64 {
    source_height * config.reflect_height_ratio
}

/// Paint `bitmap` mirrored below a footprint of `size`, in the context's local space.
///
/// The context state touched here is restored before returning, also when the
/// image draw fails.
pub fn paint_reflection<C: DrawContext + ?Sized>(
    ctx: &mut C,
    bitmap: &Bitmap,
    size: Size,
    config: &ReflectionConfig,
) -> Result<(), DrawError> {
    let band = reflection_height(size.height, config);
    if band <= 0.0 || size.width <= 0.0 {
        return Ok(());
    }
    let mut ctx = ContextGuard::new(ctx);

    ctx.translate(0.0, size.height + band + config.offset_px);
    ctx.scale(1.0, -1.0);

    let dest = Rect::new(0.0, 0.0, size.width, band);
    ctx.set_global_alpha(config.opacity);
    ctx.draw_image(bitmap, dest)?;
    ctx.set_global_alpha(1.0);

    // In flipped space y = 0 is the far edge, so erasing fully there and not at
    // all at y = band leaves the band opaque next to the source.
    let white = SerializableColor::white();
    let gradient = LinearGradient::new(Point::ZERO, Point::new(0.0, band))
        .with_stop(0.0, white)
        .with_stop(1.0, white.with_alpha(0.0));
    ctx.set_composite(CompositeMode::DestinationOut);
    ctx.set_fill(FillStyle::Gradient(gradient));
    ctx.fill_rect(dest);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::recording::{Op, RecordingContext};
    use kurbo::Affine;

    fn config() -> ReflectionConfig {
        ReflectionConfig::enabled()
            .with_opacity(0.5)
            .with_offset(1.0)
            .with_height_ratio(0.6)
    }

    #[test]
    fn test_op_sequence() {
        let mut ctx = RecordingContext::default();
        paint_reflection(&mut ctx, &Bitmap::transparent(200, 50), Size::new(200.0, 50.0), &config())
            .unwrap();

        let band = 30.0;
        assert_eq!(ctx.ops[0], Op::Save);
        assert_eq!(ctx.ops[1], Op::Transform(Affine::translate((0.0, 50.0 + band + 1.0))));
        assert_eq!(ctx.ops[2], Op::Transform(Affine::scale_non_uniform(1.0, -1.0)));
        assert_eq!(ctx.ops[3], Op::Alpha(0.5));
        assert_eq!(ctx.ops[4], Op::DrawImage(Rect::new(0.0, 0.0, 200.0, band)));
        assert_eq!(ctx.ops[5], Op::Alpha(1.0));
        assert_eq!(ctx.ops[6], Op::Composite(CompositeMode::DestinationOut));
        assert!(matches!(ctx.ops[7], Op::Fill(FillStyle::Gradient(_))));
        assert_eq!(ctx.ops[8], Op::FillRect(Rect::new(0.0, 0.0, 200.0, band)));
        assert_eq!(ctx.ops[9], Op::Restore);
        assert_eq!(ctx.depth(), 0);
    }

    #[test]
    fn test_erase_gradient_fades_toward_far_edge() {
        let mut ctx = RecordingContext::default();
        paint_reflection(&mut ctx, &Bitmap::transparent(10, 10), Size::new(10.0, 10.0), &config())
            .unwrap();
        let Some(Op::Fill(FillStyle::Gradient(gradient))) =
            ctx.ops.iter().find(|op| matches!(op, Op::Fill(_)))
        else {
            panic!("no gradient fill");
        };
        // Erase strength is full at flipped y = 0 (far edge) and zero at the source edge.
        assert!((gradient.alpha_at(0.0) - 1.0).abs() < f64::EPSILON);
        assert!(gradient.alpha_at(1.0).abs() < f64::EPSILON);
        let samples: Vec<f64> = (0..=10).map(|i| 1.0 - gradient.alpha_at(i as f64 / 10.0)).collect();
        assert!(samples.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_state_restored_when_image_fails() {
        let mut ctx = RecordingContext::failing();
        let result =
            paint_reflection(&mut ctx, &Bitmap::transparent(1, 1), Size::new(10.0, 10.0), &config());
        assert!(result.is_err());
        assert_eq!(ctx.depth(), 0);
        assert_eq!(ctx.ops.last(), Some(&Op::Restore));
        assert!(!ctx.ops.iter().any(|op| matches!(op, Op::FillRect(_))));
    }

    #[test]
    fn test_empty_footprint_draws_nothing() {
        let mut ctx = RecordingContext::default();
        paint_reflection(&mut ctx, &Bitmap::transparent(1, 1), Size::new(0.0, 10.0), &config())
            .unwrap();
        assert!(ctx.ops.is_empty());
    }
}
