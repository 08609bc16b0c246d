//! Text shape painting.
//!
//! Glyphs are drawn as solid cells sized from the style metrics. Both
//! representations share the same cell geometry so a linked pair looks alike
//! when toggled.

use kurbo::{BezPath, ParamCurve, ParamCurveArclen, Point, Rect};
use twintext_core::draw::{DrawContext, FillStyle};
use twintext_core::shapes::{CurvedText, Shape, StraightText, Tag, TextStyle};

const ARCLEN_ACCURACY: f64 = 0.1;
/// Share of the advance a glyph cell covers.
const CELL_WIDTH: f64 = 0.7;
/// Cell height as a share of the font size.
const CELL_HEIGHT: f64 = 0.7;

/// Paint a text shape in its local coordinate space. Images are ignored.
pub fn paint_text<C: DrawContext + ?Sized>(ctx: &mut C, shape: &Shape) {
    match shape {
        Shape::StraightText(text) => paint_straight(ctx, text),
        Shape::CurvedText(text) => paint_curved(ctx, text),
        Shape::Image(_) => {}
    }
}

fn paint_tag<C: DrawContext + ?Sized>(ctx: &mut C, tag: Option<&Tag>) {
    if let Some(Tag { rect, fill: Some(fill), .. }) = tag {
        ctx.set_fill(FillStyle::Solid(*fill));
        ctx.fill_rect(*rect);
    }
}

fn glyph_cell(style: &TextStyle, baseline: Point) -> Rect {
    let width = style.run_width(1) * CELL_WIDTH;
    let height = style.font_size * CELL_HEIGHT;
    Rect::new(
        baseline.x - width / 2.0,
        baseline.y - height,
        baseline.x + width / 2.0,
        baseline.y,
    )
}

fn paint_straight<C: DrawContext + ?Sized>(ctx: &mut C, shape: &StraightText) {
    paint_tag(ctx, shape.tag.as_ref());
    let Some(label) = shape.text.as_ref() else {
        return;
    };
    let style = &label.style;
    let advance = style.run_width(1);
    let line_height = style.font_size * StraightText::LINE_HEIGHT;

    ctx.set_fill(FillStyle::Solid(style.fill));
    for (row, line) in shape.lines().iter().enumerate() {
        let baseline = StraightText::PADDING + row as f64 * line_height + style.font_size;
        for (column, ch) in line.chars().enumerate() {
            if ch.is_whitespace() {
                continue;
            }
            let x = StraightText::PADDING + (column as f64 + 0.5) * advance;
            ctx.fill_rect(glyph_cell(style, Point::new(x, baseline)));
        }
    }
}

fn paint_curved<C: DrawContext + ?Sized>(ctx: &mut C, shape: &CurvedText) {
    paint_tag(ctx, shape.tag.as_ref());
    let Some(text) = shape.text.as_ref() else {
        return;
    };
    let style = &text.style;
    let glyphs: Vec<char> = style.original_text.chars().filter(|c| *c != '\n').collect();
    let anchors = points_along(&text.path(), style.run_width(1), glyphs.len());

    ctx.set_fill(FillStyle::Solid(style.fill));
    for (ch, anchor) in glyphs.iter().zip(anchors) {
        if !ch.is_whitespace() {
            ctx.fill_rect(glyph_cell(style, anchor));
        }
    }
}

/// Points at the middle of `count` consecutive runs of `spacing` along `path`.
fn points_along(path: &BezPath, spacing: f64, count: usize) -> Vec<Point> {
    let mut points = Vec::with_capacity(count);
    if spacing <= 0.0 {
        return points;
    }
    let mut segments = path.segments().peekable();
    let mut walked = 0.0;
    for index in 0..count {
        let target = (index as f64 + 0.5) * spacing;
        while let Some(segment) = segments.peek() {
            let length = segment.arclen(ARCLEN_ACCURACY);
            if length > 0.0 && walked + length >= target {
                let t = segment.inv_arclen(target - walked, ARCLEN_ACCURACY);
                points.push(segment.eval(t));
                break;
            }
            walked += length;
            segments.next();
        }
    }
    points
}
