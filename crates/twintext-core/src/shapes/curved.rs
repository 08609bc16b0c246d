//! Curved (path-bound) text shape.

use super::{Node, Rotatable, SerializableColor, ShapeId, ShapeTrait, Syncable, Tag, TextStyle};
use crate::error::SyncError;
use kurbo::{Arc, BezPath, Point, Rect, Shape as KurboShape, Vec2};
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, TAU};
use uuid::Uuid;

/// The path-bound text sub-node: glyphs follow an arc derived from `percent`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathText {
    pub style: TextStyle,
    /// Arc-fill ratio in -100..=100: the share of a full circle the text occupies.
    /// Positive values bulge upward, negative values downward, 0 is a straight line.
    pub percent: f64,
}

impl PathText {
    /// Length of the path the glyphs are laid along.
    pub fn path_length(&self) -> f64 {
        let chars = self.style.original_text.chars().filter(|c| *c != '\n').count();
        self.style.run_width(chars)
    }

    /// Build the baseline path, starting at the anchor and running left to right.
    pub fn path(&self) -> BezPath {
        let length = self.path_length();
        let ratio = self.percent.clamp(-100.0, 100.0) / 100.0;
        let mut path = BezPath::new();
        if !ratio.is_finite() || ratio.abs() < 1e-6 || length <= 0.0 {
            path.move_to(Point::ZERO);
            path.line_to(Point::new(length, 0.0));
            return path;
        }

        let sweep = TAU * ratio.abs();
        let radius = length / sweep;
        let chord = 2.0 * radius * (sweep / 2.0).sin();
        let rise = radius * (sweep / 2.0).cos();
        let arc = if ratio > 0.0 {
            Arc {
                center: Point::new(chord / 2.0, rise),
                radii: Vec2::new(radius, radius),
                start_angle: -(FRAC_PI_2 + sweep / 2.0),
                sweep_angle: sweep,
                x_rotation: 0.0,
            }
        } else {
            Arc {
                center: Point::new(chord / 2.0, -rise),
                radii: Vec2::new(radius, radius),
                start_angle: FRAC_PI_2 + sweep / 2.0,
                sweep_angle: -sweep,
                x_rotation: 0.0,
            }
        };
        path.extend(arc.path_elements(0.1));
        path
    }

    /// Rectangle covered by the glyph band in local coordinates.
    ///
    /// Glyphs stand on the path, so the band reaches one font size above it.
    pub fn self_rect(&self) -> Rect {
        let bounds = self.path().bounding_box();
        Rect::new(bounds.x0, bounds.y0 - self.style.font_size, bounds.x1, bounds.y1)
    }
}

/// A curved text shape: a background tag plus a path-bound text sub-node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurvedText {
    pub(crate) id: ShapeId,
    pub node: Node,
    /// Background tag. `None` until the shape finishes initialising.
    pub tag: Option<Tag>,
    /// Path-bound text. `None` until the shape finishes initialising.
    pub text: Option<PathText>,
    /// The straight representation mirroring this shape.
    #[serde(default)]
    pub linked_straight: Option<ShapeId>,
}

impl CurvedText {
    /// Padding between the tag edge and the glyph band.
    pub const PADDING: f64 = 4.0;

    /// Create a fully initialised curved text anchored at `position`.
    pub fn new(position: Point, style: TextStyle, percent: f64) -> Self {
        let mut shape = Self::uninitialized(position);
        shape.init(style, percent, None);
        shape
    }

    /// Create a curved text whose sub-nodes have not been attached yet.
    pub fn uninitialized(position: Point) -> Self {
        Self {
            id: Uuid::new_v4(),
            node: Node::new(position),
            tag: None,
            text: None,
            linked_straight: None,
        }
    }

    /// Attach the sub-nodes of an uninitialised shape.
    ///
    /// A non-finite `percent` lays the text out on a straight line.
    pub fn init(&mut self, style: TextStyle, percent: f64, tag_fill: Option<SerializableColor>) {
        let percent = if percent.is_finite() { percent.clamp(-100.0, 100.0) } else { 0.0 };
        self.tag = Some(Tag::new(tag_fill));
        self.text = Some(PathText { style, percent });
        self.fit_tag();
    }

    pub fn percent(&self) -> Option<f64> {
        self.text.as_ref().map(|t| t.percent)
    }

    /// Change the arc-fill ratio; values outside -100..=100 are clamped.
    pub fn set_percent(&mut self, percent: f64) -> Result<(), SyncError> {
        if !percent.is_finite() {
            return Err(SyncError::InvalidPercent(percent));
        }
        let text = self.text.as_mut().ok_or(SyncError::MissingSubNode(self.id))?;
        text.percent = percent.clamp(-100.0, 100.0);
        self.fit_tag();
        Ok(())
    }

    /// Get the source text.
    pub fn content(&self) -> &str {
        self.text
            .as_ref()
            .map(|t| t.style.original_text.as_str())
            .unwrap_or("")
    }

    /// Replace the source text and refit the tag.
    pub fn set_content(&mut self, content: impl Into<String>) -> Result<(), SyncError> {
        let text = self.text.as_mut().ok_or(SyncError::MissingSubNode(self.id))?;
        text.style.original_text = content.into();
        self.fit_tag();
        Ok(())
    }

    /// SVG path data of the baseline arc.
    pub fn path_data(&self) -> Option<String> {
        self.text.as_ref().map(|t| t.path().to_svg())
    }

    /// Font size in scene pixels (rounded up).
    pub fn font_size_px(&self) -> Option<f64> {
        let text = self.text.as_ref()?;
        Some((text.style.font_size * self.node.absolute_scale().x).ceil())
    }

    /// Refit the tag to the glyph band.
    pub fn fit_tag(&mut self) {
        let Some(text) = self.text.as_ref() else {
            return;
        };
        let rect = text.self_rect().inflate(Self::PADDING, Self::PADDING);
        if let Some(tag) = self.tag.as_mut() {
            tag.rect = rect;
        }
    }
}

impl ShapeTrait for CurvedText {
    fn id(&self) -> ShapeId {
        self.id
    }

    fn node(&self) -> &Node {
        &self.node
    }

    fn node_mut(&mut self) -> &mut Node {
        &mut self.node
    }

    fn local_rect(&self) -> Rect {
        match (&self.tag, &self.text) {
            (Some(tag), _) => tag.rect,
            (None, Some(text)) => text.self_rect(),
            (None, None) => Rect::ZERO,
        }
    }
}

impl Rotatable for CurvedText {}

impl Syncable for CurvedText {
    fn text_style(&self) -> Option<&TextStyle> {
        self.text.as_ref().map(|t| &t.style)
    }

    fn apply_text_style(&mut self, style: &TextStyle) -> Result<(), SyncError> {
        if self.tag.is_none() {
            return Err(SyncError::MissingSubNode(self.id));
        }
        let text = self.text.as_mut().ok_or(SyncError::MissingSubNode(self.id))?;
        text.style = style.clone();
        self.fit_tag();
        Ok(())
    }

    fn tag(&self) -> Option<&Tag> {
        self.tag.as_ref()
    }

    fn set_tag_fill(&mut self, fill: Option<SerializableColor>) -> Result<(), SyncError> {
        let tag = self.tag.as_mut().ok_or(SyncError::MissingSubNode(self.id))?;
        tag.fill = fill;
        Ok(())
    }

    fn link(&self) -> Option<ShapeId> {
        self.linked_straight
    }

    fn set_link(&mut self, partner: Option<ShapeId>) {
        self.linked_straight = partner;
    }
}
