//! Shape definitions for the editor.

mod curved;
mod image;
mod node;
mod straight;
mod style;

pub use curved::{CurvedText, PathText};
pub use image::{Image, Paint};
pub use node::{Attributes, Node, Pose};
pub use straight::{LabelText, StraightText};
pub use style::{FontStyle, TextStyle};

use crate::error::SyncError;
use crate::geometry;
use kurbo::Rect;
use peniko::Color;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }

    pub fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Same color with alpha replaced by `alpha` in [0, 1].
    pub fn with_alpha(self, alpha: f64) -> Self {
        Self {
            a: (alpha.clamp(0.0, 1.0) * 255.0).round() as u8,
            ..self
        }
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// Unique identifier for shapes.
pub type ShapeId = Uuid;

/// Background tag drawn behind a text sub-node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    /// Rectangle in the owning shape's local coordinates.
    pub rect: Rect,
    pub fill: Option<SerializableColor>,
    #[serde(default)]
    pub corner_radius: f64,
}

impl Tag {
    pub fn new(fill: Option<SerializableColor>) -> Self {
        Self {
            rect: Rect::ZERO,
            fill,
            corner_radius: 0.0,
        }
    }
}

/// Common trait for all shapes.
pub trait ShapeTrait {
    /// Get the unique identifier.
    fn id(&self) -> ShapeId;

    fn node(&self) -> &Node;

    fn node_mut(&mut self) -> &mut Node;

    /// Self rectangle in local coordinates, relative to the node anchor and before
    /// scale and rotation are applied.
    fn local_rect(&self) -> Rect;

    /// Axis-aligned bounding box in scene coordinates after all transforms.
    fn client_rect(&self) -> Rect {
        geometry::transformed_bounds(self.local_rect(), self.node().transform())
    }
}

/// Shapes that rotate around their visual center.
pub trait Rotatable: ShapeTrait {
    fn rotate_about_center(&mut self, degrees: f64) {
        let local = self.local_rect();
        geometry::rotate_about_center(self.node_mut(), local, degrees);
    }
}

/// Shapes that can take part in a linked text pair.
pub trait Syncable: ShapeTrait {
    /// Style of the text sub-node, if attached.
    fn text_style(&self) -> Option<&TextStyle>;

    /// Overwrite the text sub-node's style and re-run layout.
    fn apply_text_style(&mut self, style: &TextStyle) -> Result<(), SyncError>;

    /// The background tag, if attached.
    fn tag(&self) -> Option<&Tag>;

    fn set_tag_fill(&mut self, fill: Option<SerializableColor>) -> Result<(), SyncError>;

    /// The linked counterpart, if any.
    fn link(&self) -> Option<ShapeId>;

    fn set_link(&mut self, partner: Option<ShapeId>);

    /// Whether both sub-nodes are attached.
    fn is_initialized(&self) -> bool {
        self.text_style().is_some() && self.tag().is_some()
    }
}

/// Shape variant tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    StraightText,
    CurvedText,
    Image,
}

impl ShapeKind {
    pub fn name(&self) -> &'static str {
        match self {
            ShapeKind::StraightText => "straight text",
            ShapeKind::CurvedText => "curved text",
            ShapeKind::Image => "image",
        }
    }
}

/// Enum wrapper for all shape types (for serialization).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Shape {
    StraightText(StraightText),
    CurvedText(CurvedText),
    Image(Image),
}

impl Shape {
    pub fn id(&self) -> ShapeId {
        match self {
            Shape::StraightText(s) => s.id(),
            Shape::CurvedText(s) => s.id(),
            Shape::Image(s) => s.id(),
        }
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::StraightText(_) => ShapeKind::StraightText,
            Shape::CurvedText(_) => ShapeKind::CurvedText,
            Shape::Image(_) => ShapeKind::Image,
        }
    }

    pub fn node(&self) -> &Node {
        match self {
            Shape::StraightText(s) => s.node(),
            Shape::CurvedText(s) => s.node(),
            Shape::Image(s) => s.node(),
        }
    }

    pub fn node_mut(&mut self) -> &mut Node {
        match self {
            Shape::StraightText(s) => s.node_mut(),
            Shape::CurvedText(s) => s.node_mut(),
            Shape::Image(s) => s.node_mut(),
        }
    }

    pub fn local_rect(&self) -> Rect {
        match self {
            Shape::StraightText(s) => s.local_rect(),
            Shape::CurvedText(s) => s.local_rect(),
            Shape::Image(s) => s.local_rect(),
        }
    }

    pub fn client_rect(&self) -> Rect {
        match self {
            Shape::StraightText(s) => s.client_rect(),
            Shape::CurvedText(s) => s.client_rect(),
            Shape::Image(s) => s.client_rect(),
        }
    }

    pub fn is_visible(&self) -> bool {
        self.node().visible
    }

    /// Get the text capabilities if this shape is a text variant.
    pub fn as_syncable(&self) -> Option<&dyn Syncable> {
        match self {
            Shape::StraightText(s) => Some(s),
            Shape::CurvedText(s) => Some(s),
            Shape::Image(_) => None,
        }
    }

    pub fn as_syncable_mut(&mut self) -> Option<&mut dyn Syncable> {
        match self {
            Shape::StraightText(s) => Some(s),
            Shape::CurvedText(s) => Some(s),
            Shape::Image(_) => None,
        }
    }

    /// Get the rotation capability. Images follow their source and never rotate on their own.
    pub fn as_rotatable_mut(&mut self) -> Option<&mut dyn Rotatable> {
        match self {
            Shape::StraightText(s) => Some(s),
            Shape::CurvedText(s) => Some(s),
            Shape::Image(_) => None,
        }
    }

    pub fn as_straight(&self) -> Option<&StraightText> {
        match self {
            Shape::StraightText(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_straight_mut(&mut self) -> Option<&mut StraightText> {
        match self {
            Shape::StraightText(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_curved(&self) -> Option<&CurvedText> {
        match self {
            Shape::CurvedText(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_curved_mut(&mut self) -> Option<&mut CurvedText> {
        match self {
            Shape::CurvedText(s) => Some(s),
            _ => None,
        }
    }

    /// Check if this shape is an image.
    pub fn is_image(&self) -> bool {
        matches!(self, Shape::Image(_))
    }

    pub fn as_image(&self) -> Option<&Image> {
        match self {
            Shape::Image(img) => Some(img),
            _ => None,
        }
    }

    pub fn as_image_mut(&mut self) -> Option<&mut Image> {
        match self {
            Shape::Image(img) => Some(img),
            _ => None,
        }
    }
}

impl From<StraightText> for Shape {
    fn from(shape: StraightText) -> Self {
        Shape::StraightText(shape)
    }
}

impl From<CurvedText> for Shape {
    fn from(shape: CurvedText) -> Self {
        Shape::CurvedText(shape)
    }
}

impl From<Image> for Shape {
    fn from(shape: Image) -> Self {
        Shape::Image(shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Point;

    #[test]
    fn test_color_with_alpha() {
        let c = SerializableColor::white().with_alpha(0.5);
        assert_eq!(c.a, 128);
        assert_eq!(SerializableColor::white().with_alpha(2.0).a, 255);
    }

    #[test]
    fn test_capabilities_by_variant() {
        let mut text: Shape = StraightText::new(Point::ZERO, TextStyle::new("Hi")).into();
        let mut image: Shape = Image::new(Point::ZERO, kurbo::Size::new(10.0, 10.0)).into();

        assert_eq!(text.kind(), ShapeKind::StraightText);
        assert!(text.as_syncable().is_some());
        assert!(text.as_rotatable_mut().is_some());
        assert!(image.as_syncable().is_none());
        assert!(image.as_rotatable_mut().is_none());
        assert!(image.is_image());
    }
}
