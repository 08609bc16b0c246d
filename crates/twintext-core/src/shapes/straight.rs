//! Straight (inline rich-text label) shape.

use super::{
    Node, Rotatable, SerializableColor, ShapeId, ShapeTrait, Syncable, Tag, TextStyle,
};
use crate::error::SyncError;
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The text sub-node of a straight label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelText {
    pub style: TextStyle,
    /// Wrap width in local units; `None` lays each source line out unwrapped.
    #[serde(default)]
    pub wrap_width: Option<f64>,
}

/// A straight text label: a background tag plus a text sub-node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StraightText {
    pub(crate) id: ShapeId,
    pub node: Node,
    /// Background tag. `None` until the shape finishes initialising.
    pub tag: Option<Tag>,
    /// Text sub-node. `None` until the shape finishes initialising.
    pub text: Option<LabelText>,
    /// Re-wrap instead of stretching when resized from a side handle.
    #[serde(default = "default_keep_scale")]
    pub keep_scale_on_resize: bool,
    /// The curved representation mirroring this label.
    #[serde(default)]
    pub linked_curved: Option<ShapeId>,
}

fn default_keep_scale() -> bool {
    true
}

impl StraightText {
    /// Line height as a multiple of the font size.
    pub const LINE_HEIGHT: f64 = 1.2;
    /// Padding between the tag edge and the text.
    pub const PADDING: f64 = 4.0;
    /// Smallest wrap width a side resize can produce.
    pub const MIN_WRAP_WIDTH: f64 = 30.0;

    /// Create a fully initialised label anchored at `position`.
    pub fn new(position: Point, style: TextStyle) -> Self {
        let mut label = Self::uninitialized(position);
        label.tag = Some(Tag::new(None));
        label.text = Some(LabelText {
            style,
            wrap_width: None,
        });
        label.layout();
        label
    }

    /// Create a label whose sub-nodes have not been attached yet.
    pub fn uninitialized(position: Point) -> Self {
        Self {
            id: Uuid::new_v4(),
            node: Node::new(position),
            tag: None,
            text: None,
            keep_scale_on_resize: true,
            linked_curved: None,
        }
    }

    /// Attach the sub-nodes of an uninitialised label.
    pub fn init(&mut self, style: TextStyle, tag_fill: Option<SerializableColor>) {
        self.tag = Some(Tag::new(tag_fill));
        self.text = Some(LabelText {
            style,
            wrap_width: None,
        });
        self.layout();
    }

    /// Set the tag background color.
    pub fn with_tag_fill(mut self, fill: SerializableColor) -> Self {
        if let Some(tag) = self.tag.as_mut() {
            tag.fill = Some(fill);
        }
        self
    }

    /// Get the source text.
    pub fn content(&self) -> &str {
        self.text
            .as_ref()
            .map(|t| t.style.original_text.as_str())
            .unwrap_or("")
    }

    /// Replace the source text.
    pub fn set_content(&mut self, content: impl Into<String>) -> Result<(), SyncError> {
        let text = self.text.as_mut().ok_or(SyncError::MissingSubNode(self.id))?;
        text.style.original_text = content.into();
        self.layout();
        Ok(())
    }

    /// Font size in scene pixels (rounded up).
    pub fn font_size_px(&self) -> Option<f64> {
        let text = self.text.as_ref()?;
        Some((text.style.font_size * self.node.absolute_scale().x).ceil())
    }

    /// Set the font size so that it renders at `px` scene pixels.
    pub fn set_font_size_px(&mut self, px: f64) -> Result<(), SyncError> {
        let scale_x = self.node.absolute_scale().x;
        let text = self.text.as_mut().ok_or(SyncError::MissingSubNode(self.id))?;
        text.style.font_size = (px / scale_x).ceil();
        self.layout();
        Ok(())
    }

    /// Re-wrap after a side-handle resize so glyphs keep their aspect ratio.
    ///
    /// The stretched width becomes the new wrap width and the horizontal scale
    /// falls back to the vertical one. Returns false when the label does not keep
    /// its scale or is not initialised.
    pub fn apply_side_resize(&mut self) -> bool {
        if !self.keep_scale_on_resize {
            return false;
        }
        let text_width = self.local_rect().width() - 2.0 * Self::PADDING;
        let Some(text) = self.text.as_mut() else {
            return false;
        };
        text.wrap_width = Some((text_width * self.node.scale.x).max(Self::MIN_WRAP_WIDTH));
        self.node.scale.x = self.node.scale.y;
        self.layout();
        true
    }

    /// Lines as laid out, honouring explicit newlines and the wrap width.
    pub fn lines(&self) -> Vec<String> {
        let Some(text) = self.text.as_ref() else {
            return Vec::new();
        };
        let style = &text.style;
        let mut lines = Vec::new();
        for source_line in style.original_text.split('\n') {
            let Some(wrap) = text.wrap_width else {
                lines.push(source_line.to_string());
                continue;
            };
            let mut current = String::new();
            for word in source_line.split(' ') {
                let candidate = if current.is_empty() {
                    word.to_string()
                } else {
                    format!("{current} {word}")
                };
                if !current.is_empty() && style.run_width(candidate.chars().count()) > wrap {
                    lines.push(std::mem::take(&mut current));
                    current = word.to_string();
                } else {
                    current = candidate;
                }
            }
            lines.push(current);
        }
        lines
    }

    /// Approximate size of the laid-out text block.
    fn text_size(&self) -> (f64, f64) {
        let Some(text) = self.text.as_ref() else {
            return (0.0, 0.0);
        };
        let lines = self.lines();
        let widest = lines
            .iter()
            .map(|line| text.style.run_width(line.chars().count()))
            .fold(0.0, f64::max);
        let width = text.wrap_width.unwrap_or(widest);
        let height = lines.len().max(1) as f64 * text.style.font_size * Self::LINE_HEIGHT;
        (width, height)
    }

    /// Fit the tag around the text block.
    pub fn layout(&mut self) {
        let (width, height) = self.text_size();
        if let Some(tag) = self.tag.as_mut() {
            tag.rect = Rect::new(0.0, 0.0, width + 2.0 * Self::PADDING, height + 2.0 * Self::PADDING);
        }
    }
}

impl ShapeTrait for StraightText {
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
            (None, Some(_)) => {
                let (width, height) = self.text_size();
                Rect::new(0.0, 0.0, width, height)
            }
            (None, None) => Rect::ZERO,
        }
    }
}

impl Rotatable for StraightText {}

impl Syncable for StraightText {
    fn text_style(&self) -> Option<&TextStyle> {
        self.text.as_ref().map(|t| &t.style)
    }

    fn apply_text_style(&mut self, style: &TextStyle) -> Result<(), SyncError> {
        if self.tag.is_none() {
            return Err(SyncError::MissingSubNode(self.id));
        }
        let text = self.text.as_mut().ok_or(SyncError::MissingSubNode(self.id))?;
        text.style = style.clone();
        self.layout();
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
        self.linked_curved
    }

    fn set_link(&mut self, partner: Option<ShapeId>) {
        self.linked_curved = partner;
    }
}
