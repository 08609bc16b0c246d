//! Linked straight/curved text pairs.
//!
//! The two members reference each other by ID; neither owns the other. One
//! member is visible (active) and the other is a hidden mirror. Propagation
//! always writes to the hidden member and never to a visible one, so a write
//! can never bounce back.

use crate::canvas::CanvasDocument;
use crate::error::SyncError;
use crate::geometry;
use crate::shapes::{Shape, ShapeId, ShapeKind, ShapeTrait, Syncable};

/// Outcome of a single propagation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    Applied,
    /// The target is visible; writing to it could start a cycle.
    SkippedTargetVisible,
    /// A member has no tag or text sub-node yet.
    SkippedMissingSubNode,
}

impl Propagation {
    pub fn applied(self) -> bool {
        self == Propagation::Applied
    }
}

/// Result of a full sync pass: style first, then pose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairSync {
    pub style: Propagation,
    pub pose: Propagation,
}

/// A straight text and a curved text showing the same logical text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkedTextPair {
    pub straight: ShapeId,
    pub curved: ShapeId,
}

impl LinkedTextPair {
    /// Link `straight` and `curved`, leaving exactly one of them visible.
    ///
    /// The straight member stays visible when both are shown or both hidden.
    pub fn link(doc: &mut CanvasDocument, straight: ShapeId, curved: ShapeId) -> Result<Self, SyncError> {
        expect_kind(doc, straight, ShapeKind::StraightText)?;
        expect_kind(doc, curved, ShapeKind::CurvedText)?;
        let pair = Self { straight, curved };

        for (id, partner) in [(straight, curved), (curved, straight)] {
            if let Some(text) = doc.get_shape_mut(id).and_then(Shape::as_syncable_mut) {
                text.set_link(Some(partner));
            }
        }

        let straight_visible = is_visible(doc, straight)?;
        let curved_visible = is_visible(doc, curved)?;
        if straight_visible == curved_visible {
            set_visible(doc, straight, true)?;
            set_visible(doc, curved, false)?;
        }
        log::debug!("Linked straight {} with curved {}", straight, curved);
        Ok(pair)
    }

    /// Find the pair `id` belongs to. Both members must point at each other.
    pub fn of(doc: &CanvasDocument, id: ShapeId) -> Option<Self> {
        let shape = doc.get_shape(id)?;
        let partner = shape.as_syncable()?.link()?;
        let back = doc.get_shape(partner)?.as_syncable()?.link()?;
        if back != id {
            return None;
        }
        match shape.kind() {
            ShapeKind::StraightText => Some(Self {
                straight: id,
                curved: partner,
            }),
            ShapeKind::CurvedText => Some(Self {
                straight: partner,
                curved: id,
            }),
            ShapeKind::Image => None,
        }
    }

    /// Clear the back-references on both members.
    pub fn unlink(self, doc: &mut CanvasDocument) {
        for id in [self.straight, self.curved] {
            if let Some(text) = doc.get_shape_mut(id).and_then(Shape::as_syncable_mut) {
                text.set_link(None);
            }
        }
    }

    /// The other member of the pair.
    pub fn partner(&self, id: ShapeId) -> Option<ShapeId> {
        if id == self.straight {
            Some(self.curved)
        } else if id == self.curved {
            Some(self.straight)
        } else {
            None
        }
    }

    pub fn contains(&self, id: ShapeId) -> bool {
        self.partner(id).is_some()
    }

    /// The visible member, if exactly one member is visible.
    pub fn active(&self, doc: &CanvasDocument) -> Option<ShapeId> {
        let straight = doc.get_shape(self.straight)?.is_visible();
        let curved = doc.get_shape(self.curved)?.is_visible();
        match (straight, curved) {
            (true, false) => Some(self.straight),
            (false, true) => Some(self.curved),
            _ => None,
        }
    }

    /// The hidden mirror, if exactly one member is visible.
    pub fn hidden(&self, doc: &CanvasDocument) -> Option<ShapeId> {
        self.active(doc).and_then(|id| self.partner(id))
    }

    /// Swap which member is visible. Returns the newly active member.
    ///
    /// The hidden member was kept in sync, so nothing is propagated here.
    pub fn toggle(&self, doc: &mut CanvasDocument) -> Result<ShapeId, SyncError> {
        let active = self.active(doc).ok_or(SyncError::NotLinked(self.straight))?;
        let next = self.partner(active).ok_or(SyncError::NotLinked(active))?;
        set_visible(doc, next, true)?;
        set_visible(doc, active, false)?;
        Ok(next)
    }

    /// Copy the text style from `from` onto its hidden partner.
    pub fn propagate_style(&self, doc: &mut CanvasDocument, from: ShapeId) -> Result<Propagation, SyncError> {
        let to = self.partner(from).ok_or(SyncError::NotLinked(from))?;
        let source = syncable(doc, from)?;
        let Some(style) = source.text_style().cloned() else {
            log::debug!("Skipping style sync from {}: sub-nodes not attached", from);
            return Ok(Propagation::SkippedMissingSubNode);
        };
        if let Some(skip) = guard(doc, to)? {
            return Ok(skip);
        }
        doc.get_shape_mut(to)
            .and_then(Shape::as_syncable_mut)
            .ok_or(SyncError::UnknownShape(to))?
            .apply_text_style(&style)?;
        Ok(Propagation::Applied)
    }

    /// Copy the tag background fill from `from` onto its hidden partner.
    pub fn propagate_tag_fill(&self, doc: &mut CanvasDocument, from: ShapeId) -> Result<Propagation, SyncError> {
        let to = self.partner(from).ok_or(SyncError::NotLinked(from))?;
        let Some(fill) = syncable(doc, from)?.tag().map(|tag| tag.fill) else {
            log::debug!("Skipping tag fill sync from {}: sub-nodes not attached", from);
            return Ok(Propagation::SkippedMissingSubNode);
        };
        if let Some(skip) = guard(doc, to)? {
            return Ok(skip);
        }
        doc.get_shape_mut(to)
            .and_then(Shape::as_syncable_mut)
            .ok_or(SyncError::UnknownShape(to))?
            .set_tag_fill(fill)?;
        Ok(Propagation::Applied)
    }

    /// Mirror scale and rotation from `from` onto its hidden partner and
    /// center the partner on it.
    pub fn propagate_pose(&self, doc: &mut CanvasDocument, from: ShapeId) -> Result<Propagation, SyncError> {
        let to = self.partner(from).ok_or(SyncError::NotLinked(from))?;
        let source = syncable(doc, from)?;
        if !source.is_initialized() {
            log::debug!("Skipping pose sync from {}: sub-nodes not attached", from);
            return Ok(Propagation::SkippedMissingSubNode);
        }
        let source_rect = source.client_rect();
        let scale = source.node().absolute_scale();
        let rotation = source.node().rotation_deg;
        if let Some(skip) = guard(doc, to)? {
            return Ok(skip);
        }

        let target = doc.get_shape_mut(to).ok_or(SyncError::UnknownShape(to))?;
        let node = target.node_mut();
        node.scale = scale;
        node.rotation_deg = rotation;
        let target_rect = target.client_rect();
        let anchor = target.node().position;
        target.node_mut().position = geometry::align_centers(source_rect, target_rect, anchor);
        Ok(Propagation::Applied)
    }

    /// Full pass from `from` to its hidden partner: style and tag fill, then pose.
    ///
    /// The pose step reads the partner's bounds after the style step has
    /// re-laid it out.
    pub fn sync(&self, doc: &mut CanvasDocument, from: ShapeId) -> Result<PairSync, SyncError> {
        let style = self.propagate_style(doc, from)?;
        if style.applied() {
            self.propagate_tag_fill(doc, from)?;
        }
        let pose = self.propagate_pose(doc, from)?;
        Ok(PairSync { style, pose })
    }
}

fn expect_kind(doc: &CanvasDocument, id: ShapeId, kind: ShapeKind) -> Result<(), SyncError> {
    let shape = doc.get_shape(id).ok_or(SyncError::UnknownShape(id))?;
    if shape.kind() != kind {
        return Err(SyncError::WrongVariant {
            id,
            expected: kind.name(),
        });
    }
    Ok(())
}

fn syncable(doc: &CanvasDocument, id: ShapeId) -> Result<&dyn Syncable, SyncError> {
    doc.get_shape(id)
        .ok_or(SyncError::UnknownShape(id))?
        .as_syncable()
        .ok_or(SyncError::WrongVariant {
            id,
            expected: "text",
        })
}

/// Check the target may be written to. Returns the skip reason if not.
fn guard(doc: &CanvasDocument, to: ShapeId) -> Result<Option<Propagation>, SyncError> {
    let target = syncable(doc, to)?;
    if target.node().visible {
        log::debug!("Skipping sync into {}: target is visible", to);
        return Ok(Some(Propagation::SkippedTargetVisible));
    }
    if !target.is_initialized() {
        log::debug!("Skipping sync into {}: sub-nodes not attached", to);
        return Ok(Some(Propagation::SkippedMissingSubNode));
    }
    Ok(None)
}

fn is_visible(doc: &CanvasDocument, id: ShapeId) -> Result<bool, SyncError> {
    doc.get_shape(id)
        .map(Shape::is_visible)
        .ok_or(SyncError::UnknownShape(id))
}

fn set_visible(doc: &mut CanvasDocument, id: ShapeId, visible: bool) -> Result<(), SyncError> {
    let node = doc.get_shape_mut(id).ok_or(SyncError::UnknownShape(id))?.node_mut();
    node.visible = visible;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{CurvedText, SerializableColor, StraightText, TextStyle};
    use kurbo::{Point, Vec2};

    const TOLERANCE: f64 = 1e-6;

    fn setup() -> (CanvasDocument, LinkedTextPair) {
        let mut doc = CanvasDocument::new();
        let straight = StraightText::new(
            Point::new(100.0, 100.0),
            TextStyle::new("Linked text").with_font_size(24.0),
        );
        let curved = CurvedText::new(Point::ZERO, TextStyle::new("Linked text"), 40.0);
        let (straight_id, curved_id) = (straight.id(), curved.id());
        doc.add_shape(straight.into());
        doc.add_shape(curved.into());
        let pair = LinkedTextPair::link(&mut doc, straight_id, curved_id).unwrap();
        (doc, pair)
    }

    fn font_size(doc: &CanvasDocument, id: ShapeId) -> f64 {
        doc.get_shape(id)
            .and_then(Shape::as_syncable)
            .and_then(|s| s.text_style())
            .map(|s| s.font_size)
            .unwrap()
    }

    fn set_font_size(doc: &mut CanvasDocument, id: ShapeId, size: f64) {
        let shape = doc.get_shape_mut(id).and_then(Shape::as_syncable_mut).unwrap();
        let style = shape.text_style().unwrap().clone().with_font_size(size);
        shape.apply_text_style(&style).unwrap();
    }

    fn center(doc: &CanvasDocument, id: ShapeId) -> Point {
        doc.get_shape(id).unwrap().client_rect().center()
    }

    #[test]
    fn test_link_sets_back_references() {
        let (doc, pair) = setup();
        assert_eq!(LinkedTextPair::of(&doc, pair.straight), Some(pair));
        assert_eq!(LinkedTextPair::of(&doc, pair.curved), Some(pair));
        assert_eq!(pair.active(&doc), Some(pair.straight));
        assert_eq!(pair.hidden(&doc), Some(pair.curved));
    }

    #[test]
    fn test_link_rejects_wrong_variants() {
        let (mut doc, pair) = setup();
        let result = LinkedTextPair::link(&mut doc, pair.curved, pair.straight);
        assert!(matches!(result, Err(SyncError::WrongVariant { .. })));
    }

    #[test]
    fn test_font_size_propagates_before_pose() {
        let (mut doc, pair) = setup();
        set_font_size(&mut doc, pair.straight, 36.0);

        let outcome = pair.sync(&mut doc, pair.straight).unwrap();
        assert_eq!(outcome.style, Propagation::Applied);
        assert_eq!(outcome.pose, Propagation::Applied);
        assert!((font_size(&doc, pair.curved) - 36.0).abs() < f64::EPSILON);

        // The pose step saw the re-laid-out bounds, so centers coincide.
        let (a, b) = (center(&doc, pair.straight), center(&doc, pair.curved));
        assert!((a.x - b.x).abs() < TOLERANCE && (a.y - b.y).abs() < TOLERANCE);
    }

    #[test]
    fn test_style_copied_verbatim() {
        let (mut doc, pair) = setup();
        let shape = doc.get_shape_mut(pair.straight).and_then(Shape::as_syncable_mut).unwrap();
        let mut style = shape.text_style().unwrap().clone();
        style.font_family = "Courier".to_string();
        style.letter_spacing = 2.5;
        style.fill = SerializableColor::new(200, 10, 10, 255);
        style.original_text = "Changed".to_string();
        shape.apply_text_style(&style).unwrap();

        pair.propagate_style(&mut doc, pair.straight).unwrap();
        let mirrored = doc.get_shape(pair.curved).and_then(Shape::as_syncable).unwrap();
        assert_eq!(mirrored.text_style(), Some(&style));
    }

    #[test]
    fn test_pose_mirrors_scale_and_rotation() {
        let (mut doc, pair) = setup();
        {
            let node = doc.get_shape_mut(pair.straight).unwrap().node_mut();
            node.scale = Vec2::new(1.5, 2.0);
            node.parent_scale = Vec2::new(2.0, 1.0);
            node.rotation_deg = 20.0;
        }
        pair.propagate_pose(&mut doc, pair.straight).unwrap();

        let node = doc.get_shape(pair.curved).unwrap().node();
        assert_eq!(node.scale, Vec2::new(3.0, 2.0));
        assert!((node.rotation_deg - 20.0).abs() < f64::EPSILON);
        let (a, b) = (center(&doc, pair.straight), center(&doc, pair.curved));
        assert!((a.x - b.x).abs() < TOLERANCE && (a.y - b.y).abs() < TOLERANCE);
    }

    #[test]
    fn test_guard_when_both_visible() {
        let (mut doc, pair) = setup();
        doc.get_shape_mut(pair.curved).unwrap().node_mut().visible = true;
        set_font_size(&mut doc, pair.straight, 48.0);
        let curved_before = doc.get_shape(pair.curved).unwrap().node().pose();

        let outcome = pair.sync(&mut doc, pair.straight).unwrap();
        assert_eq!(outcome.style, Propagation::SkippedTargetVisible);
        assert_eq!(outcome.pose, Propagation::SkippedTargetVisible);
        assert!((font_size(&doc, pair.curved) - 24.0).abs() < f64::EPSILON);
        assert_eq!(doc.get_shape(pair.curved).unwrap().node().pose(), curved_before);
    }

    #[test]
    fn test_sync_from_hidden_member_is_noop() {
        let (mut doc, pair) = setup();
        set_font_size(&mut doc, pair.curved, 12.0);
        let outcome = pair.sync(&mut doc, pair.curved).unwrap();
        assert_eq!(outcome.style, Propagation::SkippedTargetVisible);
        assert!((font_size(&doc, pair.straight) - 24.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_missing_sub_node_skips() {
        let mut doc = CanvasDocument::new();
        let straight = StraightText::new(Point::ZERO, TextStyle::new("x"));
        let curved = CurvedText::uninitialized(Point::ZERO);
        let (straight_id, curved_id) = (straight.id(), curved.id());
        doc.add_shape(straight.into());
        doc.add_shape(curved.into());
        let pair = LinkedTextPair::link(&mut doc, straight_id, curved_id).unwrap();

        let outcome = pair.sync(&mut doc, straight_id).unwrap();
        assert_eq!(outcome.style, Propagation::SkippedMissingSubNode);
        assert_eq!(outcome.pose, Propagation::SkippedMissingSubNode);
        assert!(!doc.get_shape(curved_id).and_then(Shape::as_syncable).unwrap().is_initialized());
    }

    #[test]
    fn test_toggle_swaps_visibility_only() {
        let (mut doc, pair) = setup();
        pair.sync(&mut doc, pair.straight).unwrap();
        let curved_pose = doc.get_shape(pair.curved).unwrap().node().pose();

        let active = pair.toggle(&mut doc).unwrap();
        assert_eq!(active, pair.curved);
        assert_eq!(pair.hidden(&doc), Some(pair.straight));
        assert_eq!(doc.get_shape(pair.curved).unwrap().node().pose(), curved_pose);

        // Propagation now runs the other way.
        set_font_size(&mut doc, pair.curved, 30.0);
        pair.sync(&mut doc, pair.curved).unwrap();
        assert!((font_size(&doc, pair.straight) - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_tag_fill_propagates() {
        let (mut doc, pair) = setup();
        let fill = Some(SerializableColor::new(0, 128, 255, 255));
        doc.get_shape_mut(pair.straight)
            .and_then(Shape::as_syncable_mut)
            .unwrap()
            .set_tag_fill(fill)
            .unwrap();
        assert_eq!(pair.propagate_tag_fill(&mut doc, pair.straight).unwrap(), Propagation::Applied);
        let tag = doc.get_shape(pair.curved).and_then(Shape::as_syncable).unwrap().tag().unwrap();
        assert_eq!(tag.fill, fill);
    }

    #[test]
    fn test_unlink() {
        let (mut doc, pair) = setup();
        pair.unlink(&mut doc);
        assert!(LinkedTextPair::of(&doc, pair.straight).is_none());
        assert!(pair.propagate_style(&mut doc, pair.straight).is_ok());
    }
}
