//! Canvas document and state management.

use crate::error::{ReflectionError, SyncError};
use crate::events::{DomainEvent, EventChannel};
use crate::linked::LinkedTextPair;
use crate::raster::{PendingRaster, RasterCompletion, Rasterizer};
use crate::reflection::{PoseKind, ReflectionConfig, ReflectionEngine};
use crate::shapes::{CurvedText, Image, Shape, ShapeId, StraightText};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A canvas document containing all shapes and state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanvasDocument {
    /// Unique document identifier.
    pub id: String,
    /// Document name.
    pub name: String,
    /// All shapes in the document, keyed by ID.
    pub shapes: HashMap<ShapeId, Shape>,
    /// Z-order of shapes (back to front).
    pub z_order: Vec<ShapeId>,
    /// Reflection companions, keyed by source. A companion always sits directly
    /// beneath its source in `z_order`.
    #[serde(default)]
    companions: HashMap<ShapeId, ShapeId>,
}

impl Default for CanvasDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl CanvasDocument {
    /// Create a new empty document.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: "Untitled".to_string(),
            shapes: HashMap::new(),
            z_order: Vec::new(),
            companions: HashMap::new(),
        }
    }

    /// Add a shape to the document.
    pub fn add_shape(&mut self, shape: Shape) -> ShapeId {
        let id = shape.id();
        self.z_order.push(id);
        self.shapes.insert(id, shape);
        id
    }

    /// Remove a shape from the document, dropping any companion registration it takes part in.
    pub fn remove_shape(&mut self, id: ShapeId) -> Option<Shape> {
        self.companions
            .retain(|&source, &mut companion| source != id && companion != id);
        self.z_order.retain(|&shape_id| shape_id != id);
        self.shapes.remove(&id)
    }

    /// Get a shape by ID.
    pub fn get_shape(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes.get(&id)
    }

    /// Get a mutable reference to a shape by ID.
    pub fn get_shape_mut(&mut self, id: ShapeId) -> Option<&mut Shape> {
        self.shapes.get_mut(&id)
    }

    pub fn straight(&self, id: ShapeId) -> Result<&StraightText, SyncError> {
        self.get_shape(id)
            .ok_or(SyncError::UnknownShape(id))?
            .as_straight()
            .ok_or(SyncError::WrongVariant {
                id,
                expected: "straight text",
            })
    }

    pub fn straight_mut(&mut self, id: ShapeId) -> Result<&mut StraightText, SyncError> {
        self.get_shape_mut(id)
            .ok_or(SyncError::UnknownShape(id))?
            .as_straight_mut()
            .ok_or(SyncError::WrongVariant {
                id,
                expected: "straight text",
            })
    }

    pub fn curved(&self, id: ShapeId) -> Result<&CurvedText, SyncError> {
        self.get_shape(id)
            .ok_or(SyncError::UnknownShape(id))?
            .as_curved()
            .ok_or(SyncError::WrongVariant {
                id,
                expected: "curved text",
            })
    }

    pub fn curved_mut(&mut self, id: ShapeId) -> Result<&mut CurvedText, SyncError> {
        self.get_shape_mut(id)
            .ok_or(SyncError::UnknownShape(id))?
            .as_curved_mut()
            .ok_or(SyncError::WrongVariant {
                id,
                expected: "curved text",
            })
    }

    /// Get shapes in z-order (back to front).
    pub fn shapes_ordered(&self) -> impl Iterator<Item = &Shape> {
        self.z_order.iter().filter_map(|id| self.shapes.get(id))
    }

    /// Position of a shape in the z-order.
    pub fn z_index(&self, id: ShapeId) -> Option<usize> {
        self.z_order.iter().position(|&shape_id| shape_id == id)
    }

    /// Move a shape to `index` in the z-order (clamped to the end).
    /// Companions are restacked afterwards.
    pub fn set_z_index(&mut self, id: ShapeId, index: usize) -> bool {
        if !self.place(id, index) {
            return false;
        }
        self.restack();
        true
    }

    /// Remove `id` and reinsert it at `index`, without restacking.
    fn place(&mut self, id: ShapeId, index: usize) -> bool {
        let Some(pos) = self.z_index(id) else {
            return false;
        };
        self.z_order.remove(pos);
        let index = index.min(self.z_order.len());
        self.z_order.insert(index, id);
        true
    }

    /// Register `companion` as the reflection of `source` and stack it directly beneath.
    pub fn register_companion(&mut self, source: ShapeId, companion: ShapeId) {
        if let Some(z) = self.z_index(source) {
            self.place(companion, z);
            if let Some(below) = self.z_index(companion) {
                self.place(source, below + 1);
            }
        }
        self.companions.insert(source, companion);
        self.restack();
    }

    /// Re-register the companion of `from` as the companion of `to`.
    pub fn move_companion(&mut self, from: ShapeId, to: ShapeId) -> Option<ShapeId> {
        let companion = self.companions.remove(&from)?;
        self.register_companion(to, companion);
        Some(companion)
    }

    pub fn companion_of(&self, source: ShapeId) -> Option<ShapeId> {
        self.companions.get(&source).copied()
    }

    pub fn source_of(&self, companion: ShapeId) -> Option<ShapeId> {
        self.companions
            .iter()
            .find_map(|(&source, &c)| (c == companion).then_some(source))
    }

    /// Z-order operations act on a source and its companion as one unit.
    /// A companion is resolved to its source.
    fn unit_head(&self, id: ShapeId) -> ShapeId {
        self.source_of(id).unwrap_or(id)
    }

    /// Run a z-order edit with companions lifted out, then put each back beneath its source.
    fn with_companions_lifted(&mut self, edit: impl FnOnce(&mut Vec<ShapeId>) -> bool) -> bool {
        let lifted: Vec<ShapeId> = self.companions.values().copied().collect();
        self.z_order.retain(|id| !lifted.contains(id));
        let changed = edit(&mut self.z_order);
        for companion in lifted {
            self.z_order.push(companion);
        }
        self.restack();
        changed
    }

    /// Move every registered companion to just below its source.
    fn restack(&mut self) {
        let pairs: Vec<(ShapeId, ShapeId)> = self.companions.iter().map(|(&s, &c)| (s, c)).collect();
        for (source, companion) in pairs {
            let Some(pos) = self.z_index(companion) else {
                continue;
            };
            self.z_order.remove(pos);
            match self.z_index(source) {
                Some(z) => self.z_order.insert(z, companion),
                None => self.z_order.insert(pos.min(self.z_order.len()), companion),
            }
        }
    }

    /// Bring a shape to the front (topmost).
    pub fn bring_to_front(&mut self, id: ShapeId) {
        let id = self.unit_head(id);
        self.with_companions_lifted(|z| {
            z.retain(|&shape_id| shape_id != id);
            z.push(id);
            true
        });
    }

    /// Send a shape to the back (bottommost).
    pub fn send_to_back(&mut self, id: ShapeId) {
        let id = self.unit_head(id);
        self.with_companions_lifted(|z| {
            z.retain(|&shape_id| shape_id != id);
            z.insert(0, id);
            true
        });
    }

    /// Move a shape one layer forward (towards front).
    /// Returns true if the shape was moved, false if already at front.
    pub fn bring_forward(&mut self, id: ShapeId) -> bool {
        let id = self.unit_head(id);
        self.with_companions_lifted(|z| {
            if let Some(pos) = z.iter().position(|&shape_id| shape_id == id) {
                if pos + 1 < z.len() {
                    z.swap(pos, pos + 1);
                    return true;
                }
            }
            false
        })
    }

    /// Move a shape one layer backward (towards back).
    /// Returns true if the shape was moved, false if already at back.
    pub fn send_backward(&mut self, id: ShapeId) -> bool {
        let id = self.unit_head(id);
        self.with_companions_lifted(|z| {
            if let Some(pos) = z.iter().position(|&shape_id| shape_id == id) {
                if pos > 0 {
                    z.swap(pos, pos - 1);
                    return true;
                }
            }
            false
        })
    }

    /// Check if the document is empty.
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Serialize the document to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize a document from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Runtime canvas state (not persisted).
#[derive(Debug, Clone, Default)]
pub struct Canvas {
    /// The document being edited.
    pub document: CanvasDocument,
    /// Currently selected shape IDs.
    pub selection: Vec<ShapeId>,
    /// Outgoing domain events.
    pub events: EventChannel,
    /// Reflection engines, keyed by source shape.
    reflections: HashMap<ShapeId, ReflectionEngine>,
    /// Text shape in inline editing, if any.
    editing: Option<ShapeId>,
}

impl Canvas {
    /// Create a new canvas with an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a canvas with an existing document, re-binding its reflection companions.
    pub fn with_document(document: CanvasDocument) -> Self {
        let mut canvas = Self {
            document,
            ..Self::default()
        };
        let pairs: Vec<(ShapeId, ShapeId)> = canvas
            .document
            .companions
            .iter()
            .map(|(&s, &c)| (s, c))
            .collect();
        for (source, image) in pairs {
            let mut engine = ReflectionEngine::new();
            match engine.attach(&mut canvas.document, source, image) {
                Ok(()) => {
                    canvas.reflections.insert(source, engine);
                }
                Err(e) => log::warn!("Dropping reflection of {}: {}", source, e),
            }
        }
        canvas
    }

    /// Add a shape to the document.
    pub fn add_shape(&mut self, shape: impl Into<Shape>) -> ShapeId {
        self.document.add_shape(shape.into())
    }

    /// Select a shape (clears previous selection).
    pub fn select(&mut self, id: ShapeId) {
        self.clear_selection();
        self.add_to_selection(id);
    }

    /// Add to selection.
    pub fn add_to_selection(&mut self, id: ShapeId) {
        if !self.selection.contains(&id) {
            self.selection.push(id);
        }
    }

    pub fn deselect(&mut self, id: ShapeId) {
        self.selection.retain(|&s| s != id);
    }

    /// Clear selection.
    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Check if a shape is selected.
    pub fn is_selected(&self, id: ShapeId) -> bool {
        self.selection.contains(&id)
    }

    /// Remove a shape, unlinking its partner and dropping its reflection.
    pub fn remove_shape(&mut self, id: ShapeId) -> Option<Shape> {
        if let Some(pair) = LinkedTextPair::of(&self.document, id) {
            pair.unlink(&mut self.document);
        }
        if let Some(source) = self.document.source_of(id) {
            self.detach_reflection(source);
        }
        self.detach_reflection(id);
        if self.editing == Some(id) {
            self.editing = None;
        }
        self.deselect(id);
        self.document.remove_shape(id)
    }

    // --- Linked text pairs ---

    /// Link a straight and a curved text and bring the hidden one in line with the visible one.
    pub fn link_text_pair(&mut self, straight: ShapeId, curved: ShapeId) -> Result<LinkedTextPair, SyncError> {
        let pair = LinkedTextPair::link(&mut self.document, straight, curved)?;
        if let Some(active) = pair.active(&self.document) {
            pair.sync(&mut self.document, active)?;
        }
        Ok(pair)
    }

    /// Swap the visible member of the pair `id` belongs to. Returns the newly active member.
    ///
    /// A reflection on the member being hidden follows the toggle and waits,
    /// hidden, for the next reload.
    pub fn toggle_representation(&mut self, id: ShapeId) -> Result<ShapeId, SyncError> {
        let pair = LinkedTextPair::of(&self.document, id).ok_or(SyncError::NotLinked(id))?;
        let active = pair.toggle(&mut self.document)?;
        let hidden = pair.partner(active).ok_or(SyncError::NotLinked(active))?;
        self.hand_over_reflection(hidden, active);
        if self.is_selected(hidden) {
            self.deselect(hidden);
            self.add_to_selection(active);
        }
        self.events
            .publish(DomainEvent::RepresentationToggled { active, hidden });
        Ok(active)
    }

    /// Rotate a text shape about its visual center.
    pub fn rotate_shape(&mut self, id: ShapeId, degrees: f64) -> Result<(), SyncError> {
        let shape = self
            .document
            .get_shape_mut(id)
            .ok_or(SyncError::UnknownShape(id))?;
        shape
            .as_rotatable_mut()
            .ok_or(SyncError::WrongVariant {
                id,
                expected: "text",
            })?
            .rotate_about_center(degrees);
        self.events.publish(DomainEvent::ShapeRotated { id, degrees });
        Ok(())
    }

    // --- Inline editing ---

    /// Enter inline editing on a text shape.
    pub fn begin_inline_edit(&mut self, id: ShapeId) -> Result<(), SyncError> {
        let shape = self
            .document
            .get_shape_mut(id)
            .ok_or(SyncError::UnknownShape(id))?;
        if shape.as_syncable().is_none() {
            return Err(SyncError::WrongVariant {
                id,
                expected: "text",
            });
        }
        shape.node_mut().draggable = false;
        self.clear_selection();
        self.editing = Some(id);
        self.events.publish(DomainEvent::TextDoubleClicked { id });
        Ok(())
    }

    pub fn editing_shape(&self) -> Option<ShapeId> {
        self.editing
    }

    /// Leave inline editing, writing `text` into the edited shape.
    ///
    /// Returns the edited shape, or `None` when nothing was being edited.
    pub fn commit_inline_edit(&mut self, text: &str) -> Result<Option<ShapeId>, SyncError> {
        let Some(id) = self.editing.take() else {
            return Ok(None);
        };
        let shape = self
            .document
            .get_shape_mut(id)
            .ok_or(SyncError::UnknownShape(id))?;
        shape.node_mut().draggable = true;
        let kind = shape.kind();
        match shape {
            Shape::StraightText(label) => label.set_content(text)?,
            Shape::CurvedText(curved) => curved.set_content(text)?,
            Shape::Image(_) => {
                return Err(SyncError::WrongVariant {
                    id,
                    expected: "text",
                });
            }
        }
        self.events.publish(DomainEvent::TextContentChanged {
            id,
            kind,
            text: text.to_string(),
        });
        Ok(Some(id))
    }

    // --- Reflections ---

    /// Keep a reflection on the visible member of a linked pair.
    ///
    /// The engine of `from` moves to `to` unless `to` already has its own, in
    /// which case it is only hidden.
    fn hand_over_reflection(&mut self, from: ShapeId, to: ShapeId) {
        let Some(mut engine) = self.reflections.remove(&from) else {
            return;
        };
        if !self.reflections.contains_key(&to) {
            match engine.retarget(&mut self.document, to) {
                Ok(()) => {
                    self.reflections.insert(to, engine);
                    return;
                }
                Err(e) => log::warn!("Reflection of {} stays behind: {}", from, e),
            }
        }
        if let Err(e) = engine.hide(&mut self.document) {
            log::warn!("Failed to hide reflection of {}: {}", from, e);
        }
        self.reflections.insert(from, engine);
    }

    /// Create a reflection companion for `source` and attach an engine to it.
    /// Returns the companion's ID.
    pub fn attach_reflection(&mut self, source: ShapeId) -> Result<ShapeId, ReflectionError> {
        if self.reflections.contains_key(&source) {
            return Err(ReflectionError::AlreadyAttached(source));
        }
        let image = self.document.add_shape(Image::companion().into());
        let mut engine = ReflectionEngine::new();
        if let Err(e) = engine.attach(&mut self.document, source, image) {
            self.document.remove_shape(image);
            return Err(e);
        }
        self.deselect(image);
        self.reflections.insert(source, engine);
        Ok(image)
    }

    pub fn reflection(&self, source: ShapeId) -> Option<&ReflectionEngine> {
        self.reflections.get(&source)
    }

    pub fn show_reflection(
        &mut self,
        source: ShapeId,
        rasterizer: &dyn Rasterizer,
    ) -> Result<Option<PendingRaster>, ReflectionError> {
        let engine = self
            .reflections
            .get_mut(&source)
            .ok_or(ReflectionError::Detached)?;
        engine.show(&mut self.document, rasterizer)
    }

    pub fn hide_reflection(&mut self, source: ShapeId) -> Result<(), ReflectionError> {
        let engine = self
            .reflections
            .get_mut(&source)
            .ok_or(ReflectionError::Detached)?;
        engine.hide(&mut self.document)
    }

    pub fn reload_reflection(
        &mut self,
        source: ShapeId,
        rasterizer: &dyn Rasterizer,
    ) -> Result<Option<PendingRaster>, ReflectionError> {
        let engine = self
            .reflections
            .get_mut(&source)
            .ok_or(ReflectionError::Detached)?;
        engine.reload(&mut self.document, rasterizer)
    }

    pub fn update_reflection_config(
        &mut self,
        source: ShapeId,
        config: ReflectionConfig,
        rasterizer: &dyn Rasterizer,
    ) -> Result<Option<PendingRaster>, ReflectionError> {
        let engine = self
            .reflections
            .get_mut(&source)
            .ok_or(ReflectionError::Detached)?;
        engine.update_config(&mut self.document, config, rasterizer)
    }

    pub fn sync_reflection_pose(&mut self, source: ShapeId, kind: PoseKind) -> Result<(), ReflectionError> {
        let engine = self
            .reflections
            .get_mut(&source)
            .ok_or(ReflectionError::Detached)?;
        engine.sync_pose(&mut self.document, kind)
    }

    /// Apply a finished rasterization to the engine that requested it.
    ///
    /// A completion for a reflection that has since been detached is dropped.
    pub fn finish_rasterization(&mut self, completion: RasterCompletion) -> Result<bool, ReflectionError> {
        let Some(engine) = self.reflections.get_mut(&completion.source) else {
            log::debug!(
                "Dropping rasterization {} for detached reflection of {}",
                completion.seq,
                completion.source
            );
            return Ok(false);
        };
        engine.finish(&mut self.document, completion)
    }

    pub fn reflection_extent_px(&self, source: ShapeId) -> Result<f64, ReflectionError> {
        self.reflections
            .get(&source)
            .ok_or(ReflectionError::Detached)?
            .reflection_extent_px(&self.document)
    }

    /// Detach the reflection of `source` and remove its companion.
    pub fn detach_reflection(&mut self, source: ShapeId) -> Option<Shape> {
        let mut engine = self.reflections.remove(&source)?;
        let image = engine.image();
        if let Some(image) = image {
            self.deselect(image);
        }
        engine.detach(&mut self.document)
    }

    /// Whether `source` has a reflection engine attached.
    pub fn has_reflection(&self, source: ShapeId) -> bool {
        self.engine_ref(source).is_some()
    }

    fn engine_ref(&self, source: ShapeId) -> Option<&ReflectionEngine> {
        self.reflections.get(&source).filter(|e| e.is_attached())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RasterResult;
    use crate::raster::{Bitmap, BoxFuture, ShapeSnapshot};
    use crate::shapes::{ShapeTrait, Syncable, TextStyle};
    use kurbo::Point;

    struct Instant;

    impl Rasterizer for Instant {
        fn rasterize(&self, snapshot: ShapeSnapshot) -> BoxFuture<'static, RasterResult<Bitmap>> {
            let rect = snapshot.local_rect;
            Box::pin(async move {
                Ok(Bitmap::transparent(rect.width().ceil() as u32, rect.height().ceil() as u32))
            })
        }
    }

    fn label(x: f64, y: f64) -> Shape {
        StraightText::new(Point::new(x, y), TextStyle::new("Label")).into()
    }

    fn assert_companions_below(doc: &CanvasDocument) {
        for (&source, &companion) in &doc.companions {
            assert_eq!(
                doc.z_index(companion).unwrap() + 1,
                doc.z_index(source).unwrap(),
                "companion not directly beneath its source"
            );
        }
    }

    #[test]
    fn test_document_creation() {
        let doc = CanvasDocument::new();
        assert!(doc.is_empty());
    }

    #[test]
    fn test_add_remove_shape() {
        let mut doc = CanvasDocument::new();
        let id = doc.add_shape(label(0.0, 0.0));
        assert!(!doc.is_empty());
        assert!(doc.get_shape(id).is_some());

        assert!(doc.remove_shape(id).is_some());
        assert!(doc.is_empty());
        assert!(doc.z_order.is_empty());
    }

    #[test]
    fn test_z_order() {
        let mut doc = CanvasDocument::new();
        let id1 = doc.add_shape(label(0.0, 0.0));
        let id2 = doc.add_shape(label(50.0, 50.0));
        assert_eq!(doc.z_order, vec![id1, id2]);

        doc.bring_to_front(id1);
        assert_eq!(doc.z_order, vec![id2, id1]);

        doc.send_to_back(id1);
        assert_eq!(doc.z_order, vec![id1, id2]);

        assert!(doc.bring_forward(id1));
        assert!(!doc.bring_forward(id1));
        assert!(doc.send_backward(id1));
        assert!(!doc.send_backward(id1));
    }

    #[test]
    fn test_companion_stays_beneath_source() {
        let mut canvas = Canvas::new();
        let a = canvas.add_shape(label(0.0, 0.0));
        let source = canvas.add_shape(label(10.0, 10.0));
        let b = canvas.add_shape(label(20.0, 20.0));
        let image = canvas.attach_reflection(source).unwrap();
        let doc = &mut canvas.document;
        assert_eq!(doc.z_order, vec![a, image, source, b]);

        doc.bring_to_front(source);
        assert_companions_below(doc);
        assert_eq!(doc.z_order, vec![a, b, image, source]);

        doc.send_backward(source);
        assert_companions_below(doc);
        assert_eq!(doc.z_order, vec![a, image, source, b]);

        doc.send_to_back(source);
        assert_companions_below(doc);
        assert_eq!(doc.z_index(image), Some(0));

        doc.bring_forward(source);
        assert_companions_below(doc);

        // Operating on the companion moves the whole unit.
        doc.bring_to_front(image);
        assert_companions_below(doc);
        assert_eq!(doc.z_order.last(), Some(&source));

        doc.set_z_index(a, 0);
        assert_companions_below(doc);
        doc.set_z_index(source, 1);
        assert_companions_below(doc);
    }

    #[test]
    fn test_document_round_trip() {
        let mut canvas = Canvas::new();
        let straight = canvas.add_shape(label(100.0, 100.0));
        let curved = canvas.add_shape(CurvedText::new(Point::ZERO, TextStyle::new("Label"), 30.0));
        canvas.link_text_pair(straight, curved).unwrap();
        let image = canvas.attach_reflection(straight).unwrap();

        let json = canvas.document.to_json().unwrap();
        let restored = Canvas::with_document(CanvasDocument::from_json(&json).unwrap());

        assert_eq!(
            LinkedTextPair::of(&restored.document, straight),
            Some(LinkedTextPair { straight, curved })
        );
        assert_eq!(restored.reflection(straight).and_then(ReflectionEngine::image), Some(image));
        assert_companions_below(&restored.document);
    }

    #[test]
    fn test_link_syncs_hidden_member() {
        let mut canvas = Canvas::new();
        let straight = canvas.add_shape(StraightText::new(
            Point::new(40.0, 40.0),
            TextStyle::new("Synced").with_font_size(30.0),
        ));
        let curved = canvas.add_shape(CurvedText::new(Point::ZERO, TextStyle::new("Other"), 20.0));
        canvas.link_text_pair(straight, curved).unwrap();

        let mirrored = canvas.document.curved(curved).unwrap();
        assert_eq!(mirrored.content(), "Synced");
        assert!(!mirrored.node.visible);
        assert!((mirrored.text_style().unwrap().font_size - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_toggle_representation() {
        let mut canvas = Canvas::new();
        let straight = canvas.add_shape(label(0.0, 0.0));
        let curved = canvas.add_shape(CurvedText::new(Point::ZERO, TextStyle::new("Label"), 30.0));
        canvas.link_text_pair(straight, curved).unwrap();
        canvas.select(straight);

        assert_eq!(canvas.toggle_representation(straight).unwrap(), curved);
        assert!(canvas.is_selected(curved));
        assert!(!canvas.is_selected(straight));
        assert_eq!(
            canvas.events.drain(),
            vec![DomainEvent::RepresentationToggled {
                active: curved,
                hidden: straight
            }]
        );

        let lone = canvas.add_shape(label(0.0, 0.0));
        assert_eq!(canvas.toggle_representation(lone), Err(SyncError::NotLinked(lone)));
    }

    #[test]
    fn test_toggle_hands_reflection_to_visible_member() {
        let mut canvas = Canvas::new();
        let straight = canvas.add_shape(label(0.0, 0.0));
        let curved = canvas.add_shape(CurvedText::new(Point::ZERO, TextStyle::new("Label"), 30.0));
        canvas.link_text_pair(straight, curved).unwrap();
        let image = canvas.attach_reflection(straight).unwrap();
        let pending = canvas
            .update_reflection_config(straight, ReflectionConfig::enabled(), &Instant)
            .unwrap()
            .unwrap();
        assert!(canvas.finish_rasterization(pending.block_on()).unwrap());

        canvas.toggle_representation(straight).unwrap();
        assert!(!canvas.has_reflection(straight));
        assert_eq!(canvas.reflection(curved).and_then(ReflectionEngine::image), Some(image));
        assert!(!canvas.document.get_shape(image).unwrap().is_visible());
        assert_companions_below(&canvas.document);

        // With a reflection of its own, the newly visible member keeps it.
        let own = canvas.attach_reflection(straight).unwrap();
        canvas.toggle_representation(curved).unwrap();
        assert_eq!(canvas.reflection(curved).and_then(ReflectionEngine::image), Some(image));
        assert_eq!(canvas.reflection(straight).and_then(ReflectionEngine::image), Some(own));
        assert!(!canvas.document.get_shape(image).unwrap().is_visible());
    }

    #[test]
    fn test_rotate_shape_publishes_event() {
        let mut canvas = Canvas::new();
        let id = canvas.add_shape(label(0.0, 0.0));
        canvas.rotate_shape(id, 45.0).unwrap();
        assert!((canvas.document.get_shape(id).unwrap().node().rotation_deg - 45.0).abs() < f64::EPSILON);
        assert_eq!(
            canvas.events.drain(),
            vec![DomainEvent::ShapeRotated { id, degrees: 45.0 }]
        );
    }

    #[test]
    fn test_inline_edit() {
        let mut canvas = Canvas::new();
        let id = canvas.add_shape(label(0.0, 0.0));
        canvas.select(id);

        canvas.begin_inline_edit(id).unwrap();
        assert_eq!(canvas.editing_shape(), Some(id));
        assert!(canvas.selection.is_empty());
        assert!(!canvas.document.get_shape(id).unwrap().node().draggable);

        assert_eq!(canvas.commit_inline_edit("Edited").unwrap(), Some(id));
        let label = canvas.document.straight(id).unwrap();
        assert_eq!(label.content(), "Edited");
        assert!(label.node.draggable);
        assert_eq!(canvas.editing_shape(), None);
        assert_eq!(canvas.commit_inline_edit("again").unwrap(), None);

        let events = canvas.events.drain();
        assert!(matches!(events[0], DomainEvent::TextDoubleClicked { .. }));
        assert!(matches!(&events[1], DomainEvent::TextContentChanged { text, .. } if text == "Edited"));
    }

    #[test]
    fn test_attach_reflection_deselects_companion() {
        let mut canvas = Canvas::new();
        let source = canvas.add_shape(label(0.0, 0.0));
        let image = canvas.attach_reflection(source).unwrap();
        assert!(!canvas.is_selected(image));
        assert!(canvas.has_reflection(source));
        assert_eq!(
            canvas.attach_reflection(source),
            Err(ReflectionError::AlreadyAttached(source))
        );
    }

    #[test]
    fn test_remove_source_drops_reflection() {
        let mut canvas = Canvas::new();
        let source = canvas.add_shape(label(0.0, 0.0));
        let image = canvas.attach_reflection(source).unwrap();
        canvas
            .update_reflection_config(source, ReflectionConfig::enabled(), &Instant)
            .unwrap()
            .unwrap();
        let pending = canvas.reload_reflection(source, &Instant).unwrap().unwrap();

        canvas.remove_shape(source);
        assert!(canvas.document.get_shape(image).is_none());
        assert!(!canvas.has_reflection(source));
        assert!(!canvas.finish_rasterization(pending.block_on()).unwrap());
        assert!(canvas.document.is_empty());
    }

    #[test]
    fn test_remove_linked_member_unlinks_partner() {
        let mut canvas = Canvas::new();
        let straight = canvas.add_shape(label(0.0, 0.0));
        let curved = canvas.add_shape(CurvedText::new(Point::ZERO, TextStyle::new("Label"), 30.0));
        canvas.link_text_pair(straight, curved).unwrap();

        canvas.remove_shape(straight);
        assert!(canvas.document.curved(curved).unwrap().link().is_none());
    }

    #[test]
    fn test_reflection_wrappers_require_engine() {
        let mut canvas = Canvas::new();
        let id = canvas.add_shape(label(0.0, 0.0));
        assert_eq!(canvas.hide_reflection(id), Err(ReflectionError::Detached));
        assert_eq!(canvas.reflection_extent_px(id), Err(ReflectionError::Detached));
        assert!(canvas.detach_reflection(id).is_none());
    }

    #[test]
    fn test_typed_getters() {
        let mut doc = CanvasDocument::new();
        let id = doc.add_shape(label(0.0, 0.0));
        assert!(doc.straight(id).is_ok());
        assert!(matches!(doc.curved(id), Err(SyncError::WrongVariant { .. })));
        assert!(doc.straight_mut(id).is_ok());
        assert!(doc.curved_mut(Uuid::new_v4()).is_err());
    }
}
