//! Reflection engine: keeps one companion image mirroring a source shape.

use super::ReflectionConfig;
use crate::canvas::CanvasDocument;
use crate::error::ReflectionError;
use crate::geometry;
use crate::raster::{PendingRaster, RasterCompletion, Rasterizer, ShapeSnapshot};
use crate::shapes::{Image, Paint, Shape, ShapeId, ShapeTrait};

/// Lifecycle of a reflection engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReflectionState {
    /// Not bound to a source and companion.
    #[default]
    Unattached,
    /// Bound, companion not shown.
    Hidden,
    /// Waiting for a rasterization to complete.
    Rendering,
    /// Companion shows the latest bitmap.
    Synced,
}

/// Which parts of the pose a lightweight sync refreshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoseKind {
    /// Position only (drag frames).
    Move,
    /// Position, scale and rotation (transform frames).
    Transform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Binding {
    source: ShapeId,
    image: ShapeId,
}

/// Owns a reflection config and the companion image it drives.
#[derive(Debug, Clone, Default)]
pub struct ReflectionEngine {
    binding: Option<Binding>,
    config: ReflectionConfig,
    state: ReflectionState,
    /// Sequence number of the latest rasterization request.
    latest_seq: u64,
}

impl ReflectionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ReflectionState {
        self.state
    }

    pub fn config(&self) -> &ReflectionConfig {
        &self.config
    }

    pub fn is_attached(&self) -> bool {
        self.binding.is_some()
    }

    pub fn source(&self) -> Option<ShapeId> {
        self.binding.map(|b| b.source)
    }

    pub fn image(&self) -> Option<ShapeId> {
        self.binding.map(|b| b.image)
    }

    pub fn latest_seq(&self) -> u64 {
        self.latest_seq
    }

    fn binding(&self) -> Result<Binding, ReflectionError> {
        self.binding.ok_or(ReflectionError::Detached)
    }

    /// Bind the engine to `source` and the companion `image`.
    ///
    /// The config is read back from the source's attribute bag. The image is
    /// stacked directly beneath the source, made non-draggable and hidden.
    pub fn attach(
        &mut self,
        doc: &mut CanvasDocument,
        source: ShapeId,
        image: ShapeId,
    ) -> Result<(), ReflectionError> {
        if let Some(binding) = self.binding {
            return Err(ReflectionError::AlreadyAttached(binding.source));
        }
        let source_shape = doc
            .get_shape(source)
            .ok_or(ReflectionError::UnknownShape(source))?;
        if source_shape.as_syncable().is_none() {
            return Err(ReflectionError::UnsupportedSource(source));
        }
        if doc.companion_of(source).is_some_and(|existing| existing != image) {
            return Err(ReflectionError::AlreadyAttached(source));
        }
        let config = ReflectionConfig::from_node(source_shape.node());
        let companion = doc
            .get_shape_mut(image)
            .ok_or(ReflectionError::UnknownShape(image))?
            .as_image_mut()
            .ok_or(ReflectionError::NotAnImage(image))?;
        companion.source = Some(source);
        companion.node.draggable = false;
        companion.node.hide();

        doc.register_companion(source, image);

        self.binding = Some(Binding { source, image });
        self.config = config;
        self.state = ReflectionState::Hidden;
        log::debug!("Attached reflection {} to {}", image, source);
        Ok(())
    }

    /// Move the binding to `source`, handing it the companion and the config.
    ///
    /// The companion is hidden and its bitmap dropped; the next `show` or
    /// `reload` rasterizes the new source. A completion still in flight for the
    /// previous source is dropped by [`ReflectionEngine::finish`].
    pub fn retarget(&mut self, doc: &mut CanvasDocument, source: ShapeId) -> Result<(), ReflectionError> {
        let binding = self.binding()?;
        if binding.source == source {
            return Ok(());
        }
        let target = doc
            .get_shape(source)
            .ok_or(ReflectionError::UnknownShape(source))?;
        if target.as_syncable().is_none() {
            return Err(ReflectionError::UnsupportedSource(source));
        }
        if doc.companion_of(source).is_some() {
            return Err(ReflectionError::AlreadyAttached(source));
        }

        let image = companion_mut(doc, binding.image)?;
        image.source = Some(source);
        image.node.hide();
        image.clear_bitmap();
        doc.move_companion(binding.source, source);

        if let Some(previous) = doc.get_shape_mut(binding.source) {
            previous.node_mut().remove_attr(ReflectionConfig::ATTR_KEY);
        }
        if let Some(next) = doc.get_shape_mut(source) {
            self.config.persist(next.node_mut());
        }

        log::debug!(
            "Moved reflection {} from {} to {}",
            binding.image,
            binding.source,
            source
        );
        self.binding = Some(Binding {
            source,
            image: binding.image,
        });
        self.state = ReflectionState::Hidden;
        Ok(())
    }

    /// Show the reflection, rasterizing the source when no bitmap is installed yet.
    ///
    /// The companion stays hidden while the source itself is hidden.
    /// Returns the pending request when a rasterization was started; feed its
    /// completion to [`ReflectionEngine::finish`].
    pub fn show(
        &mut self,
        doc: &mut CanvasDocument,
        rasterizer: &dyn Rasterizer,
    ) -> Result<Option<PendingRaster>, ReflectionError> {
        let binding = self.binding()?;
        if !self.config.enabled || !source_visible(doc, binding)? {
            self.hide(doc)?;
            return Ok(None);
        }
        let config = self.config.clone();
        let image = companion_mut(doc, binding.image)?;
        image.node.show();
        if image.bitmap().is_some() && self.state != ReflectionState::Rendering {
            image.set_paint(Paint::ReflectionMask(config));
            self.state = ReflectionState::Synced;
            self.sync_pose(doc, PoseKind::Transform)?;
            return Ok(None);
        }
        self.request(doc, binding, rasterizer).map(Some)
    }

    /// Hide the companion. The bitmap is kept so `show` can resume without rasterizing.
    pub fn hide(&mut self, doc: &mut CanvasDocument) -> Result<(), ReflectionError> {
        let binding = self.binding()?;
        companion_mut(doc, binding.image)?.node.hide();
        self.state = ReflectionState::Hidden;
        Ok(())
    }

    /// Rasterize the source again, then show or hide according to the config.
    ///
    /// A hidden source is still rasterized, but its companion stays hidden.
    pub fn reload(
        &mut self,
        doc: &mut CanvasDocument,
        rasterizer: &dyn Rasterizer,
    ) -> Result<Option<PendingRaster>, ReflectionError> {
        let binding = self.binding()?;
        if !self.config.enabled {
            self.hide(doc)?;
            return Ok(None);
        }
        let visible = source_visible(doc, binding)?;
        let image = companion_mut(doc, binding.image)?;
        if visible {
            image.node.show();
        } else {
            image.node.hide();
        }
        self.request(doc, binding, rasterizer).map(Some)
    }

    /// Snapshot the source with rotation zeroed and start a rasterization.
    fn request(
        &mut self,
        doc: &mut CanvasDocument,
        binding: Binding,
        rasterizer: &dyn Rasterizer,
    ) -> Result<PendingRaster, ReflectionError> {
        let source = doc
            .get_shape_mut(binding.source)
            .ok_or(ReflectionError::UnknownShape(binding.source))?;
        let pose = source.node().pose();
        if let Some(rotatable) = source.as_rotatable_mut() {
            rotatable.rotate_about_center(0.0);
        }
        let snapshot = ShapeSnapshot::capture(source);
        source.node_mut().set_pose(pose);

        self.latest_seq += 1;
        self.state = ReflectionState::Rendering;
        log::debug!(
            "Rasterizing {} for reflection (request {})",
            binding.source,
            self.latest_seq
        );
        Ok(PendingRaster::new(
            binding.source,
            self.latest_seq,
            rasterizer.rasterize(snapshot),
        ))
    }

    /// Apply a finished rasterization.
    ///
    /// Returns `Ok(false)` when the completion is dropped: the engine was
    /// detached, the completion belongs to another source, a newer request is
    /// outstanding, or rasterization failed.
    pub fn finish(
        &mut self,
        doc: &mut CanvasDocument,
        completion: RasterCompletion,
    ) -> Result<bool, ReflectionError> {
        let Some(binding) = self.binding else {
            log::debug!("Dropping rasterization {} after detach", completion.seq);
            return Ok(false);
        };
        if completion.source != binding.source || completion.seq != self.latest_seq {
            log::debug!(
                "Dropping stale rasterization {} (latest {})",
                completion.seq,
                self.latest_seq
            );
            return Ok(false);
        }
        let bitmap = match completion.result {
            Ok(bitmap) => bitmap,
            Err(e) => {
                log::warn!("Rasterization of {} failed: {}", binding.source, e);
                let has_bitmap = companion_mut(doc, binding.image)?.bitmap().is_some();
                self.state = self.settled_state(doc, binding, has_bitmap);
                return Ok(false);
            }
        };

        let source = doc
            .get_shape(binding.source)
            .ok_or(ReflectionError::UnknownShape(binding.source))?;
        let footprint = source.local_rect();
        let pose = source.node().pose();
        let scale = source.node().absolute_scale();

        let config = self.config.clone();
        let image = companion_mut(doc, binding.image)?;
        image.size = footprint.size();
        image.node.position = pose.position;
        image.node.scale = scale;
        image.node.rotation_deg = pose.rotation_deg;
        image.clear_cache();
        image.set_bitmap(bitmap);
        image.set_paint(Paint::ReflectionMask(config));

        self.state = self.settled_state(doc, binding, true);
        self.sync_pose(doc, PoseKind::Move)?;
        Ok(true)
    }

    fn settled_state(&self, doc: &CanvasDocument, binding: Binding, has_bitmap: bool) -> ReflectionState {
        let visible = doc.get_shape(binding.image).is_some_and(Shape::is_visible);
        if visible && has_bitmap {
            ReflectionState::Synced
        } else {
            ReflectionState::Hidden
        }
    }

    /// Reposition the companion under the source without rasterizing.
    ///
    /// `Transform` additionally copies scale and rotation.
    pub fn sync_pose(&mut self, doc: &mut CanvasDocument, kind: PoseKind) -> Result<(), ReflectionError> {
        let binding = self.binding()?;
        let source = doc
            .get_shape(binding.source)
            .ok_or(ReflectionError::UnknownShape(binding.source))?;
        let source_rect = source.client_rect();
        let scale = source.node().absolute_scale();
        let rotation = source.node().rotation_deg;

        let image = companion_mut(doc, binding.image)?;
        if kind == PoseKind::Transform {
            image.node.scale = scale;
            image.node.rotation_deg = rotation;
        }
        image.node.position =
            geometry::align_centers(source_rect, image.client_rect(), image.node.position);
        Ok(())
    }

    /// Replace the config, persist it on the source and reload.
    ///
    /// An invalid config is rejected and the previous one kept.
    pub fn update_config(
        &mut self,
        doc: &mut CanvasDocument,
        next: ReflectionConfig,
        rasterizer: &dyn Rasterizer,
    ) -> Result<Option<PendingRaster>, ReflectionError> {
        let binding = self.binding()?;
        next.validate()?;
        let source = doc
            .get_shape_mut(binding.source)
            .ok_or(ReflectionError::UnknownShape(binding.source))?;
        next.persist(source.node_mut());
        self.config = next;
        self.reload(doc, rasterizer)
    }

    /// Vertical space the reflection occupies below the source, in scene pixels.
    pub fn reflection_extent_px(&self, doc: &CanvasDocument) -> Result<f64, ReflectionError> {
        let binding = self.binding()?;
        let source = doc
            .get_shape(binding.source)
            .ok_or(ReflectionError::UnknownShape(binding.source))?;
        let height = source.local_rect().height() * source.node().absolute_scale().y;
        Ok(height * self.config.reflect_height_ratio + self.config.offset_px)
    }

    /// Unbind the engine and remove the companion from the document.
    ///
    /// Safe while a rasterization is in flight: its completion becomes a no-op.
    pub fn detach(&mut self, doc: &mut CanvasDocument) -> Option<Shape> {
        let binding = self.binding.take()?;
        self.state = ReflectionState::Unattached;
        log::debug!("Detached reflection {} from {}", binding.image, binding.source);
        doc.remove_shape(binding.image)
    }
}

fn source_visible(doc: &CanvasDocument, binding: Binding) -> Result<bool, ReflectionError> {
    doc.get_shape(binding.source)
        .map(Shape::is_visible)
        .ok_or(ReflectionError::UnknownShape(binding.source))
}

fn companion_mut(doc: &mut CanvasDocument, id: ShapeId) -> Result<&mut Image, ReflectionError> {
    doc.get_shape_mut(id)
        .ok_or(ReflectionError::UnknownShape(id))?
        .as_image_mut()
        .ok_or(ReflectionError::NotAnImage(id))
}
