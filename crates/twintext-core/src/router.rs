//! Routes low-level node events to the linked-pair and reflection sync entry points.
//!
//! Handlers never propagate errors: a failed sync is logged and the mutation
//! it would have made is dropped, leaving prior state intact.

use crate::canvas::Canvas;
use crate::error::{ReflectionError, SyncError};
use crate::linked::{LinkedTextPair, Propagation};
use crate::raster::{PendingRaster, Rasterizer};
use crate::reflection::PoseKind;
use crate::shapes::{Shape, ShapeId};
use std::collections::HashSet;
use thiserror::Error;

/// Transformer handle driving a transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformHandle {
    /// Middle-left or middle-right handle.
    Side,
    /// Any corner, top or bottom handle.
    Other,
}

impl TransformHandle {
    pub fn is_side(&self) -> bool {
        matches!(self, TransformHandle::Side)
    }
}

/// Events fired on a shape's node by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeEvent {
    /// One drag frame.
    DragMove,
    DragEnd,
    /// One transform frame, with the active handle if known.
    Transform { handle: Option<TransformHandle> },
    TransformEnd,
    /// Text content changed.
    ContentChange,
    /// Font family, size, style or letter spacing changed.
    StyleChange,
    /// Text fill changed.
    FillChange,
    /// Tag background fill changed.
    TagFillChange,
    RotationChange,
}

#[derive(Debug, Error)]
enum RouteError {
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Reflection(#[from] ReflectionError),
}

/// Dispatches node events to the sync components.
pub struct TransformEventRouter<R: Rasterizer> {
    rasterizer: R,
    /// Labels re-wrapped by a side resize during the current transform.
    relaid_out: HashSet<ShapeId>,
}

impl<R: Rasterizer> TransformEventRouter<R> {
    pub fn new(rasterizer: R) -> Self {
        Self {
            rasterizer,
            relaid_out: HashSet::new(),
        }
    }

    pub fn rasterizer(&self) -> &R {
        &self.rasterizer
    }

    /// Handle `event` fired on `target`.
    ///
    /// Returns the rasterization started for `target`'s reflection, if any.
    pub fn dispatch(&mut self, canvas: &mut Canvas, target: ShapeId, event: NodeEvent) -> Option<PendingRaster> {
        match self.route(canvas, target, event) {
            Ok(pending) => pending,
            Err(e) => {
                log::warn!("Dropped {:?} on {}: {}", event, target, e);
                None
            }
        }
    }

    fn route(
        &mut self,
        canvas: &mut Canvas,
        target: ShapeId,
        event: NodeEvent,
    ) -> Result<Option<PendingRaster>, RouteError> {
        if canvas.document.get_shape(target).is_none() {
            return Err(SyncError::UnknownShape(target).into());
        }
        let pair = LinkedTextPair::of(&canvas.document, target);
        let reflected = canvas.has_reflection(target);

        match event {
            NodeEvent::DragMove => {
                if reflected {
                    canvas.sync_reflection_pose(target, PoseKind::Move)?;
                }
                Ok(None)
            }
            NodeEvent::DragEnd => {
                if let Some(pair) = pair {
                    log_skip(target, pair.propagate_pose(&mut canvas.document, target)?);
                }
                if reflected {
                    canvas.sync_reflection_pose(target, PoseKind::Move)?;
                }
                Ok(None)
            }
            NodeEvent::Transform { handle } => {
                if handle.is_some_and(|h| h.is_side()) && self.keep_scale(canvas, target) {
                    self.relaid_out.insert(target);
                }
                if reflected {
                    canvas.sync_reflection_pose(target, PoseKind::Transform)?;
                }
                Ok(None)
            }
            NodeEvent::TransformEnd => {
                let relaid_out = self.relaid_out.remove(&target);
                if let Some(pair) = pair {
                    let step = if relaid_out {
                        pair.sync(&mut canvas.document, target)?.pose
                    } else {
                        pair.propagate_pose(&mut canvas.document, target)?
                    };
                    log_skip(target, step);
                }
                if !reflected {
                    return Ok(None);
                }
                canvas.sync_reflection_pose(target, PoseKind::Transform)?;
                if relaid_out {
                    return Ok(canvas.reload_reflection(target, &self.rasterizer)?);
                }
                Ok(None)
            }
            NodeEvent::ContentChange | NodeEvent::StyleChange | NodeEvent::FillChange => {
                let mut written = None;
                if let Some(pair) = pair {
                    let outcome = pair.sync(&mut canvas.document, target)?;
                    log_skip(target, outcome.style);
                    written = outcome.style.applied().then(|| pair.partner(target)).flatten();
                }
                self.reload(canvas, target, reflected, written)
            }
            NodeEvent::TagFillChange => {
                let mut written = None;
                if let Some(pair) = pair {
                    let step = pair.propagate_tag_fill(&mut canvas.document, target)?;
                    log_skip(target, step);
                    written = step.applied().then(|| pair.partner(target)).flatten();
                }
                self.reload(canvas, target, reflected, written)
            }
            NodeEvent::RotationChange => {
                if let Some(pair) = pair {
                    log_skip(target, pair.propagate_pose(&mut canvas.document, target)?);
                }
                if reflected {
                    canvas.sync_reflection_pose(target, PoseKind::Transform)?;
                }
                Ok(None)
            }
        }
    }

    /// Re-wrap a keep-scale label after a side-handle transform frame.
    fn keep_scale(&self, canvas: &mut Canvas, target: ShapeId) -> bool {
        canvas
            .document
            .get_shape_mut(target)
            .and_then(Shape::as_straight_mut)
            .is_some_and(|label| label.apply_side_resize())
    }

    /// Reload the reflection of `target`, or else of the partner a sync wrote into.
    ///
    /// A partner reflection next to one on `target` is left for the toggle that
    /// reveals it.
    fn reload(
        &self,
        canvas: &mut Canvas,
        target: ShapeId,
        reflected: bool,
        written: Option<ShapeId>,
    ) -> Result<Option<PendingRaster>, RouteError> {
        let source = if reflected {
            target
        } else {
            match written.filter(|&partner| canvas.has_reflection(partner)) {
                Some(partner) => partner,
                None => return Ok(None),
            }
        };
        Ok(canvas.reload_reflection(source, &self.rasterizer)?)
    }

    /// Swap the visible member of `target`'s pair and reload the reflection
    /// that followed it.
    pub fn toggle(&mut self, canvas: &mut Canvas, target: ShapeId) -> Option<PendingRaster> {
        let active = match canvas.toggle_representation(target) {
            Ok(active) => active,
            Err(e) => {
                log::warn!("Toggle of {} dropped: {}", target, e);
                return None;
            }
        };
        if !canvas.has_reflection(active) {
            return None;
        }
        match canvas.reload_reflection(active, &self.rasterizer) {
            Ok(pending) => pending,
            Err(e) => {
                log::warn!("Reflection reload of {} dropped: {}", active, e);
                None
            }
        }
    }

    /// Rotate `target` about its center and route the rotation change.
    pub fn rotate(&mut self, canvas: &mut Canvas, target: ShapeId, degrees: f64) -> Option<PendingRaster> {
        if let Err(e) = canvas.rotate_shape(target, degrees) {
            log::warn!("Rotation of {} dropped: {}", target, e);
            return None;
        }
        self.dispatch(canvas, target, NodeEvent::RotationChange)
    }

    /// Commit the inline edit in progress and route the content change.
    pub fn commit_text(&mut self, canvas: &mut Canvas, text: &str) -> Option<PendingRaster> {
        match canvas.commit_inline_edit(text) {
            Ok(Some(target)) => self.dispatch(canvas, target, NodeEvent::ContentChange),
            Ok(None) => None,
            Err(e) => {
                log::warn!("Inline edit commit dropped: {}", e);
                None
            }
        }
    }
}

fn log_skip(target: ShapeId, step: Propagation) {
    if !step.applied() {
        log::debug!("Sync from {} skipped: {:?}", target, step);
    }
}
