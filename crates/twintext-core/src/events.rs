//! Domain events announced to the host.
//!
//! The core only publishes; the host drains the channel and forwards events
//! to whatever bus it uses.

use crate::shapes::{ShapeId, ShapeKind};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Events published by the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    /// A text shape was double-clicked and entered inline editing.
    TextDoubleClicked { id: ShapeId },
    /// The content of a text shape changed.
    TextContentChanged {
        id: ShapeId,
        kind: ShapeKind,
        text: String,
    },
    /// A shape was rotated about its center.
    ShapeRotated { id: ShapeId, degrees: f64 },
    /// The visible member of a linked pair changed.
    RepresentationToggled { active: ShapeId, hidden: ShapeId },
}

/// Outgoing queue of domain events.
#[derive(Debug, Clone, Default)]
pub struct EventChannel {
    queue: VecDeque<DomainEvent>,
}

impl EventChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&mut self, event: DomainEvent) {
        log::trace!("Publishing {:?}", event);
        self.queue.push_back(event);
    }

    /// Take every queued event, oldest first.
    pub fn drain(&mut self) -> Vec<DomainEvent> {
        self.queue.drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }
}
