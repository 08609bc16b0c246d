//! Render node state shared by every shape variant.

use kurbo::{Affine, Point, Vec2};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form named attributes persisted with the node.
pub type Attributes = Map<String, Value>;

fn unit_scale() -> Vec2 {
    Vec2::new(1.0, 1.0)
}

fn default_true() -> bool {
    true
}

/// Position, scale and rotation of a node, without its attributes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Point,
    pub scale: Vec2,
    pub rotation_deg: f64,
}

/// The render node a shape exclusively owns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Logical anchor in scene coordinates.
    pub position: Point,
    /// Local scale factors.
    #[serde(default = "unit_scale")]
    pub scale: Vec2,
    /// Rotation in degrees, clockwise, around the anchor.
    #[serde(default)]
    pub rotation_deg: f64,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default = "default_true")]
    pub draggable: bool,
    /// Combined scale of the node's ancestors.
    #[serde(default = "unit_scale")]
    pub parent_scale: Vec2,
    #[serde(default)]
    pub attrs: Attributes,
}

impl Node {
    /// Create a visible, draggable node anchored at `position`.
    pub fn new(position: Point) -> Self {
        Self {
            position,
            scale: unit_scale(),
            rotation_deg: 0.0,
            visible: true,
            draggable: true,
            parent_scale: unit_scale(),
            attrs: Attributes::new(),
        }
    }

    /// Scale after all ancestor transforms are applied.
    pub fn absolute_scale(&self) -> Vec2 {
        Vec2::new(
            self.scale.x * self.parent_scale.x,
            self.scale.y * self.parent_scale.y,
        )
    }

    /// Local-to-scene transform: translate, then rotate, then scale.
    pub fn transform(&self) -> Affine {
        let scale = self.absolute_scale();
        Affine::translate(self.position.to_vec2())
            * Affine::rotate(self.rotation_deg.to_radians())
            * Affine::scale_non_uniform(scale.x, scale.y)
    }

    pub fn pose(&self) -> Pose {
        Pose {
            position: self.position,
            scale: self.scale,
            rotation_deg: self.rotation_deg,
        }
    }

    pub fn set_pose(&mut self, pose: Pose) {
        self.position = pose.position;
        self.scale = pose.scale;
        self.rotation_deg = pose.rotation_deg;
    }

    /// Get a named attribute.
    pub fn attr(&self, key: &str) -> Option<&Value> {
        self.attrs.get(key)
    }

    /// Set a named attribute, replacing any previous value.
    pub fn set_attr(&mut self, key: impl Into<String>, value: Value) {
        self.attrs.insert(key.into(), value);
    }

    pub fn remove_attr(&mut self, key: &str) -> Option<Value> {
        self.attrs.remove(key)
    }

    pub fn show(&mut self) {
        self.visible = true;
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }
}
