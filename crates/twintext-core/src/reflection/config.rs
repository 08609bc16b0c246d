//! Reflection configuration, persisted on the source node's attribute bag.

use crate::error::ConfigError;
use crate::shapes::Node;
use serde::{Deserialize, Serialize};

/// Settings for a reflection companion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReflectionConfig {
    /// Whether the reflection is shown.
    #[serde(rename = "isReflect")]
    pub enabled: bool,
    /// Global alpha applied to the mirrored bitmap, in [0, 1].
    pub opacity: f64,
    /// Gap between the source's footprint and the reflection, in pixels.
    #[serde(rename = "offset")]
    pub offset_px: f64,
    /// Fraction of the source height that is mirrored, in (0, 1].
    #[serde(rename = "reflectHeight")]
    pub reflect_height_ratio: f64,
}

impl Default for ReflectionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            opacity: 1.0,
            offset_px: 1.0,
            reflect_height_ratio: 1.0,
        }
    }
}

impl ReflectionConfig {
    /// Attribute key the config is stored under.
    pub const ATTR_KEY: &'static str = "reflection";

    /// Enabled config with default opacity, offset and height.
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_offset(mut self, offset_px: f64) -> Self {
        self.offset_px = offset_px;
        self
    }

    pub fn with_height_ratio(mut self, ratio: f64) -> Self {
        self.reflect_height_ratio = ratio;
        self
    }

    /// Check every field is within its allowed range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(ConfigError::Opacity(self.opacity));
        }
        if !self.offset_px.is_finite() || self.offset_px < 0.0 {
            return Err(ConfigError::Offset(self.offset_px));
        }
        if !(self.reflect_height_ratio > 0.0 && self.reflect_height_ratio <= 1.0) {
            return Err(ConfigError::HeightRatio(self.reflect_height_ratio));
        }
        Ok(())
    }

    /// Read the config stored on `node`, filling missing keys with defaults.
    ///
    /// A missing, malformed or out-of-range bag yields the default config.
    pub fn from_node(node: &Node) -> Self {
        let Some(value) = node.attr(Self::ATTR_KEY) else {
            return Self::default();
        };
        match serde_json::from_value::<Self>(value.clone()) {
            Ok(config) if config.validate().is_ok() => config,
            Ok(config) => {
                log::warn!("Ignoring out-of-range reflection config: {:?}", config);
                Self::default()
            }
            Err(e) => {
                log::warn!("Ignoring malformed reflection config: {}", e);
                Self::default()
            }
        }
    }

    /// Write the config onto `node`'s attribute bag.
    pub fn persist(&self, node: &mut Node) {
        match serde_json::to_value(self) {
            Ok(value) => node.set_attr(Self::ATTR_KEY, value),
            Err(e) => log::error!("Failed to serialize reflection config: {}", e),
        }
    }
}
