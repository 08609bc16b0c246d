//! Text style shared by both text representations.

use super::SerializableColor;
use serde::{Deserialize, Serialize};

/// Font style options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    #[default]
    Normal,
    Bold,
    Italic,
    #[serde(rename = "bold italic")]
    BoldItalic,
}

impl FontStyle {
    /// Average glyph advance as a fraction of the font size.
    /// Empirical approximations; the renderer refines them when it lays text out.
    pub fn advance_factor(&self) -> f64 {
        match self {
            FontStyle::Normal => 0.55,
            FontStyle::Bold => 0.60,
            FontStyle::Italic => 0.52,
            FontStyle::BoldItalic => 0.58,
        }
    }
}

/// Content and style attributes copied verbatim between linked representations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    pub font_family: String,
    pub font_size: f64,
    #[serde(default)]
    pub font_style: FontStyle,
    pub fill: SerializableColor,
    #[serde(default)]
    pub letter_spacing: f64,
    /// Unformatted source text.
    #[serde(rename = "orgText")]
    pub original_text: String,
}

impl TextStyle {
    /// Default font size in pixels.
    pub const DEFAULT_FONT_SIZE: f64 = 24.0;

    pub fn new(text: impl Into<String>) -> Self {
        Self {
            font_family: "Arial".to_string(),
            font_size: Self::DEFAULT_FONT_SIZE,
            font_style: FontStyle::default(),
            fill: SerializableColor::black(),
            letter_spacing: 0.0,
            original_text: text.into(),
        }
    }

    pub fn with_font_size(mut self, size: f64) -> Self {
        self.font_size = size;
        self
    }

    pub fn with_font_family(mut self, family: impl Into<String>) -> Self {
        self.font_family = family.into();
        self
    }

    pub fn with_fill(mut self, fill: SerializableColor) -> Self {
        self.fill = fill;
        self
    }

    /// Approximate advance of a run of `chars` glyphs.
    pub fn run_width(&self, chars: usize) -> f64 {
        chars as f64 * (self.font_size * self.font_style.advance_factor() + self.letter_spacing)
    }
}
