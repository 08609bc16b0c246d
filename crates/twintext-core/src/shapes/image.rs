//! Image shape holding a raster bitmap.

use super::{Node, ShapeId, ShapeTrait};
use crate::raster::Bitmap;
use crate::reflection::ReflectionConfig;
use kurbo::{Point, Rect, Size};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use uuid::Uuid;

/// How an image paints itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Paint {
    /// Blit the bitmap into the image rectangle.
    #[default]
    Bitmap,
    /// Draw the bitmap mirrored below the image rectangle with a fade mask.
    ReflectionMask(ReflectionConfig),
}

/// An image shape that displays a raster bitmap.
#[derive(Debug, Serialize, Deserialize)]
pub struct Image {
    pub(crate) id: ShapeId,
    pub node: Node,
    /// Display size in local units.
    pub size: Size,
    /// Shape this image mirrors, when it is a reflection companion.
    #[serde(default)]
    pub source: Option<ShapeId>,
    /// Latest bitmap. Derived state, regenerated on demand.
    #[serde(skip)]
    bitmap: Option<Bitmap>,
    #[serde(skip)]
    paint: Paint,
    /// Last painted frame, kept by the renderer until the image changes.
    #[serde(skip)]
    cached_frame: RwLock<Option<Bitmap>>,
}

impl Clone for Image {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            node: self.node.clone(),
            size: self.size,
            source: self.source,
            bitmap: self.bitmap.clone(),
            paint: self.paint.clone(),
            // Clone the cached frame, not the lock
            cached_frame: RwLock::new(self.cached_frame()),
        }
    }
}

impl Image {
    /// Create an empty image shape.
    pub fn new(position: Point, size: Size) -> Self {
        Self {
            id: Uuid::new_v4(),
            node: Node::new(position),
            size,
            source: None,
            bitmap: None,
            paint: Paint::default(),
            cached_frame: RwLock::new(None),
        }
    }

    /// Create a hidden, non-draggable image ready to become a reflection companion.
    pub fn companion() -> Self {
        let mut image = Self::new(Point::ZERO, Size::ZERO);
        image.node.visible = false;
        image.node.draggable = false;
        image
    }

    /// Create an image displaying `bitmap` at its pixel size.
    pub fn from_bitmap(position: Point, bitmap: Bitmap) -> Self {
        let mut image = Self::new(position, Size::new(bitmap.width as f64, bitmap.height as f64));
        image.bitmap = Some(bitmap);
        image
    }

    pub fn bitmap(&self) -> Option<&Bitmap> {
        self.bitmap.as_ref()
    }

    /// Install a new bitmap and drop the cached frame.
    pub fn set_bitmap(&mut self, bitmap: Bitmap) {
        self.bitmap = Some(bitmap);
        self.clear_cache();
    }

    /// Drop the bitmap, so the next show has to rasterize.
    pub fn clear_bitmap(&mut self) {
        self.bitmap = None;
        self.clear_cache();
    }

    pub fn paint(&self) -> &Paint {
        &self.paint
    }

    /// Replace the paint routine and drop the cached frame.
    pub fn set_paint(&mut self, paint: Paint) {
        self.paint = paint;
        self.clear_cache();
    }

    /// Area the paint routine draws into, in local coordinates.
    pub fn paint_rect(&self) -> Rect {
        match &self.paint {
            Paint::Bitmap => self.local_rect(),
            Paint::ReflectionMask(config) => {
                let height = self.size.height;
                let bottom = height + height * config.reflect_height_ratio + config.offset_px;
                Rect::new(0.0, 0.0, self.size.width, bottom)
            }
        }
    }

    /// Get the cached frame, if the renderer stored one.
    pub fn cached_frame(&self) -> Option<Bitmap> {
        self.cached_frame.read().ok().and_then(|guard| guard.clone())
    }

    /// Store the painted frame. Uses interior mutability so this can be called while rendering.
    pub fn set_cached_frame(&self, frame: Bitmap) {
        if let Ok(mut cache) = self.cached_frame.write() {
            *cache = Some(frame);
        }
    }

    /// Drop the cached frame (call when the bitmap, paint or size changes).
    pub fn clear_cache(&self) {
        if let Ok(mut cache) = self.cached_frame.write() {
            *cache = None;
        }
    }
}

impl ShapeTrait for Image {
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
        self.size.to_rect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_companion_defaults() {
        let image = Image::companion();
        assert!(!image.node.visible);
        assert!(!image.node.draggable);
        assert!(image.bitmap().is_none());
        assert_eq!(image.paint(), &Paint::Bitmap);
    }

    #[test]
    fn test_bounds() {
        let image = Image::new(Point::new(10.0, 20.0), Size::new(100.0, 50.0));
        let bounds = image.client_rect();
        assert!((bounds.x0 - 10.0).abs() < f64::EPSILON);
        assert!((bounds.y0 - 20.0).abs() < f64::EPSILON);
        assert!((bounds.x1 - 110.0).abs() < f64::EPSILON);
        assert!((bounds.y1 - 70.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_set_bitmap_clears_cache() {
        let mut image = Image::from_bitmap(Point::ZERO, Bitmap::transparent(2, 2));
        image.set_cached_frame(Bitmap::transparent(2, 2));
        assert!(image.cached_frame().is_some());

        image.set_bitmap(Bitmap::transparent(4, 4));
        assert!(image.cached_frame().is_none());
    }

    #[test]
    fn test_reflection_paint_rect() {
        let mut image = Image::new(Point::ZERO, Size::new(200.0, 50.0));
        let config = ReflectionConfig {
            enabled: true,
            opacity: 0.5,
            offset_px: 1.0,
            reflect_height_ratio: 0.6,
        };
        image.set_paint(Paint::ReflectionMask(config));
        let rect = image.paint_rect();
        assert!((rect.y1 - 81.0).abs() < 1e-9);
        assert!((rect.width() - 200.0).abs() < f64::EPSILON);
    }
}
