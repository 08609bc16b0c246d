//! Geometry helpers shared by every sync path.

use crate::shapes::Node;
use kurbo::{Affine, Point, Rect};

/// Compute the anchor position that puts `target_rect`'s center on `source_rect`'s center.
///
/// `target_anchor` is the target's logical origin, which may sit away from the
/// origin of its rendered bounding box (text renderers offset glyphs from the
/// anchor). The offset between the two is kept, so applying the result as the
/// target's new position moves its rendered box onto the source's center.
///
/// The anchor delta is signed. An anchor left of or above the box origin gives a
/// negative delta, and using its magnitude would push the target off center by
/// twice that amount.
pub fn align_centers(source_rect: Rect, target_rect: Rect, target_anchor: Point) -> Point {
    let center = source_rect.center();
    let delta = target_anchor - target_rect.origin();
    Point::new(
        center.x - (target_rect.width() / 2.0 - delta.x),
        center.y - (target_rect.height() / 2.0 - delta.y),
    )
}

/// Axis-aligned bounds of `rect` after applying `affine`.
pub fn transformed_bounds(rect: Rect, affine: Affine) -> Rect {
    affine.transform_rect_bbox(rect)
}

/// Set a node's rotation while keeping the center of `local_rect` fixed in scene space.
pub fn rotate_about_center(node: &mut Node, local_rect: Rect, degrees: f64) {
    let local_center = local_rect.center();
    let before = node.transform() * local_center;
    node.rotation_deg = degrees;
    let after = node.transform() * local_center;
    node.position += before - after;
}
