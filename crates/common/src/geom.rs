//! Planar helpers on top of `glam::Vec2`.
//!
//! Construction and arithmetic (add/sub/scale/length/normalize) come from
//! glam directly; this module adds the angle-driven placement used by
//! plant growth.

use glam::Vec2;

/// Unit vector pointing along `angle` (radians, counter-clockwise from +x).
pub fn heading(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}

/// `origin` moved `distance` along `angle`.
pub fn offset_along(origin: Vec2, angle: f32, distance: f32) -> Vec2 {
    origin + heading(angle) * distance
}

/// `count` angles spread evenly and symmetrically around `base`,
/// `spread` radians apart. A single angle is `base` itself.
pub fn fan(base: f32, count: usize, spread: f32) -> Vec<f32> {
    let mid = (count as f32 - 1.0) / 2.0;
    (0..count)
        .map(|i| base + spread * (i as f32 - mid))
        .collect()
}
