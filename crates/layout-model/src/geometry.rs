//! Geometry types for overlay placement and dragging.
//!
//! All coordinates are surface pixels with `(0.0, 0.0)` at the top-left.
//! Nothing here clamps to the surface: overlays may sit partially or
//! entirely off-surface.

use std::ops::Sub;

use serde::{Deserialize, Serialize};

/// A point in surface pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Offset of this point from `origin`.
    pub fn offset_from(&self, origin: Point) -> GrabOffset {
        GrabOffset {
            dx: self.x - origin.x,
            dy: self.y - origin.y,
        }
    }
}

/// Distance between the pointer and the origin of the rectangle it grabbed.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GrabOffset {
    pub dx: f64,
    pub dy: f64,
}

impl Sub<GrabOffset> for Point {
    type Output = Point;

    fn sub(self, offset: GrabOffset) -> Point {
        Point {
            x: self.x - offset.dx,
            y: self.y - offset.dy,
        }
    }
}

/// An axis-aligned rectangle in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Top-left corner.
    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Right edge.
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge.
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Whether `p` lies inside the rectangle. Edges count as inside.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    /// Same size, new top-left corner.
    pub fn with_origin(&self, origin: Point) -> Rect {
        Rect {
            x: origin.x,
            y: origin.y,
            ..*self
        }
    }

    /// Both dimensions strictly positive and finite.
    pub fn has_area(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    /// Integer pixel size used when rasterizing, never below 1x1.
    pub fn pixel_size(&self) -> (u32, u32) {
        (
            self.width.round().max(1.0) as u32,
            self.height.round().max(1.0) as u32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_is_edge_inclusive() {
        let r = Rect::new(10.0, 20.0, 30.0, 40.0);
        assert!(r.contains(Point::new(10.0, 20.0)));
        assert!(r.contains(Point::new(40.0, 60.0)));
        assert!(r.contains(Point::new(25.0, 30.0)));
        assert!(!r.contains(Point::new(9.99, 30.0)));
        assert!(!r.contains(Point::new(25.0, 60.01)));
    }

    #[test]
    fn test_grab_offset_round_trips() {
        let origin = Point::new(100.0, 50.0);
        let pointer = Point::new(130.5, 72.25);
        let grab = pointer.offset_from(origin);
        assert_eq!(grab, GrabOffset { dx: 30.5, dy: 22.25 });
        assert_eq!(pointer - grab, origin);
    }

    #[test]
    fn test_with_origin_keeps_size() {
        let r = Rect::new(0.0, 0.0, 200.0, 150.0).with_origin(Point::new(-50.0, 900.0));
        assert_eq!(r, Rect::new(-50.0, 900.0, 200.0, 150.0));
    }

    #[test]
    fn test_pixel_size_never_zero() {
        assert_eq!(Rect::new(0.0, 0.0, 0.2, 149.6).pixel_size(), (1, 150));
        assert_eq!(Rect::new(0.0, 0.0, 266.67, 200.0).pixel_size(), (267, 200));
    }

    #[test]
    fn test_has_area() {
        assert!(Rect::new(0.0, 0.0, 1.0, 1.0).has_area());
        assert!(!Rect::new(0.0, 0.0, 0.0, 1.0).has_area());
        assert!(!Rect::new(0.0, 0.0, f64::NAN, 1.0).has_area());
    }
}
