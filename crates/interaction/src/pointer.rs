//! Pointer events in surface coordinates.

use camlayer_layout_model::Point;
use serde::{Deserialize, Serialize};

/// A pointer event already mapped into surface pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PointerEvent {
    /// Primary button pressed.
    Down { x: f64, y: f64 },
    /// Pointer moved.
    Move { x: f64, y: f64 },
    /// Primary button released.
    Up,
    /// Pointer left the surface.
    Leave,
}

impl PointerEvent {
    pub fn down(p: Point) -> Self {
        Self::Down { x: p.x, y: p.y }
    }

    pub fn moved(p: Point) -> Self {
        Self::Move { x: p.x, y: p.y }
    }

    /// Pointer position carried by the event, if any.
    pub fn position(&self) -> Option<Point> {
        match *self {
            Self::Down { x, y } | Self::Move { x, y } => Some(Point::new(x, y)),
            Self::Up | Self::Leave => None,
        }
    }

    /// Map a position given relative to the page into surface coordinates,
    /// where `surface_origin` is the surface's top-left corner on the page.
    pub fn relative_to(self, surface_origin: Point) -> Self {
        match self {
            Self::Down { x, y } => Self::Down {
                x: x - surface_origin.x,
                y: y - surface_origin.y,
            },
            Self::Move { x, y } => Self::Move {
                x: x - surface_origin.x,
                y: y - surface_origin.y,
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_to_shifts_positions_only() {
        let origin = Point::new(8.0, 60.0);
        assert_eq!(
            PointerEvent::Down { x: 108.0, y: 160.0 }.relative_to(origin),
            PointerEvent::Down { x: 100.0, y: 100.0 }
        );
        assert_eq!(PointerEvent::Up.relative_to(origin), PointerEvent::Up);
    }

    #[test]
    fn test_serializes_with_type_tag() {
        let json = serde_json::to_string(&PointerEvent::Move { x: 1.0, y: 2.0 }).unwrap();
        assert_eq!(json, r#"{"type":"move","x":1.0,"y":2.0}"#);
    }
}
