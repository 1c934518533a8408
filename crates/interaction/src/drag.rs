//! Drag-and-drop state machine for placed overlays.
//!
//! ```text
//!            down on overlay
//!   Idle ───────────────────────▶ Dragging { target, grab }
//!    ▲                               │   ▲
//!    │         up / leave            │   │ move: origin = p - grab
//!    └───────────────────────────────┘   └──┘
//! ```
//!
//! Hit-testing walks from the last inserted overlay to the first so the
//! overlay drawn on top is the one picked up. Moves are never clamped to
//! the surface.

use camlayer_layout_model::{GrabOffset, LayoutHandle, Point};

use crate::pointer::PointerEvent;

/// Current state of the drag controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragState {
    Idle,
    Dragging {
        /// Index of the grabbed overlay in the layout store.
        target: usize,
        /// Pointer position minus the overlay origin at grab time.
        grab: GrabOffset,
    },
}

/// Applies pointer events to the shared layout store.
#[derive(Debug)]
pub struct DragController {
    layout: LayoutHandle,
    state: DragState,
}

impl DragController {
    pub fn new(layout: LayoutHandle) -> Self {
        Self {
            layout,
            state: DragState::Idle,
        }
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    /// Feed one pointer event. Returns `true` when the layout was mutated.
    pub fn handle(&mut self, event: PointerEvent) -> bool {
        match event {
            PointerEvent::Down { x, y } => {
                self.pointer_down(Point::new(x, y));
                false
            }
            PointerEvent::Move { x, y } => self.pointer_move(Point::new(x, y)),
            PointerEvent::Up | PointerEvent::Leave => {
                self.release();
                false
            }
        }
    }

    /// Grab the top-most overlay under `p`, if any.
    pub fn pointer_down(&mut self, p: Point) {
        self.state = match self.layout.hit_test(p) {
            Some((target, rect)) => {
                let grab = p.offset_from(rect.origin());
                tracing::debug!(target, dx = grab.dx, dy = grab.dy, "Drag started");
                DragState::Dragging { target, grab }
            }
            None => DragState::Idle,
        };
    }

    /// Move the grabbed overlay so the grab offset is preserved.
    pub fn pointer_move(&mut self, p: Point) -> bool {
        let DragState::Dragging { target, grab } = self.state else {
            return false;
        };

        if self.layout.move_to(target, p - grab) {
            true
        } else {
            // The store was cleared underneath us.
            tracing::debug!(target, "Drag target vanished; releasing");
            self.state = DragState::Idle;
            false
        }
    }

    /// End any drag in progress.
    pub fn release(&mut self) {
        if let DragState::Dragging { target, .. } = self.state {
            tracing::debug!(target, "Drag ended");
        }
        self.state = DragState::Idle;
    }
}
