//! Camlayer Interaction
//!
//! Turns pointer events on the composited surface into overlay moves.
//! The drag controller only talks to the shared layout store; the render
//! loop picks up each move on its next tick, so the two never reference
//! each other.

pub mod drag;
pub mod pointer;

pub use drag::{DragController, DragState};
pub use pointer::PointerEvent;
