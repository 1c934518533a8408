//! Camlayer Layout Model
//!
//! Defines the data contracts for composited overlays:
//! - **Geometry:** Points, grab offsets, and rectangles in surface pixels
//! - **Overlay:** Immutable decoded rasters shared by handle
//! - **Placement:** The append-only flow layout for newly added overlays
//! - **Store:** The ordered overlay list and the shared handle every
//!   component reads and mutates
//!
//! Insertion order is z-order: later entries are drawn on top and win
//! hit-tests.

pub mod geometry;
pub mod overlay;
pub mod placement;
pub mod store;

pub use geometry::*;
pub use overlay::*;
pub use placement::*;
pub use store::*;
