//! Camlayer Compositor
//!
//! Draws the live camera frame and every placed overlay onto a single
//! surface, once per render tick, and publishes the result as the
//! surface's capture stream.
//!
//! # Pipeline Architecture
//!
//! ```text
//! camera (latest frame) ──┐
//!                         ├── Clear ── Video (scale to fill) ── Overlays (z-order)
//! layout snapshot ────────┘                                          │
//!                                                                    ▼
//!                                                           Surface::present
//!                                                                    │
//!                                                                    ▼
//!                                                   SurfaceStream (capture stream)
//! ```
//!
//! The recorder consumes the [`SurfaceStream`], so a recording carries
//! exactly what was rendered and never the raw camera feed.

pub mod compositor;
pub mod frame;
pub mod render_loop;
pub mod surface;

pub use compositor::Compositor;
pub use frame::{ComposedFrame, VideoFrame};
pub use render_loop::RenderLoop;
pub use surface::{Surface, SurfaceStream};
