//! The ordered overlay store and its shared handle.
//!
//! [`LayoutStore`] keeps each overlay and its rectangle together in one
//! entry, so the image list and the position list can never disagree in
//! length or order. [`LayoutHandle`] is the single shared owner: image
//! uploads, the drag controller, and the render loop all hold clones of
//! the same handle. Every mutation is one write-lock section and every
//! read for rendering is one read-lock snapshot, so a reader never sees
//! a rectangle with only one coordinate updated.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use camlayer_common::config::LayoutConfig;

use crate::geometry::{Point, Rect};
use crate::overlay::OverlayImage;
use crate::placement::place;

/// One placed overlay.
#[derive(Debug, Clone)]
pub struct LayoutEntry {
    pub image: OverlayImage,
    pub rect: Rect,
}

/// Overlays in insertion (= z) order.
#[derive(Debug, Clone, Default)]
pub struct LayoutStore {
    entries: Vec<LayoutEntry>,
}

impl LayoutStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[LayoutEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&LayoutEntry> {
        self.entries.get(index)
    }

    /// Current rectangle of the most recently inserted overlay.
    pub fn last_rect(&self) -> Option<Rect> {
        self.entries.last().map(|entry| entry.rect)
    }

    /// Place `image` with the flow layout and append it. Returns its index
    /// and rectangle.
    pub fn add(
        &mut self,
        image: OverlayImage,
        surface_width: f64,
        surface_height: f64,
        config: &LayoutConfig,
    ) -> (usize, Rect) {
        let rect = place(&image, self, surface_width, surface_height, config);
        self.entries.push(LayoutEntry { image, rect });
        (self.entries.len() - 1, rect)
    }

    /// Index of the top-most overlay containing `p`.
    pub fn hit_test(&self, p: Point) -> Option<usize> {
        self.entries
            .iter()
            .rposition(|entry| entry.rect.contains(p))
    }

    /// Move an overlay without changing its size. Returns `false` when the
    /// index no longer exists.
    pub fn set_origin(&mut self, index: usize, origin: Point) -> bool {
        match self.entries.get_mut(index) {
            Some(entry) => {
                entry.rect = entry.rect.with_origin(origin);
                true
            }
            None => false,
        }
    }

    /// Remove every overlay. Returns how many were removed.
    pub fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        removed
    }
}

/// A point-in-time copy of the store for one render tick.
///
/// Rasters are shared, so taking a snapshot only copies handles and
/// rectangles.
#[derive(Debug, Clone, Default)]
pub struct LayoutSnapshot {
    entries: Vec<LayoutEntry>,
}

impl LayoutSnapshot {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in draw order.
    pub fn iter(&self) -> std::slice::Iter<'_, LayoutEntry> {
        self.entries.iter()
    }

    pub fn rects(&self) -> Vec<Rect> {
        self.entries.iter().map(|entry| entry.rect).collect()
    }
}

impl<'a> IntoIterator for &'a LayoutSnapshot {
    type Item = &'a LayoutEntry;
    type IntoIter = std::slice::Iter<'a, LayoutEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Shared handle to the session's single layout store.
#[derive(Debug, Clone, Default)]
pub struct LayoutHandle {
    inner: Arc<RwLock<LayoutStore>>,
}

impl LayoutHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy the current entries for rendering.
    pub fn snapshot(&self) -> LayoutSnapshot {
        LayoutSnapshot {
            entries: self.read().entries.clone(),
        }
    }

    /// Place and append an overlay in one step.
    pub fn add(
        &self,
        image: OverlayImage,
        surface_width: f64,
        surface_height: f64,
        config: &LayoutConfig,
    ) -> (usize, Rect) {
        let id = image.id();
        let (index, rect) = self
            .write()
            .add(image, surface_width, surface_height, config);
        tracing::debug!(%id, index, x = rect.x, y = rect.y, w = rect.width, h = rect.height, "Overlay placed");
        (index, rect)
    }

    /// Top-most overlay under `p`, with its rectangle at hit time.
    pub fn hit_test(&self, p: Point) -> Option<(usize, Rect)> {
        let store = self.read();
        store
            .hit_test(p)
            .map(|index| (index, store.entries[index].rect))
    }

    /// Move overlay `index` so its top-left corner is `origin`.
    pub fn move_to(&self, index: usize, origin: Point) -> bool {
        self.write().set_origin(index, origin)
    }

    /// Remove every overlay.
    pub fn clear(&self) -> usize {
        self.write().clear()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn rect(&self, index: usize) -> Option<Rect> {
        self.read().get(index).map(|entry| entry.rect)
    }

    // A panic while holding the lock cannot leave a half-written entry:
    // every mutation is a single push, clear, or Copy assignment.
    fn read(&self) -> RwLockReadGuard<'_, LayoutStore> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, LayoutStore> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}
