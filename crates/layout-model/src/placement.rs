//! Append-only flow placement for newly added overlays.
//!
//! Each new overlay is scaled so its longer edge fits `max_size` (never
//! upscaled) and then placed relative to the most recently inserted
//! entry: to its right on the same row, or on a new row below it when
//! the row would overflow the surface width. Earlier entries are never
//! reflowed.

use camlayer_common::config::LayoutConfig;

use crate::geometry::Rect;
use crate::overlay::OverlayImage;
use crate::store::LayoutStore;

/// Scaled display size for an overlay with the given natural dimensions.
///
/// Landscape images (`aspect > 1`) clamp their width, everything else
/// clamps its height; the other edge follows from the aspect ratio.
pub fn fit_size(natural_width: f64, natural_height: f64, max_size: f64) -> (f64, f64) {
    let aspect = natural_width / natural_height;
    if aspect > 1.0 {
        let width = natural_width.min(max_size);
        (width, width / aspect)
    } else {
        let height = natural_height.min(max_size);
        (height * aspect, height)
    }
}

/// Rectangle for the next overlay given the last inserted rectangle.
pub fn place_after(
    last: Option<Rect>,
    size: (f64, f64),
    surface_width: f64,
    surface_height: f64,
    config: &LayoutConfig,
) -> Rect {
    let (width, height) = size;
    match last {
        None => Rect::new(
            config.padding_left,
            (surface_height - height) / 2.0,
            width,
            height,
        ),
        Some(last) if last.right() + width + config.spacing > surface_width => Rect::new(
            config.padding_left,
            last.bottom() + config.spacing,
            width,
            height,
        ),
        Some(last) => Rect::new(last.right() + config.spacing, last.y, width, height),
    }
}

/// Where `image` goes if appended to `store` on a surface of the given size.
pub fn place(
    image: &OverlayImage,
    store: &LayoutStore,
    surface_width: f64,
    surface_height: f64,
    config: &LayoutConfig,
) -> Rect {
    let size = fit_size(
        image.width() as f64,
        image.height() as f64,
        config.max_size,
    );
    place_after(
        store.last_rect(),
        size,
        surface_width,
        surface_height,
        config,
    )
}

/// Lay out a whole sequence of natural sizes on an empty surface.
pub fn flow_layout(
    sizes: &[(u32, u32)],
    surface_width: f64,
    surface_height: f64,
    config: &LayoutConfig,
) -> Vec<Rect> {
    let mut rects: Vec<Rect> = Vec::with_capacity(sizes.len());
    for &(w, h) in sizes {
        if w == 0 || h == 0 {
            continue;
        }
        let size = fit_size(w as f64, h as f64, config.max_size);
        let rect = place_after(
            rects.last().copied(),
            size,
            surface_width,
            surface_height,
            config,
        );
        rects.push(rect);
    }
    rects
}
