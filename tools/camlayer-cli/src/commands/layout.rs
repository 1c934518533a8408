//! Print overlay placement.

use std::path::PathBuf;

use camlayer_common::config::AppConfig;
use camlayer_layout_model::{LayoutStore, Rect};
use serde::Serialize;

use super::{load_image, surface_size};

#[derive(Debug, Serialize)]
struct Placement {
    index: usize,
    file: PathBuf,
    natural_width: u32,
    natural_height: u32,
    rect: Rect,
}

pub fn run(
    config: &AppConfig,
    images: Vec<PathBuf>,
    width: Option<u32>,
    height: Option<u32>,
    json: bool,
) -> anyhow::Result<()> {
    let (width, height) = surface_size(config, width, height)?;
    let mut store = LayoutStore::new();
    let mut placements = Vec::with_capacity(images.len());

    for file in images {
        let image = match load_image(&file) {
            Ok(image) => image,
            Err(e) => {
                tracing::warn!(file = %file.display(), error = %e, "Skipping image");
                continue;
            }
        };
        let (natural_width, natural_height) = (image.width(), image.height());
        let (index, rect) = store.add(image, width as f64, height as f64, &config.layout);
        placements.push(Placement {
            index,
            file,
            natural_width,
            natural_height,
            rect,
        });
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&placements)?);
        return Ok(());
    }

    println!("Surface {width}x{height}");
    println!(
        "{:>3}  {:>11}  {:>8} {:>8} {:>8} {:>8}  file",
        "#", "natural", "x", "y", "w", "h"
    );
    for p in &placements {
        println!(
            "{:>3}  {:>11}  {:>8.1} {:>8.1} {:>8.1} {:>8.1}  {}",
            p.index,
            format!("{}x{}", p.natural_width, p.natural_height),
            p.rect.x,
            p.rect.y,
            p.rect.width,
            p.rect.height,
            p.file.display()
        );
    }
    Ok(())
}
