//! Render one composited frame.

use std::path::PathBuf;

use anyhow::Context;
use camlayer_common::config::AppConfig;
use camlayer_compositor::{Compositor, Surface, VideoFrame};
use camlayer_layout_model::{LayoutHandle, Point};

use super::{load_image, surface_size};

/// Parse `INDEX:X,Y`.
fn parse_move(spec: &str) -> anyhow::Result<(usize, Point)> {
    let (index, position) = spec
        .split_once(':')
        .with_context(|| format!("Move `{spec}` is not INDEX:X,Y"))?;
    let (x, y) = position
        .split_once(',')
        .with_context(|| format!("Move `{spec}` is not INDEX:X,Y"))?;
    let index: usize = index.trim().parse().with_context(|| format!("Bad index in `{spec}`"))?;
    let x: f64 = x.trim().parse().with_context(|| format!("Bad x in `{spec}`"))?;
    let y: f64 = y.trim().parse().with_context(|| format!("Bad y in `{spec}`"))?;
    Ok((index, Point::new(x, y)))
}

pub fn run(
    config: &AppConfig,
    images: Vec<PathBuf>,
    background: Option<PathBuf>,
    output: PathBuf,
    moves: Vec<String>,
    width: Option<u32>,
    height: Option<u32>,
) -> anyhow::Result<()> {
    let (width, height) = surface_size(config, width, height)?;
    let moves = moves
        .iter()
        .map(|spec| parse_move(spec))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let video = background
        .map(|path| load_image(&path).map(|image| VideoFrame::new(image.raster().clone(), 0)))
        .transpose()?;

    let layout = LayoutHandle::new();
    for path in &images {
        let image = load_image(path)?;
        let (index, rect) = layout.add(image, width as f64, height as f64, &config.layout);
        println!(
            "  [{index}] {} -> ({:.1}, {:.1}) {:.1}x{:.1}",
            path.display(),
            rect.x,
            rect.y,
            rect.width,
            rect.height
        );
    }
    for (index, origin) in moves {
        if !layout.move_to(index, origin) {
            anyhow::bail!("No overlay with index {index} to move");
        }
        println!("  [{index}] moved to ({:.1}, {:.1})", origin.x, origin.y);
    }

    let mut surface = Surface::new(width, height);
    let stats = Compositor::new().render_frame(&mut surface, video.as_ref(), &layout.snapshot());
    surface.present(0);
    tracing::debug!(?stats, "Frame composed");

    surface
        .canvas()
        .save(&output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("Composed {width}x{height} frame written to {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::parse_move;
    use camlayer_layout_model::Point;

    #[test]
    fn test_parses_index_and_position() {
        let (index, origin) = parse_move("2:-10.5, 40").unwrap();
        assert_eq!(index, 2);
        assert_eq!(origin, Point::new(-10.5, 40.0));
    }

    #[test]
    fn test_rejects_malformed_moves() {
        assert!(parse_move("2-10,40").is_err());
        assert!(parse_move("a:1,2").is_err());
        assert!(parse_move("1:1").is_err());
    }
}
