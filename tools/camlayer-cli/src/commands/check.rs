//! Show configuration and capabilities.

use camlayer_capture_engine::GSTREAMER_ENABLED;
use camlayer_common::config::{config_file_path, AppConfig};

pub fn run(config: &AppConfig, write_config: bool) -> anyhow::Result<()> {
    println!("Camlayer System Check");
    println!("{}", "=".repeat(50));

    let path = config_file_path();
    if write_config {
        let written = config.save()?;
        println!("[OK] Config written: {}", written.display());
    } else if path.exists() {
        println!("[OK] Config: {}", path.display());
    } else {
        println!("[--] Config: {} (not found, using defaults)", path.display());
    }

    println!(
        "[OK] Surface: {}x{} @ {} fps",
        config.surface.width, config.surface.height, config.recording.fps
    );
    println!(
        "[OK] Layout: max {}px, padding {}px, spacing {}px",
        config.layout.max_size, config.layout.padding_left, config.layout.spacing
    );
    println!(
        "[OK] Audio: {} Hz, {} channel(s), gain {}",
        config.recording.audio_sample_rate, config.recording.audio_channels, config.recording.gain
    );
    println!(
        "[OK] Downloads: {} ({})",
        config.downloads_dir.display(),
        config.recording.download_filename
    );

    println!();
    if GSTREAMER_ENABLED {
        println!("[OK] GStreamer adapters compiled in: camera, microphone, and WebM recording available.");
    } else {
        println!("[WARN] Built without the `gstreamer` feature: `camlayer record` is unavailable.");
    }

    Ok(())
}
