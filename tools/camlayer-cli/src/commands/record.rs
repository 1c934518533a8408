//! Record a session with overlays.

use std::path::PathBuf;

use camlayer_common::config::AppConfig;

#[cfg(feature = "gstreamer")]
pub async fn run(
    mut config: AppConfig,
    images: Vec<PathBuf>,
    duration: f64,
    gain: Option<f32>,
    synthetic: bool,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    use std::sync::Arc;
    use std::time::Duration;

    use anyhow::Context;
    use camlayer_capture_engine::backend::{GstMediaSource, GstRecorder};
    use camlayer_capture_engine::{MediaSource, SyntheticSource};
    use camlayer_session::{DirectoryDownload, RasterDecoder, Session};

    if !duration.is_finite() || duration <= 0.0 {
        anyhow::bail!("Duration must be a positive number of seconds, got {duration}");
    }
    if let Some(gain) = gain {
        config.recording.gain = gain;
    }
    let downloads = output.unwrap_or_else(|| config.downloads_dir.clone());

    let (width, height, fps) = (config.surface.width, config.surface.height, config.recording.fps);
    let (rate, channels) = (config.recording.audio_sample_rate, config.recording.audio_channels);
    let mut source: Box<dyn MediaSource> = if synthetic {
        Box::new(SyntheticSource::new(width, height, fps).with_audio(rate, channels))
    } else {
        Box::new(GstMediaSource::new(width, height, fps, rate, channels))
    };

    println!("Starting session ({} source)", source.name());
    let mut session = Session::initialize(
        config,
        source.as_mut(),
        Box::new(GstRecorder::new()),
        Arc::new(RasterDecoder),
    )
    .await?;

    session.start_recording()?;
    for path in &images {
        let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        match session.add_image(bytes).await {
            Some((index, rect)) => println!(
                "  [{index}] {} at ({:.1}, {:.1}) {:.1}x{:.1}",
                path.display(),
                rect.x,
                rect.y,
                rect.width,
                rect.height
            ),
            None => println!("  [skip] {} could not be decoded", path.display()),
        }
    }

    println!("Recording for {duration:.1}s. Press Ctrl+C to stop early...");
    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs_f64(duration)) => {}
        result = tokio::signal::ctrl_c() => result?,
    }

    session.stop_recording()?;
    let asset = session
        .wait_for_recording()
        .await?
        .context("Recorder produced no output")?;
    println!("Recorded {} bytes in {} fragments", asset.len(), asset.fragment_count());

    if let Some(path) = session.download(&DirectoryDownload::new(downloads))? {
        println!("Recording saved to: {}", path.display());
    }

    let frames = session.shutdown().await?;
    tracing::info!(frames, "Session finished");
    Ok(())
}

#[cfg(not(feature = "gstreamer"))]
pub async fn run(
    _config: AppConfig,
    _images: Vec<PathBuf>,
    _duration: f64,
    _gain: Option<f32>,
    _synthetic: bool,
    _output: Option<PathBuf>,
) -> anyhow::Result<()> {
    Err(camlayer_common::error::CamlayerError::unsupported(
        "recording needs the WebM encoder; rebuild with `--features gstreamer`",
    )
    .into())
}
