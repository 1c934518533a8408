//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory where downloaded recordings are written.
    pub downloads_dir: PathBuf,

    /// Render surface dimensions.
    pub surface: SurfaceConfig,

    /// Overlay placement parameters.
    pub layout: LayoutConfig,

    /// Default recording settings.
    pub recording: RecordingDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Size of the composited surface in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    pub width: u32,
    pub height: u32,
}

/// Flow-layout constants used when placing newly added overlays.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Longest edge an overlay may occupy after scaling.
    pub max_size: f64,

    /// Left padding of every row.
    pub padding_left: f64,

    /// Gap between neighbouring overlays and between rows.
    pub spacing: f64,
}

/// Default recording parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingDefaults {
    /// Render loop and captured stream frame rate.
    pub fps: u32,

    /// Initial microphone gain (0.0 and up).
    pub gain: f32,

    /// MIME type of the finalized asset.
    pub mime_type: String,

    /// File name offered when downloading a recording.
    pub download_filename: String,

    /// Microphone sample rate.
    pub audio_sample_rate: u32,

    /// Microphone channel count.
    pub audio_channels: u16,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "camlayer=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            downloads_dir: default_downloads_dir(),
            surface: SurfaceConfig::default(),
            layout: LayoutConfig::default(),
            recording: RecordingDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 450,
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            max_size: 200.0,
            padding_left: 15.0,
            spacing: 10.0,
        }
    }
}

impl Default for RecordingDefaults {
    fn default() -> Self {
        Self {
            fps: 30,
            gain: 1.0,
            mime_type: "video/webm".to_string(),
            download_filename: "video.webm".to_string(),
            audio_sample_rate: 48000,
            audio_channels: 1,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match Self::from_json(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Parse and validate a JSON config document.
    pub fn from_json(content: &str) -> crate::CamlayerResult<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make placement or recording meaningless.
    pub fn validate(&self) -> crate::CamlayerResult<()> {
        if self.surface.width == 0 || self.surface.height == 0 {
            return Err(crate::CamlayerError::config(format!(
                "Surface must be non-empty, got {}x{}",
                self.surface.width, self.surface.height
            )));
        }
        if self.layout.max_size.is_nan() || self.layout.max_size <= 0.0 {
            return Err(crate::CamlayerError::config(
                "layout.max_size must be positive",
            ));
        }
        if self.recording.fps == 0 {
            return Err(crate::CamlayerError::config("recording.fps must be > 0"));
        }
        if self.recording.mime_type.trim().is_empty() {
            return Err(crate::CamlayerError::config("recording.mime_type must not be empty"));
        }
        if !self.recording.gain.is_finite() || self.recording.gain < 0.0 {
            return Err(crate::CamlayerError::config(format!(
                "recording.gain must be a finite value >= 0, got {}",
                self.recording.gain
            )));
        }
        Ok(())
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<PathBuf, std::io::Error> {
        let config_path = config_file_path();
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    /// Save config as pretty JSON to `path`, creating parent directories.
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("camlayer").join("config.json")
}

/// Default downloads directory.
fn default_downloads_dir() -> PathBuf {
    std::env::var("XDG_DOWNLOAD_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join("Downloads")
        })
}
