//! Error types shared across Camlayer crates.

use std::path::PathBuf;

/// Top-level error type for Camlayer operations.
#[derive(Debug, thiserror::Error)]
pub enum CamlayerError {
    #[error("Media acquisition failed: {message}")]
    Acquisition { message: String },

    #[error("Image decode error: {message}")]
    Decode { message: String },

    #[error("Capture error: {message}")]
    Capture { message: String },

    #[error("Recorder error: {message}")]
    Recorder { message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Playback error: {message}")]
    Playback { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using CamlayerError.
pub type CamlayerResult<T> = Result<T, CamlayerError>;

impl CamlayerError {
    pub fn acquisition(msg: impl Into<String>) -> Self {
        Self::Acquisition {
            message: msg.into(),
        }
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode {
            message: msg.into(),
        }
    }

    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture {
            message: msg.into(),
        }
    }

    pub fn recorder(msg: impl Into<String>) -> Self {
        Self::Recorder {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn playback(msg: impl Into<String>) -> Self {
        Self::Playback {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// Whether this error must abort session start-up.
    pub fn is_fatal_to_session(&self) -> bool {
        matches!(self, Self::Acquisition { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_message() {
        let err = CamlayerError::acquisition("camera permission denied");
        assert_eq!(
            err.to_string(),
            "Media acquisition failed: camera permission denied"
        );
    }

    #[test]
    fn test_only_acquisition_is_fatal() {
        assert!(CamlayerError::acquisition("no device").is_fatal_to_session());
        assert!(!CamlayerError::decode("bad png").is_fatal_to_session());
        assert!(!CamlayerError::recorder("encoder gone").is_fatal_to_session());
    }

    #[test]
    fn test_io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: CamlayerError = io.into();
        assert!(matches!(err, CamlayerError::Io(_)));
    }
}
