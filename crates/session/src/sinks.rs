//! Where a finalized recording goes: playback and download.

use std::path::{Path, PathBuf};

use camlayer_capture_engine::FinalizedAsset;
use camlayer_common::error::CamlayerResult;

/// Plays a finalized recording.
pub trait PlaybackSink: Send {
    fn play(&mut self, asset: &FinalizedAsset) -> CamlayerResult<()>;
}

/// Saves a finalized recording under a suggested file name.
pub trait DownloadSink: Send + Sync {
    /// Returns where the file ended up.
    fn save(&self, asset: &FinalizedAsset, filename: &str) -> CamlayerResult<PathBuf>;
}

/// Writes downloads into a directory, creating it if needed.
#[derive(Debug, Clone)]
pub struct DirectoryDownload {
    dir: PathBuf,
}

impl DirectoryDownload {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DownloadSink for DirectoryDownload {
    fn save(&self, asset: &FinalizedAsset, filename: &str) -> CamlayerResult<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(filename);
        std::fs::write(&path, asset.bytes())?;
        tracing::info!(path = %path.display(), bytes = asset.len(), "Recording saved");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_download_writes_bytes() {
        let dir = std::env::temp_dir().join("camlayer_test_download");
        let _ = std::fs::remove_dir_all(&dir);

        let asset = FinalizedAsset::new(vec![0x1a, 0x45, 0xdf, 0xa3], "video/webm", 1);
        let path = DirectoryDownload::new(&dir).save(&asset, "video.webm").unwrap();

        assert_eq!(path, dir.join("video.webm"));
        assert_eq!(std::fs::read(&path).unwrap(), vec![0x1a, 0x45, 0xdf, 0xa3]);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
