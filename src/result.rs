//! Processed results, presentation helpers and the downloader.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::{ImageFormat, ImageReader};

use crate::error::{Error, Result, ServiceError};
use crate::object_url::ObjectUrlRegistry;

/// Suffix appended to the original basename of every download.
pub const DOWNLOAD_SUFFIX: &str = "_watermark_removed.png";

/// Outcome of a successful workflow run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedResult {
    /// Durable URL of the uploaded original.
    pub original_url: String,
    /// URL of the watermark-free image.
    pub processed_url: String,
    /// Suggested filename for the download.
    pub download_filename: String,
}

/// Derive the download filename from the original filename.
///
/// Only the final extension is replaced: `archive.tar.png` becomes
/// `archive.tar_watermark_removed.png`.
#[must_use]
pub fn download_filename(original: &str) -> String {
    let stem = match original.rfind('.') {
        Some(idx) if idx > 0 => &original[..idx],
        _ => original,
    };
    format!("{stem}{DOWNLOAD_SUFFIX}")
}

/// Fetches the bytes behind a remote URL.
#[async_trait]
pub trait ResultFetcher: Send + Sync {
    /// Download `url` in full.
    async fn fetch(&self, url: &str) -> std::result::Result<Vec<u8>, ServiceError>;
}

/// Where downloads end up (the "Save As" destination).
pub trait SaveTarget: Send + Sync {
    /// Store `bytes` as `filename`, returning a description of the location.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the bytes cannot be written.
    fn save(&self, filename: &str, bytes: &[u8]) -> std::io::Result<String>;
}

/// Saves downloads into a directory.
#[derive(Debug, Clone)]
pub struct FileSaveTarget {
    dir: PathBuf,
}

impl FileSaveTarget {
    /// Save into `dir`, creating it on first use.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Target directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl SaveTarget for FileSaveTarget {
    fn save(&self, filename: &str, bytes: &[u8]) -> std::io::Result<String> {
        if !self.dir.exists() {
            std::fs::create_dir_all(&self.dir)?;
        }
        let path = self.dir.join(filename);
        std::fs::write(&path, bytes)?;
        Ok(path.display().to_string())
    }
}

/// Fetch the processed image and hand it to `target`.
///
/// The bytes are staged behind a temporary object URL which is revoked as
/// soon as the target has been handed the file.
///
/// # Errors
///
/// Returns [`Error::Download`] if fetching or saving fails.
pub async fn download(
    fetcher: &dyn ResultFetcher,
    registry: &ObjectUrlRegistry,
    target: &dyn SaveTarget,
    result: &ProcessedResult,
) -> Result<String> {
    let bytes = fetcher
        .fetch(&result.processed_url)
        .await
        .map_err(Error::Download)?;

    let temp = registry.create(bytes);
    let staged = registry
        .resolve(temp.as_str())
        .ok_or_else(|| Error::Unknown("temporary download object vanished".to_string()))?;
    let location = target.save(&result.download_filename, &staged);
    drop(temp);

    location.map_err(|e| Error::Download(ServiceError::Save(e.to_string())))
}

/// Basic facts about an image, for the before/after panels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Detected container format.
    pub format: ImageFormat,
}

impl ImageInfo {
    /// Read the header of `bytes` to describe it. `None` if it is not a readable image.
    #[must_use]
    pub fn probe(bytes: &[u8]) -> Option<Self> {
        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .ok()?;
        let format = reader.format()?;
        let (width, height) = reader.into_dimensions().ok()?;
        Some(Self {
            width,
            height,
            format,
        })
    }
}

impl std::fmt::Display for ImageInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{} {:?}", self.width, self.height, self.format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_filename_replaces_final_extension() {
        assert_eq!(download_filename("photo.jpg"), "photo_watermark_removed.png");
        assert_eq!(
            download_filename("archive.tar.png"),
            "archive.tar_watermark_removed.png"
        );
        assert_eq!(download_filename("cat.png"), "cat_watermark_removed.png");
    }

    #[test]
    fn download_filename_without_extension_appends_suffix() {
        assert_eq!(download_filename("scan"), "scan_watermark_removed.png");
        assert_eq!(download_filename(".hidden"), ".hidden_watermark_removed.png");
    }

    #[test]
    fn probe_reads_dimensions() {
        let img = image::RgbImage::new(7, 5);
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();

        let info = ImageInfo::probe(buf.get_ref()).unwrap();
        assert_eq!((info.width, info.height), (7, 5));
        assert_eq!(info.format, ImageFormat::Png);
        assert_eq!(info.to_string(), "7x5 Png");
    }

    #[test]
    fn probe_rejects_garbage() {
        assert!(ImageInfo::probe(b"not an image").is_none());
    }

    #[test]
    fn file_target_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = FileSaveTarget::new(dir.path().join("out"));
        let location = target.save("a_watermark_removed.png", b"png").unwrap();
        assert!(location.ends_with("a_watermark_removed.png"));
        assert_eq!(
            std::fs::read(dir.path().join("out/a_watermark_removed.png")).unwrap(),
            b"png"
        );
    }
}
