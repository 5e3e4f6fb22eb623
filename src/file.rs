//! Candidate files and the input validator.

use std::path::Path;
use std::sync::Arc;

use image::ImageFormat;

/// Largest accepted upload, in bytes (10 MiB).
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Reasons a candidate file is rejected before any network call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The MIME type does not start with `image/`.
    #[error("{name} is not an image (type: {mime})")]
    NotAnImage {
        /// Original filename.
        name: String,
        /// Reported MIME type.
        mime: String,
    },

    /// The file exceeds [`MAX_FILE_SIZE`].
    #[error("{name} is too large ({size} bytes, limit {limit} bytes)")]
    TooLarge {
        /// Original filename.
        name: String,
        /// Actual size in bytes.
        size: u64,
        /// Size ceiling in bytes.
        limit: u64,
    },

    /// Processing was requested with nothing selected.
    #[error("no image selected")]
    NoFileSelected,
}

/// A file offered by the user, not yet validated.
#[derive(Clone)]
pub struct CandidateFile {
    /// Original filename (no directory part).
    pub name: String,
    /// Reported MIME type.
    pub mime: String,
    /// File contents.
    pub bytes: Vec<u8>,
}

impl CandidateFile {
    /// Build a candidate from in-memory parts.
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    /// Read a candidate from disk, inferring its MIME type.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path.file_name().map_or_else(
            || path.display().to_string(),
            |f| f.to_string_lossy().to_string(),
        );
        let mime = guess_mime(path, &bytes).to_string();
        Ok(Self { name, mime, bytes })
    }

    /// Size of the contents in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

impl std::fmt::Debug for CandidateFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandidateFile")
            .field("name", &self.name)
            .field("mime", &self.mime)
            .field("size", &self.bytes.len())
            .finish()
    }
}

/// Infer a MIME type from content, then extension.
///
/// Falls back to `application/octet-stream` when neither identifies an image.
#[must_use]
pub fn guess_mime(path: &Path, bytes: &[u8]) -> &'static str {
    image::guess_format(bytes)
        .or_else(|_| ImageFormat::from_path(path))
        .map_or("application/octet-stream", |format| format.to_mime_type())
}

/// Check if a file has an image extension the `image` crate recognizes.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    ImageFormat::from_path(path).is_ok()
}

/// A validated image staged for processing.
#[derive(Clone)]
pub struct SelectedFile {
    name: String,
    mime: String,
    bytes: Arc<[u8]>,
}

impl std::fmt::Debug for SelectedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectedFile")
            .field("name", &self.name)
            .field("mime", &self.mime)
            .field("size", &self.bytes.len())
            .finish()
    }
}

impl SelectedFile {
    /// Original filename.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// MIME type, always starting with `image/`.
    #[must_use]
    pub fn mime(&self) -> &str {
        &self.mime
    }

    /// File contents.
    #[must_use]
    pub fn bytes(&self) -> &Arc<[u8]> {
        &self.bytes
    }

    /// Size in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Final extension of the original filename, as written.
    ///
    /// Defaults to `png` when the name has none.
    #[must_use]
    pub fn extension(&self) -> String {
        Path::new(&self.name)
            .extension()
            .map_or_else(|| "png".to_string(), |e| e.to_string_lossy().into_owned())
    }
}

/// Validate a candidate against the type and size constraints.
///
/// Pure: nothing is staged here, the caller decides what to do with the result.
///
/// # Errors
///
/// Returns [`ValidationError::NotAnImage`] or [`ValidationError::TooLarge`]
/// naming the first violated constraint.
pub fn validate(candidate: CandidateFile) -> Result<SelectedFile, ValidationError> {
    if !candidate.mime.starts_with("image/") {
        return Err(ValidationError::NotAnImage {
            name: candidate.name,
            mime: candidate.mime,
        });
    }

    let size = candidate.size();
    if size > MAX_FILE_SIZE {
        return Err(ValidationError::TooLarge {
            name: candidate.name,
            size,
            limit: MAX_FILE_SIZE,
        });
    }

    Ok(SelectedFile {
        name: candidate.name,
        mime: candidate.mime,
        bytes: candidate.bytes.into(),
    })
}
