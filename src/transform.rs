//! AI image-modification collaborator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

/// Instruction sent with every watermark removal request.
pub const PROMPT: &str = "Remove all watermarks, logos, text overlays and copyright notices \
    from this image. Reconstruct the covered areas so they blend seamlessly with their \
    surroundings, and keep the original composition, colors, sharpness and resolution unchanged.";

/// Requested output quality.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    /// Standard quality.
    Standard,
    /// Highest quality the service offers.
    #[default]
    High,
}

/// Body of a modify-image call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifyImageRequest {
    /// Source image URLs. The workflow always sends exactly one.
    pub images: Vec<String>,
    /// Natural-language instruction.
    pub prompt: String,
    /// Quality hint.
    pub quality: Quality,
    /// Number of results to generate.
    pub n: u32,
}

impl ModifyImageRequest {
    /// Standard watermark removal request for one image.
    #[must_use]
    pub fn watermark_removal(image_url: impl Into<String>) -> Self {
        Self {
            images: vec![image_url.into()],
            prompt: PROMPT.to_string(),
            quality: Quality::High,
            n: 1,
        }
    }
}

/// One generated image in a response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    /// Where the result can be fetched.
    #[serde(default)]
    pub url: Option<String>,
}

/// Response of a modify-image call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifyImageResponse {
    /// Generated images, in order.
    #[serde(default)]
    pub data: Vec<GeneratedImage>,
}

impl ModifyImageResponse {
    /// URL of the first result.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem when the list is empty or the
    /// first entry has no usable URL.
    pub fn first_url(&self) -> Result<&str, String> {
        let first = self
            .data
            .first()
            .ok_or_else(|| "response contained no images".to_string())?;
        match first.url.as_deref() {
            Some(url) if !url.trim().is_empty() => Ok(url),
            _ => Err("first result has no url".to_string()),
        }
    }
}

/// The AI image-modification collaborator.
#[async_trait]
pub trait ImageTransformer: Send + Sync {
    /// Submit one request and wait for the result.
    async fn modify_image(
        &self,
        request: ModifyImageRequest,
    ) -> Result<ModifyImageResponse, ServiceError>;
}
