use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::catalog::{BackendInfo, Resolution};
use crate::error::BackendError;
use crate::history::ResultRef;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    /// Image to transform. Required by edit backends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_image: Option<ResultRef>,
    #[serde(default)]
    pub resolution: Resolution,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            source_image: None,
            resolution: Resolution::default(),
            aspect_ratio: None,
        }
    }

    pub fn with_source(mut self, source: ResultRef) -> Self {
        self.source_image = Some(source);
        self
    }

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: impl Into<String>) -> Self {
        self.aspect_ratio = Some(aspect_ratio.into());
        self
    }
}

/// What a remote service answered when the transport itself succeeded.
///
/// `success == false` is an explicit refusal; `success == true` without a
/// reference is a malformed answer. The session tells the two apart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_reference: Option<ResultRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl BackendResponse {
    pub fn ok(result: ResultRef) -> Self {
        Self {
            success: true,
            result_reference: Some(result),
            message: None,
        }
    }

    pub fn refused(message: impl Into<String>) -> Self {
        Self {
            success: false,
            result_reference: None,
            message: Some(message.into()),
        }
    }

    /// The reference, if present and non-blank.
    pub fn usable_reference(&self) -> Option<&ResultRef> {
        self.result_reference
            .as_ref()
            .filter(|r| !r.as_str().trim().is_empty())
    }
}

#[async_trait]
pub trait GenerationBackend: Send + Sync {
    fn info(&self) -> &BackendInfo;

    async fn generate(&self, request: &GenerationRequest) -> Result<BackendResponse, BackendError>;
}

/// Checks shared by every backend before a request leaves the process.
pub fn validate_request(info: &BackendInfo, request: &GenerationRequest) -> Result<(), BackendError> {
    if request.prompt.trim().is_empty() {
        return Err(BackendError::InvalidRequest("prompt is empty".into()));
    }
    if info.requires_source_image() && request.source_image.is_none() {
        return Err(BackendError::InvalidRequest(format!(
            "{} needs a source image",
            info.display_name
        )));
    }
    if !info.supports(request.resolution) {
        return Err(BackendError::InvalidRequest(format!(
            "{} does not support {} output",
            info.display_name, request.resolution
        )));
    }
    Ok(())
}
