use async_trait::async_trait;
use reqwest::Client;
use studio_core::backend::*;
use studio_core::catalog::{BackendInfo, Resolution};
use studio_core::error::BackendError;
use studio_core::history::ResultRef;

use crate::http;

pub struct ImagenBackend {
    client: Client,
    api_key: String,
    info: BackendInfo,
    base_url: String,
}

impl ImagenBackend {
    pub fn new(api_key: String, info: BackendInfo, base_url: String, timeout_secs: u64) -> Self {
        Self {
            client: http::build_client(timeout_secs),
            api_key,
            info,
            base_url,
        }
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:predict",
            self.base_url.trim_end_matches('/'),
            self.info.endpoint
        )
    }

    pub fn build_body(&self, request: &GenerationRequest) -> serde_json::Value {
        let image_size = match request.resolution {
            Resolution::OneK => "1K",
            _ => "2K",
        };
        serde_json::json!({
            "instances": [{ "prompt": request.prompt }],
            "parameters": {
                "sampleCount": 1,
                "aspectRatio": request.aspect_ratio.as_deref().unwrap_or("1:1"),
                "sampleImageSize": image_size,
                "includeRaiReason": true,
            }
        })
    }
}

#[async_trait]
impl GenerationBackend for ImagenBackend {
    fn info(&self) -> &BackendInfo {
        &self.info
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<BackendResponse, BackendError> {
        validate_request(&self.info, request)?;

        tracing::debug!(backend = %self.info.id, "calling Imagen predict");
        let text = http::send_json(
            self.client
                .post(self.url())
                .header("x-goog-api-key", &self.api_key)
                .json(&self.build_body(request)),
        )
        .await?;

        Ok(match http::decode_body(&text) {
            Ok(value) => parse_imagen_response(&value),
            Err(unreadable) => unreadable,
        })
    }
}

/// Turn a `:predict` answer into a data URL reference.
///
/// Imagen drops filtered samples from `predictions` and reports the reason in
/// `raiFilteredReason`; that is a refusal, not a malformed answer.
pub fn parse_imagen_response(value: &serde_json::Value) -> BackendResponse {
    let predictions = value["predictions"].as_array().cloned().unwrap_or_default();

    for p in &predictions {
        if let Some(b64) = p["bytesBase64Encoded"].as_str().filter(|s| !s.is_empty()) {
            let mime = p["mimeType"].as_str().unwrap_or("image/png");
            return BackendResponse::ok(ResultRef(format!("data:{mime};base64,{b64}")));
        }
    }

    let filtered = predictions
        .iter()
        .filter_map(|p| p["raiFilteredReason"].as_str())
        .next()
        .or_else(|| value["raiFilteredReason"].as_str());

    match filtered {
        Some(reason) => BackendResponse::refused(reason),
        None => BackendResponse {
            success: true,
            result_reference: None,
            message: Some("no image in response".into()),
        },
    }
}
