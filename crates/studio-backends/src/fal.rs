use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use studio_core::backend::*;
use studio_core::catalog::{BackendInfo, BackendKind, Resolution};
use studio_core::error::BackendError;
use studio_core::history::ResultRef;

use crate::http;

/// fal.ai hosted model called through the synchronous `fal.run` endpoint.
///
/// Serves both the Nano Banana edit model and Seedream text-to-image; the
/// catalog entry decides which request body is built.
pub struct FalBackend {
    client: Client,
    api_key: String,
    info: BackendInfo,
    base_url: String,
}

impl FalBackend {
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
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.info.endpoint
        )
    }

    pub fn build_body(&self, request: &GenerationRequest) -> serde_json::Value {
        match self.info.kind {
            BackendKind::Edit => {
                let mut body = serde_json::json!({
                    "prompt": request.prompt,
                    "image_urls": request.source_image.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
                    "num_images": 1,
                    "output_format": "png",
                    "resolution": request.resolution.as_str().to_uppercase(),
                });
                if let Some(ar) = &request.aspect_ratio {
                    body["aspect_ratio"] = serde_json::Value::String(ar.clone());
                }
                body
            }
            BackendKind::Generate => {
                let (width, height) =
                    image_dimensions(request.resolution, request.aspect_ratio.as_deref());
                serde_json::json!({
                    "prompt": request.prompt,
                    "image_size": { "width": width, "height": height },
                    "num_images": 1,
                    "enable_safety_checker": true,
                })
            }
        }
    }
}

#[async_trait]
impl GenerationBackend for FalBackend {
    fn info(&self) -> &BackendInfo {
        &self.info
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<BackendResponse, BackendError> {
        validate_request(&self.info, request)?;

        tracing::debug!(backend = %self.info.id, url = %self.url(), "calling fal.ai");
        let body = self.build_body(request);
        let text = http::send_json(
            self.client
                .post(self.url())
                .header("Authorization", format!("Key {}", self.api_key))
                .json(&body),
        )
        .await?;

        Ok(match http::decode_body(&text) {
            Ok(value) => parse_fal_response(value),
            Err(unreadable) => unreadable,
        })
    }
}

#[derive(Debug, Deserialize)]
struct FalResponse {
    #[serde(default)]
    images: Vec<FalImage>,
    #[serde(default)]
    has_nsfw_concepts: Vec<bool>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FalImage {
    #[serde(default)]
    url: Option<String>,
}

pub fn parse_fal_response(value: serde_json::Value) -> BackendResponse {
    let resp: FalResponse = match serde_json::from_value(value) {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!("unexpected fal.ai response shape: {e}");
            return BackendResponse {
                success: true,
                result_reference: None,
                message: Some(e.to_string()),
            };
        }
    };

    if resp.has_nsfw_concepts.first().copied().unwrap_or(false) {
        return BackendResponse::refused("image blocked by the safety checker");
    }

    match resp.images.into_iter().find_map(|img| img.url) {
        Some(url) => BackendResponse {
            success: true,
            result_reference: Some(ResultRef(url)),
            message: resp.description,
        },
        None => BackendResponse {
            success: true,
            result_reference: None,
            message: resp.description,
        },
    }
}

/// Width and height for a tier, long edge fixed by the tier.
pub fn image_dimensions(resolution: Resolution, aspect_ratio: Option<&str>) -> (u32, u32) {
    let long_edge = resolution.pixels();
    let Some((w, h)) = aspect_ratio.and_then(parse_aspect_ratio) else {
        return (long_edge, long_edge);
    };

    if w >= h {
        (long_edge, round_to_multiple(long_edge as f64 * h / w, 8))
    } else {
        (round_to_multiple(long_edge as f64 * w / h, 8), long_edge)
    }
}

fn parse_aspect_ratio(s: &str) -> Option<(f64, f64)> {
    let (w, h) = s.split_once(':')?;
    let w: f64 = w.trim().parse().ok()?;
    let h: f64 = h.trim().parse().ok()?;
    (w > 0.0 && h > 0.0).then_some((w, h))
}

fn round_to_multiple(value: f64, multiple: u32) -> u32 {
    let m = multiple as f64;
    ((value / m).round() * m).max(m) as u32
}
