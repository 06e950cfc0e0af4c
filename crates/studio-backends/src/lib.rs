mod fal;
mod http;
mod imagen;

#[cfg(test)]
mod tests;

pub use fal::{image_dimensions, parse_fal_response, FalBackend};
pub use http::{classify_status, extract_error_message};
pub use imagen::{parse_imagen_response, ImagenBackend};

use std::sync::Arc;
use studio_core::backend::GenerationBackend;
use studio_core::catalog::{self, BackendId};
use studio_core::config::AppConfig;
use studio_core::error::BackendError;

/// Create the backend for a catalog id, keyed and routed from config.
pub fn create_backend(
    config: &AppConfig,
    id: BackendId,
) -> Result<Arc<dyn GenerationBackend>, BackendError> {
    let info =
        catalog::get_backend_info(id).ok_or_else(|| BackendError::UnknownBackend(id.to_string()))?;

    let api_key = config.api_key_for(id).ok_or_else(|| {
        let var = match id {
            BackendId::Imagen4 => "GEMINI_API_KEY",
            _ => "FAL_KEY",
        };
        BackendError::MissingApiKey(format!("{id}: {var} not set. Set via env var or config file."))
    })?;

    let timeout = config.generation.request_timeout_secs;
    let backend: Arc<dyn GenerationBackend> = match id {
        BackendId::NanoBananaEdit | BackendId::Seedream => Arc::new(FalBackend::new(
            api_key.to_string(),
            info,
            config.fal_base_url.clone(),
            timeout,
        )),
        BackendId::Imagen4 => Arc::new(ImagenBackend::new(
            api_key.to_string(),
            info,
            config.google_base_url.clone(),
            timeout,
        )),
    };
    Ok(backend)
}

/// Backends that have a key configured, in catalog order.
pub fn available_backends(config: &AppConfig) -> Vec<BackendId> {
    BackendId::ALL
        .into_iter()
        .filter(|id| config.has_key_for(*id))
        .collect()
}
