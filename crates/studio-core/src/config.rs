use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::catalog::{BackendId, Resolution};
use crate::error::ConfigError;

/// fal.ai synchronous run endpoint (Nano Banana, Seedream)
const DEFAULT_FAL_BASE_URL: &str = "https://fal.run";

/// Google Generative Language API (Imagen 4)
const DEFAULT_GOOGLE_BASE_URL: &str = "https://generativelanguage.googleapis.com";

const CONFIG_DIR_NAME: &str = "photo-studio";
const LOCAL_CONFIG_FILE: &str = "studio.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,

    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Account the local database charges
    #[serde(default = "default_user_id")]
    pub user_id: String,

    /// Balance given to an account the first time it is seen
    #[serde(default = "default_starting_credits")]
    pub starting_credits: u64,

    /// fal.ai key (Nano Banana edit, Seedream)
    #[serde(default)]
    pub fal_api_key: Option<String>,

    #[serde(default = "default_fal_base_url")]
    pub fal_base_url: String,

    /// Google AI Studio key (Imagen 4)
    #[serde(default)]
    pub google_api_key: Option<String>,

    #[serde(default = "default_google_base_url")]
    pub google_base_url: String,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub debug: bool,
}

fn default_fal_base_url() -> String {
    DEFAULT_FAL_BASE_URL.into()
}

fn default_google_base_url() -> String {
    DEFAULT_GOOGLE_BASE_URL.into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            working_dir: default_working_dir(),
            data_dir: default_data_dir(),
            user_id: default_user_id(),
            starting_credits: default_starting_credits(),
            fal_api_key: None,
            fal_base_url: default_fal_base_url(),
            google_api_key: None,
            google_base_url: default_google_base_url(),
            generation: GenerationConfig::default(),
            debug: false,
        }
    }
}

fn default_working_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

fn default_data_dir() -> String {
    ".photo-studio".into()
}

fn default_user_id() -> String {
    "local".into()
}

fn default_starting_credits() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Backend for prompt-only generation
    #[serde(default = "default_generate_backend")]
    pub generate_backend: BackendId,

    /// Backend for edits of an existing image
    #[serde(default = "default_edit_backend")]
    pub edit_backend: BackendId,

    #[serde(default)]
    pub resolution: Resolution,

    /// Per-request HTTP timeout, owned by the backends
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_generate_backend() -> BackendId {
    BackendId::Seedream
}

fn default_edit_backend() -> BackendId {
    BackendId::NanoBananaEdit
}

fn default_request_timeout() -> u64 {
    120
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            generate_backend: default_generate_backend(),
            edit_backend: default_edit_backend(),
            resolution: Resolution::default(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

pub fn load_config(working_dir: Option<PathBuf>) -> Result<AppConfig, ConfigError> {
    let global_dir = dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME));
    let mut config = load_config_files(global_dir.as_deref(), working_dir)?;

    // Auto-detect keys and user from environment
    detect_env(&mut config);

    Ok(config)
}

/// Global file first, then the project-local `studio.json` on top.
pub fn load_config_files(
    global_dir: Option<&Path>,
    working_dir: Option<PathBuf>,
) -> Result<AppConfig, ConfigError> {
    let wd = working_dir.unwrap_or_else(|| std::env::current_dir().unwrap_or_default());

    let mut config = AppConfig::default();
    config.working_dir = wd.clone();

    if let Some(dir) = global_dir {
        let global_path = dir.join("config.json");
        if global_path.exists() {
            merge_config(&mut config, read_config_file(&global_path)?);
        }
    }

    let local_path = wd.join(LOCAL_CONFIG_FILE);
    if local_path.exists() {
        merge_config(&mut config, read_config_file(&local_path)?);
    }

    Ok(config)
}

fn read_config_file(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::File(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&content)
        .map_err(|e| ConfigError::Invalid(format!("{}: {e}", path.display())))
}

pub fn merge_config(base: &mut AppConfig, overlay: AppConfig) {
    if overlay.data_dir != default_data_dir() {
        base.data_dir = overlay.data_dir;
    }
    if overlay.user_id != default_user_id() {
        base.user_id = overlay.user_id;
    }
    if overlay.starting_credits != default_starting_credits() {
        base.starting_credits = overlay.starting_credits;
    }
    if overlay.fal_api_key.is_some() {
        base.fal_api_key = overlay.fal_api_key;
    }
    if overlay.fal_base_url != default_fal_base_url() {
        base.fal_base_url = overlay.fal_base_url;
    }
    if overlay.google_api_key.is_some() {
        base.google_api_key = overlay.google_api_key;
    }
    if overlay.google_base_url != default_google_base_url() {
        base.google_base_url = overlay.google_base_url;
    }
    if overlay.generation.generate_backend != default_generate_backend() {
        base.generation.generate_backend = overlay.generation.generate_backend;
    }
    if overlay.generation.edit_backend != default_edit_backend() {
        base.generation.edit_backend = overlay.generation.edit_backend;
    }
    if overlay.generation.resolution != Resolution::default() {
        base.generation.resolution = overlay.generation.resolution;
    }
    if overlay.generation.request_timeout_secs != default_request_timeout() {
        base.generation.request_timeout_secs = overlay.generation.request_timeout_secs;
    }
    if overlay.debug {
        base.debug = true;
    }
}

fn detect_env(config: &mut AppConfig) {
    if config.fal_api_key.is_none() {
        config.fal_api_key = first_env(&["FAL_KEY", "FAL_API_KEY"]);
    }

    if config.google_api_key.is_none() {
        config.google_api_key = first_env(&["GEMINI_API_KEY", "GOOGLE_API_KEY"]);
    }

    if let Some(user) = first_env(&["STUDIO_USER"]) {
        config.user_id = user;
    }
}

fn first_env(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.is_empty())
}

impl AppConfig {
    pub fn data_path(&self) -> PathBuf {
        self.working_dir.join(&self.data_dir)
    }

    /// API key needed to call the given backend, if configured.
    pub fn api_key_for(&self, backend: BackendId) -> Option<&str> {
        let key = match backend {
            BackendId::NanoBananaEdit | BackendId::Seedream => self.fal_api_key.as_deref(),
            BackendId::Imagen4 => self.google_api_key.as_deref(),
        };
        key.filter(|k| !k.is_empty())
    }

    pub fn has_key_for(&self, backend: BackendId) -> bool {
        self.api_key_for(backend).is_some()
    }

    /// Check if any backend is usable
    pub fn has_any_api_key(&self) -> bool {
        BackendId::ALL.iter().any(|id| self.has_key_for(*id))
    }
}
