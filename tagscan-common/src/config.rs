//! Bootstrap configuration loading
//!
//! Settings are resolved in priority order:
//! 1. Command-line arguments (applied by the binary after loading)
//! 2. Environment variables (`TAGSCAN_*`)
//! 3. TOML config file
//! 4. Compiled defaults
//!
//! A missing config file is not an error: a warning is logged and defaults
//! are used. A config file that exists but does not parse IS an error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default asset deep-link template; `{tag}` is replaced by the padded tag
pub const DEFAULT_ASSET_URL_TEMPLATE: &str =
    "https://assets.tagscan.app/item?id={tag}&source=scan&view=detail";

/// Complete TOML configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TagscanConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub vision: VisionConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub live: LiveConfig,
    #[serde(default)]
    pub assets: AssetsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP listener
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// SQLite storage
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

/// Bearer token verification
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Shared HS256 secret; required at startup
    #[serde(default)]
    pub jwt_secret: Option<String>,
}

/// Vision model endpoint (OpenAI-compatible chat completions)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VisionConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Per-image extraction timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Batch processing limits
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Images processed concurrently within one batch
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Maximum multipart request body
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

/// Live push streams
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LiveConfig {
    /// Events buffered per listener before it is considered broken
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
    /// Close streams idle for this long (disabled when unset)
    #[serde(default)]
    pub idle_timeout_secs: Option<u64>,
}

/// Deep-link derivation
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssetsConfig {
    #[serde(default = "default_url_template")]
    pub url_template: String,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5730
}

fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("tagscan").join("tagscan.db"))
        .unwrap_or_else(|| PathBuf::from("./tagscan_data/tagscan.db"))
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_tokens() -> u32 {
    50
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_concurrency() -> usize {
    4
}

fn default_max_upload_bytes() -> usize {
    50 * 1024 * 1024
}

fn default_channel_capacity() -> usize {
    64
}

fn default_keep_alive_secs() -> u64 {
    15
}

fn default_url_template() -> String {
    DEFAULT_ASSET_URL_TEMPLATE.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port() }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: default_database_path() }
    }
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_key: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            keep_alive_secs: default_keep_alive_secs(),
            idle_timeout_secs: None,
        }
    }
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self { url_template: default_url_template() }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level() }
    }
}

impl TagscanConfig {
    /// Parse a TOML config file
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
    }

    /// Load config with graceful degradation, then apply environment overrides
    ///
    /// `explicit_path` comes from `--config`; when absent the platform default
    /// location is tried.
    pub fn resolve(explicit_path: Option<&Path>) -> Result<Self> {
        let path = explicit_path.map(Path::to_path_buf).or_else(default_config_path);

        let mut config = match path {
            Some(path) if path.exists() => {
                info!("Loading configuration from {}", path.display());
                Self::load_from_path(&path)?
            }
            Some(path) => {
                warn!("Config file {} not found, using defaults", path.display());
                Self::default()
            }
            None => {
                warn!("No config directory available, using defaults");
                Self::default()
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Overlay `TAGSCAN_*` environment variables
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("TAGSCAN_HOST") {
            self.server.host = v;
        }
        if let Some(v) = env_parse::<u16>("TAGSCAN_PORT") {
            self.server.port = v;
        }
        if let Ok(v) = std::env::var("TAGSCAN_DATABASE") {
            self.database.path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("TAGSCAN_JWT_SECRET") {
            self.auth.jwt_secret = Some(v);
        }
        if let Ok(v) = std::env::var("TAGSCAN_VISION_API_KEY") {
            self.vision.api_key = Some(v);
        }
        if let Ok(v) = std::env::var("TAGSCAN_VISION_API_BASE") {
            self.vision.api_base = v;
        }
        if let Ok(v) = std::env::var("TAGSCAN_VISION_MODEL") {
            self.vision.model = v;
        }
        if let Ok(v) = std::env::var("TAGSCAN_LOG_LEVEL") {
            self.logging.level = v;
        }
    }

    /// Startup validation
    pub fn validate(&self) -> Result<()> {
        match self.auth.jwt_secret.as_deref().map(str::trim) {
            None | Some("") => {
                return Err(Error::Config(
                    "JWT secret not configured. Set [auth] jwt_secret or TAGSCAN_JWT_SECRET"
                        .to_string(),
                ))
            }
            Some(_) => {}
        }
        if self.pipeline.max_concurrency == 0 {
            return Err(Error::Config("pipeline.max_concurrency must be at least 1".to_string()));
        }
        if self.vision.timeout_secs == 0 {
            return Err(Error::Config("vision.timeout_secs must be at least 1".to_string()));
        }
        if self.live.channel_capacity == 0 {
            return Err(Error::Config("live.channel_capacity must be at least 1".to_string()));
        }
        if !self.assets.url_template.contains("{tag}") {
            return Err(Error::Config("assets.url_template must contain {tag}".to_string()));
        }
        Ok(())
    }
}

/// Platform config location (`~/.config/tagscan/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tagscan").join("config.toml"))
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("Ignoring unparsable {}={}", name, raw);
            None
        }
    }
}
