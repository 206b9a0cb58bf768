//! TOML configuration parsing and validation.
//!
//! ```toml
//! [db]
//! path = "./data/visionaid.sqlite"
//!
//! [server]
//! bind = "127.0.0.1:5000"
//!
//! [vision]
//! provider = "openai"
//! model = "gpt-4o"
//! timeout_secs = 15
//! ```
//!
//! `[vision]` and `[logging]` may be omitted; every key except `db.path` and
//! `server.bind` has a default.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub vision: VisionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
    /// Request body limit. Base64 camera frames routinely exceed Axum's
    /// 2 MiB default.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

#[derive(Debug, Deserialize, Clone)]
pub struct VisionConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Base URL of an OpenAI-compatible API, without the trailing
    /// `/chat/completions`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}
fn default_model() -> String {
    "gpt-4o".to_string()
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_max_tokens() -> u32 {
    visionaid_core::vision::DEFAULT_MAX_TOKENS
}
fn default_timeout_secs() -> u64 {
    15
}

impl VisionConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Default `tracing` filter directive; `RUST_LOG` takes precedence.
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

impl Config {
    /// Validate a parsed config.
    pub fn validate(&self) -> Result<()> {
        if self.server.bind.trim().is_empty() {
            anyhow::bail!("server.bind must not be empty");
        }
        if self.server.max_body_bytes == 0 {
            anyhow::bail!("server.max_body_bytes must be > 0");
        }

        match self.vision.provider.as_str() {
            "disabled" | "openai" => {}
            other => anyhow::bail!(
                "Unknown vision provider: '{}'. Must be disabled or openai.",
                other
            ),
        }

        if self.vision.is_enabled() {
            if self.vision.model.trim().is_empty() {
                anyhow::bail!("vision.model must be specified when provider is 'openai'");
            }
            if self.vision.base_url.trim().is_empty() {
                anyhow::bail!("vision.base_url must not be empty");
            }
        }
        if self.vision.max_tokens == 0 {
            anyhow::bail!("vision.max_tokens must be > 0");
        }
        if self.vision.timeout_secs == 0 {
            anyhow::bail!("vision.timeout_secs must be > 0");
        }

        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;

    Ok(config)
}
