use crate::constants::*;
use crate::error::{PipelineError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub registry: RegistryConfig,
    pub retry: RetryConfig,
    pub output: OutputConfig,
    pub enrichment: EnrichmentConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// URL template, `{}` is replaced by the normalized identifier
    pub base_url: String,
    pub timeout_seconds: u64,
    pub workers: usize,
    pub delay_ms: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_REGISTRY_URL.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            workers: DEFAULT_WORKERS,
            delay_ms: DEFAULT_DELAY_MS,
        }
    }
}

impl RegistryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_RETRY_MAX_DELAY_MS,
            multiplier: DEFAULT_RETRY_MULTIPLIER,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    pub table_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the file when it exists, otherwise fall back to defaults.
    /// Environment overrides are applied in both cases.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            info!(path = %path.display(), "Loading configuration");
            Self::load(path)?
        } else {
            warn!(path = %path.display(), "Config file not found, using defaults");
            Self::default()
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply `CNPJ_REGISTRY_URL`, `CNPJ_WORKERS` and `CNPJ_OUTPUT_DIR`.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("CNPJ_REGISTRY_URL") {
            if !url.trim().is_empty() {
                self.registry.base_url = url;
            }
        }
        if let Ok(workers) = std::env::var("CNPJ_WORKERS") {
            self.registry.workers = workers
                .trim()
                .parse()
                .map_err(|e| PipelineError::Config(format!("CNPJ_WORKERS: {e}")))?;
        }
        if let Ok(dir) = std::env::var("CNPJ_OUTPUT_DIR") {
            if !dir.trim().is_empty() {
                self.output.dir = PathBuf::from(dir);
            }
        }
        self.validate()
    }

    fn validate(&self) -> Result<()> {
        if !self.registry.base_url.contains("{}") {
            return Err(PipelineError::Config(format!(
                "registry.base_url must contain a '{{}}' placeholder: {}",
                self.registry.base_url
            )));
        }
        if self.registry.workers == 0 {
            return Err(PipelineError::Config("registry.workers must be at least 1".to_string()));
        }
        if self.retry.max_attempts == 0 {
            return Err(PipelineError::Config("retry.max_attempts must be at least 1".to_string()));
        }
        Ok(())
    }
}
