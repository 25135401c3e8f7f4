//! Configuration Management Module
//!
//! Assistant configuration loaded once at startup from a TOML, JSON or YAML
//! file, overridden from `KUBEASSIST_*` environment variables and validated
//! before anything is served. The loaded value is immutable and shared.

use crate::policy::PolicyConfig;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "KUBEASSIST_";

/// Configuration file format
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    #[default]
    Toml,
    Yaml,
}

impl ConfigFormat {
    /// Detect the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| anyhow!("Config file {:?} has no extension", path))?;
        ext.parse()
    }
}

impl std::str::FromStr for ConfigFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ConfigFormat::Json),
            "toml" => Ok(ConfigFormat::Toml),
            "yaml" | "yml" => Ok(ConfigFormat::Yaml),
            _ => Err(anyhow!("Unsupported config format: {}", s)),
        }
    }
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Maximum accepted request body, in bytes
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            max_body_bytes: 16 * 1024,
        }
    }
}

/// Cluster CLI invocation settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClusterConfig {
    /// Cluster CLI program, invoked without a shell
    pub binary: String,
    pub default_namespace: String,
    pub command_timeout_seconds: u64,
    /// Byte cap per captured stream
    pub max_output_bytes: usize,
    /// Resolve partial resource names against the cluster before running
    pub resolve_names: bool,
    pub resolve_timeout_seconds: u64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            binary: "kubectl".to_string(),
            default_namespace: "default".to_string(),
            command_timeout_seconds: 30,
            max_output_bytes: 256 * 1024,
            resolve_names: true,
            resolve_timeout_seconds: 10,
        }
    }
}

impl ClusterConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_seconds)
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.resolve_timeout_seconds)
    }
}

/// Text generation provider
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Disabled,
    OpenAi,
    Anthropic,
    Ollama,
    Stub,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::Disabled => "disabled",
            LlmProvider::OpenAi => "openai",
            LlmProvider::Anthropic => "anthropic",
            LlmProvider::Ollama => "ollama",
            LlmProvider::Stub => "stub",
        }
    }
}

impl std::str::FromStr for LlmProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "disabled" | "none" | "off" => Ok(LlmProvider::Disabled),
            "openai" => Ok(LlmProvider::OpenAi),
            "anthropic" => Ok(LlmProvider::Anthropic),
            "ollama" => Ok(LlmProvider::Ollama),
            "stub" => Ok(LlmProvider::Stub),
            _ => Err(anyhow!("Unknown LLM provider: {}", s)),
        }
    }
}

/// Text generation settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub base_url: Option<String>,
    pub model: String,
    /// Literal key or `env:VAR` reference
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Ask the model to interpret queries the lexicon cannot
    pub extraction_fallback: bool,
    /// Ask the model to summarize command output
    pub enhance_responses: bool,
    /// Fixed reply for the stub provider
    pub stub_response: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Disabled,
            base_url: None,
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            timeout_seconds: 15,
            max_tokens: 512,
            temperature: 0.0,
            extraction_fallback: true,
            enhance_responses: true,
            stub_response: None,
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(anyhow!("Unsupported log format: {}", s)),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// Complete assistant configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AssistantConfig {
    pub server: ServerConfig,
    pub cluster: ClusterConfig,
    pub policy: PolicyConfig,
    pub llm: LlmConfig,
    pub logging: LoggingConfig,
}

impl AssistantConfig {
    /// Load configuration for startup
    ///
    /// An explicit path must exist. Without one, the first of
    /// `<config_dir>/kubeassist/config.{toml,json,yaml,yml}` is used, falling
    /// back to defaults. Environment overrides and validation always apply.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::discover() {
                Some(found) => Self::from_file(&found)?,
                None => {
                    debug!("No configuration file found, using defaults");
                    Self::default()
                }
            },
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration file, format chosen by extension
    pub fn from_file(path: &Path) -> Result<Self> {
        let format = ConfigFormat::from_path(path)?;
        let content = fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read config file {:?}: {}", path, e))?;
        let config = Self::from_str_with_format(&content, format)?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub fn from_str_with_format(content: &str, format: ConfigFormat) -> Result<Self> {
        let config = match format {
            ConfigFormat::Toml => toml::from_str(content)
                .map_err(|e| anyhow!("Failed to parse TOML config: {}", e))?,
            ConfigFormat::Json => serde_json::from_str(content)
                .map_err(|e| anyhow!("Failed to parse JSON config: {}", e))?,
            ConfigFormat::Yaml => serde_yaml::from_str(content)
                .map_err(|e| anyhow!("Failed to parse YAML config: {}", e))?,
        };
        Ok(config)
    }

    pub fn to_string_with_format(&self, format: ConfigFormat) -> Result<String> {
        let content = match format {
            ConfigFormat::Toml => toml::to_string_pretty(self)
                .map_err(|e| anyhow!("Failed to serialize TOML config: {}", e))?,
            ConfigFormat::Json => serde_json::to_string_pretty(self)
                .map_err(|e| anyhow!("Failed to serialize JSON config: {}", e))?,
            ConfigFormat::Yaml => serde_yaml::to_string(self)
                .map_err(|e| anyhow!("Failed to serialize YAML config: {}", e))?,
        };
        Ok(content)
    }

    /// Default configuration directory, `<config_dir>/kubeassist`
    pub fn default_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("kubeassist"))
    }

    fn discover() -> Option<PathBuf> {
        let base = Self::default_dir()?.join("config");
        ["toml", "json", "yaml", "yml"]
            .iter()
            .map(|ext| base.with_extension(ext))
            .find(|candidate| candidate.exists())
    }

    /// Apply `KUBEASSIST_*` environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|name| std::env::var(format!("{}{}", ENV_PREFIX, name)).ok())
    }

    /// Apply overrides from a lookup keyed by the unprefixed variable name
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = parse_env("PORT", &port)?;
        }
        if let Some(binary) = lookup("KUBECTL") {
            self.cluster.binary = binary;
        }
        if let Some(namespace) = lookup("DEFAULT_NAMESPACE") {
            self.cluster.default_namespace = namespace;
        }
        if let Some(timeout) = lookup("COMMAND_TIMEOUT") {
            self.cluster.command_timeout_seconds = parse_env("COMMAND_TIMEOUT", &timeout)?;
        }
        if let Some(bytes) = lookup("MAX_OUTPUT_BYTES") {
            self.cluster.max_output_bytes = parse_env("MAX_OUTPUT_BYTES", &bytes)?;
        }
        if let Some(resolve) = lookup("RESOLVE_NAMES") {
            self.cluster.resolve_names = parse_bool("RESOLVE_NAMES", &resolve)?;
        }
        if let Some(provider) = lookup("LLM_PROVIDER") {
            self.llm.provider = provider.parse()?;
        }
        if let Some(model) = lookup("LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(base_url) = lookup("LLM_BASE_URL") {
            self.llm.base_url = Some(base_url);
        }
        if let Some(api_key) = lookup("LLM_API_KEY") {
            self.llm.api_key = Some(api_key);
        }
        if let Some(timeout) = lookup("LLM_TIMEOUT") {
            self.llm.timeout_seconds = parse_env("LLM_TIMEOUT", &timeout)?;
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("LOG_FORMAT") {
            self.logging.format = format.parse()?;
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            return Err(anyhow!("server.host must not be empty"));
        }
        if self.server.max_body_bytes == 0 {
            return Err(anyhow!("server.max_body_bytes must be positive"));
        }

        let binary = self.cluster.binary.trim();
        if binary.is_empty() {
            return Err(anyhow!("cluster.binary must not be empty"));
        }
        if binary.contains(char::is_whitespace) {
            return Err(anyhow!(
                "cluster.binary must be a single program, got '{}'",
                binary
            ));
        }
        if !crate::policy::is_valid_namespace(&self.cluster.default_namespace) {
            return Err(anyhow!(
                "cluster.default_namespace '{}' is not a valid namespace",
                self.cluster.default_namespace
            ));
        }
        if self.cluster.command_timeout_seconds == 0 {
            return Err(anyhow!("cluster.command_timeout_seconds must be positive"));
        }
        if self.cluster.resolve_timeout_seconds == 0 {
            return Err(anyhow!("cluster.resolve_timeout_seconds must be positive"));
        }
        if self.cluster.max_output_bytes == 0 {
            return Err(anyhow!("cluster.max_output_bytes must be positive"));
        }

        self.policy
            .validate()
            .map_err(|e| anyhow!("Invalid policy: {}", e))?;

        if self.llm.provider != LlmProvider::Disabled {
            if self.llm.timeout_seconds == 0 {
                return Err(anyhow!("llm.timeout_seconds must be positive"));
            }
            if self.llm.model.trim().is_empty() && self.llm.provider != LlmProvider::Stub {
                return Err(anyhow!("llm.model must not be empty"));
            }
            if !(0.0..=2.0).contains(&self.llm.temperature) {
                return Err(anyhow!(
                    "llm.temperature must be between 0.0 and 2.0, got {}",
                    self.llm.temperature
                ));
            }
            if matches!(self.llm.provider, LlmProvider::OpenAi | LlmProvider::Anthropic)
                && self.llm.api_key.is_none()
            {
                warn!(
                    "LLM provider '{}' has no api_key configured",
                    self.llm.provider.as_str()
                );
            }
        }

        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| anyhow!("Invalid value for {}{}: '{}'", ENV_PREFIX, name, value))
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(anyhow!(
            "Invalid boolean for {}{}: '{}'",
            ENV_PREFIX,
            name,
            value
        )),
    }
}
