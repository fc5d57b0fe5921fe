//! Configuration system (layered: explicit > env > toml file > defaults).

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConvoyError, Result};

/// Model parameters passed through to the decision collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelSettings {
    pub name: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            name: "static".into(),
            temperature: 0.7,
            max_tokens: 1024,
        }
    }
}

/// Gateway configuration.
///
/// Resolution order: values set in code win over environment variables
/// (`CONVOY_*`), which win over the optional toml file, which wins over
/// the defaults below.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConvoyConfig {
    /// Bind address for the HTTP surface.
    pub host: String,
    /// Bind port for the HTTP surface.
    pub port: u16,
    /// Allowed CORS origins; `["*"]` allows any.
    pub cors_origins: Vec<String>,
    /// Iteration budget per turn.
    pub max_iterations: usize,
    /// History length that triggers background archival.
    pub memory_window: usize,
    /// Per-subscriber inbox capacity; overflow drops the newest envelope.
    pub stream_buffer: usize,
    pub model: ModelSettings,
}

impl Default for ConvoyConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
            cors_origins: vec!["*".into()],
            max_iterations: 20,
            memory_window: 50,
            stream_buffer: 256,
            model: ModelSettings::default(),
        }
    }
}

impl ConvoyConfig {
    /// Load configuration: defaults, then the toml file (if given), then env.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.overlay_env();
        Ok(config)
    }

    /// Parse a toml configuration file. Missing keys fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw)
            .map_err(|e| ConvoyError::Configuration(format!("{}: {e}", path.display())))
    }

    /// Load from environment variables only (`.env` honored if present).
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        let mut config = Self::default();
        config.overlay_env();
        config
    }

    fn overlay_env(&mut self) {
        if let Ok(host) = std::env::var("CONVOY_HOST") {
            self.host = host;
        }
        if let Some(port) = env_parse("CONVOY_PORT") {
            self.port = port;
        }
        if let Ok(origins) = std::env::var("CONVOY_CORS_ORIGINS") {
            self.cors_origins = origins.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Some(n) = env_parse("CONVOY_MAX_ITERATIONS") {
            self.max_iterations = n;
        }
        if let Some(n) = env_parse("CONVOY_MEMORY_WINDOW") {
            self.memory_window = n;
        }
        if let Some(n) = env_parse("CONVOY_STREAM_BUFFER") {
            self.stream_buffer = n;
        }
        if let Ok(name) = std::env::var("CONVOY_MODEL") {
            self.model.name = name;
        }
        if let Some(t) = env_parse("CONVOY_TEMPERATURE") {
            self.model.temperature = t;
        }
        if let Some(n) = env_parse("CONVOY_MAX_TOKENS") {
            self.model.max_tokens = n;
        }
    }
}

fn env_parse<T: std::str::FromStr>(var: &str) -> Option<T> {
    std::env::var(var).ok().and_then(|v| v.parse().ok())
}
