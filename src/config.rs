//! Server configuration: TOML file, then environment, then CLI flags.

use crate::llm_client::{LlmConfig, LlmProvider};
use derive_getters::Getters;
use derive_more::{Display, Error};
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Top-level server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Setters, Serialize, Deserialize)]
#[setters(prefix = "with_")]
pub struct ServerConfig {
    /// Interface to bind.
    #[serde(default = "default_host")]
    host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    port: u16,

    /// Largest board size a client may request.
    #[serde(default = "default_max_board_size")]
    max_board_size: usize,

    /// Answer `reset_game` with the older `game_reset` message.
    #[serde(default)]
    legacy_reset_message: bool,

    /// Search engine settings.
    #[serde(default)]
    engine: EngineConfig,

    /// Optional LLM move-oracle; absent means the engine always plays.
    #[serde(default)]
    oracle: Option<OracleConfig>,
}

/// Minimax engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Setters, Serialize, Deserialize)]
#[setters(prefix = "with_")]
pub struct EngineConfig {
    /// Wall-clock budget per opponent move, in milliseconds.
    #[serde(default = "default_search_budget_ms")]
    search_budget_ms: u64,
}

/// LLM move-oracle settings.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Setters, Serialize, Deserialize)]
#[setters(prefix = "with_")]
pub struct OracleConfig {
    /// Backend provider.
    #[serde(default = "default_provider")]
    provider: LlmProvider,

    /// Model name; the provider default when unset.
    #[serde(default)]
    model: Option<String>,

    /// Endpoint override, e.g. a self-hosted OpenAI-compatible server.
    #[serde(default)]
    base_url: Option<String>,

    /// Maximum tokens for the oracle reply.
    #[serde(default = "default_max_tokens")]
    max_tokens: u32,

    /// Time allowed for one suggestion, in milliseconds.
    #[serde(default = "default_oracle_timeout_ms")]
    timeout_ms: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_max_board_size() -> usize {
    10
}

fn default_search_budget_ms() -> u64 {
    2000
}

fn default_provider() -> LlmProvider {
    LlmProvider::Ollama
}

fn default_max_tokens() -> u32 {
    16
}

fn default_oracle_timeout_ms() -> u64 {
    10_000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_board_size: default_max_board_size(),
            legacy_reset_message: false,
            engine: EngineConfig::default(),
            oracle: None,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            search_budget_ms: default_search_budget_ms(),
        }
    }
}

impl EngineConfig {
    /// Search budget as a duration.
    pub fn search_budget(&self) -> Duration {
        Duration::from_millis(self.search_budget_ms)
    }
}

impl OracleConfig {
    /// Creates an oracle configuration with defaults for `provider`.
    pub fn new(provider: LlmProvider) -> Self {
        Self {
            provider,
            model: None,
            base_url: None,
            max_tokens: default_max_tokens(),
            timeout_ms: default_oracle_timeout_ms(),
        }
    }

    /// Suggestion timeout as a duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Model name with the provider default applied.
    pub fn resolved_model(&self) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| self.provider.default_model().to_string())
    }

    /// Base URL with the provider default applied.
    pub fn resolved_base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| self.provider.default_base_url().to_string())
    }

    /// Creates the LLM client configuration, reading the API key with `lookup`.
    ///
    /// Hosted providers need their key variable set; Ollama needs none.
    #[instrument(skip(self, lookup), fields(provider = %self.provider))]
    pub fn create_llm_config<F>(&self, lookup: F) -> Result<LlmConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        debug!("Creating LLM config");
        let api_key = match self.provider.api_key_var() {
            Some(var) => Some(lookup(var).ok_or_else(|| {
                ConfigError::new(format!("{} environment variable not set", var))
            })?),
            None => None,
        };

        Ok(LlmConfig::new(
            self.provider,
            api_key,
            self.resolved_model(),
            self.resolved_base_url(),
            self.max_tokens,
        ))
    }
}

impl ServerConfig {
    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;

        info!(host = %config.host, port = config.port, "Config loaded successfully");
        Ok(config)
    }

    /// Loads the file if given, then applies process environment overrides.
    #[instrument]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())
    }

    /// Applies environment overrides read through `lookup`.
    ///
    /// `ORACLE_PROVIDER` enables the oracle when the file did not. The
    /// `OLLAMA_*` variables only apply to an Ollama oracle.
    #[instrument(skip(self, lookup))]
    pub fn apply_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("SERVER_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("SERVER_PORT") {
            self.port = port
                .parse()
                .map_err(|e| ConfigError::new(format!("Invalid SERVER_PORT {:?}: {}", port, e)))?;
        }
        if let Some(budget) = lookup("SEARCH_BUDGET_MS") {
            self.engine.search_budget_ms = budget.parse().map_err(|e| {
                ConfigError::new(format!("Invalid SEARCH_BUDGET_MS {:?}: {}", budget, e))
            })?;
        }

        if let Some(name) = lookup("ORACLE_PROVIDER") {
            let provider: LlmProvider = name
                .parse()
                .map_err(|_| ConfigError::new(format!("Unknown ORACLE_PROVIDER {:?}", name)))?;
            match self.oracle.as_mut() {
                Some(oracle) => oracle.provider = provider,
                None => self.oracle = Some(OracleConfig::new(provider)),
            }
        }

        if let Some(oracle) = self.oracle.as_mut() {
            if let Some(model) = lookup("ORACLE_MODEL") {
                oracle.model = Some(model);
            }
            if let Some(url) = lookup("ORACLE_BASE_URL") {
                oracle.base_url = Some(url);
            }
            if oracle.provider == LlmProvider::Ollama {
                if oracle.model.is_none() {
                    oracle.model = lookup("OLLAMA_MODEL");
                }
                let host = lookup("OLLAMA_HOST");
                let port = lookup("OLLAMA_PORT");
                if oracle.base_url.is_none() && (host.is_some() || port.is_some()) {
                    let host = host.unwrap_or_else(|| "localhost".to_string());
                    let port = port.unwrap_or_else(|| "11434".to_string());
                    let host = if host.starts_with("http") {
                        host
                    } else {
                        format!("http://{}", host)
                    };
                    oracle.base_url = Some(format!("{}:{}", host, port));
                }
            }
        }

        if self.max_board_size < 3 {
            warn!(max_board_size = self.max_board_size, "max_board_size below 3, no game can start");
        }
        debug!(config = ?self, "Environment overrides applied");
        Ok(self)
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
