//! Configuration management for Parley
//!
//! Supports environment variables, config files, and runtime overrides.
//!
//! Config file location: ~/.config/parley/config.toml

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::core::error::{ParleyError, Result};

/// Main configuration for Parley
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// OpenRouter configuration
    #[serde(default)]
    pub openrouter: OpenRouterConfig,
    /// Which model plays each agent
    #[serde(default)]
    pub models: ModelConfig,
    /// Turn loop settings
    #[serde(default)]
    pub negotiation: NegotiationConfig,
    /// Agent behavior configuration
    #[serde(default)]
    pub agent: AgentConfig,
}

/// OpenRouter API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenRouterConfig {
    /// API key. Read from OPENROUTER_API_KEY; never written back unless set in the file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// API base URL
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Sent as HTTP-Referer for OpenRouter attribution
    pub referer: String,
    /// Sent as X-Title for OpenRouter attribution
    pub title: String,
}

/// Model configuration for the two agents
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Model for agent A, the primary proposer
    pub agent_a: String,
    /// Model for agent B, the critical reviewer
    pub agent_b: String,
}

/// Negotiation loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NegotiationConfig {
    /// Maximum full A/B rounds before giving up
    /// Default: 20
    pub max_rounds: usize,
    /// Pause between turns in milliseconds (0 disables)
    /// Default: 500
    pub turn_delay_ms: u64,
    /// Sampling temperature sent to the provider
    pub temperature: f32,
    /// Maximum tokens per turn
    pub max_tokens: u32,
    /// Buffered session events before the engine waits for the consumer
    pub channel_capacity: usize,
}

/// Agent behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Whether to show debug output
    pub debug: bool,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key: env::var("OPENROUTER_API_KEY").ok().filter(|k| !k.is_empty()),
            base_url: env::var("OPENROUTER_BASE_URL")
                .unwrap_or_else(|_| "https://openrouter.ai/api/v1".to_string()),
            timeout_secs: 300,
            referer: "https://parley.coey.dev".to_string(),
            title: "Parley".to_string(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            agent_a: env::var("PARLEY_MODEL_A")
                .unwrap_or_else(|_| "anthropic/claude-3-opus".to_string()),
            agent_b: env::var("PARLEY_MODEL_B").unwrap_or_else(|_| "openai/gpt-4o".to_string()),
        }
    }
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            max_rounds: env::var("PARLEY_MAX_ROUNDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(20),
            turn_delay_ms: 500,
            temperature: 0.7,
            max_tokens: 4096,
            channel_capacity: 64,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            debug: env::var("PARLEY_DEBUG")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("parley")
    }

    /// Get the config file path
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from file, environment, and defaults
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load() -> Self {
        // Try to load .env file if it exists
        let _ = dotenvy::dotenv();

        let mut config = match Self::load_from_file() {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!("Using default configuration: {}", e);
                Self::default()
            }
        };
        config.apply_env();
        config
    }

    /// Load configuration from file only
    pub fn load_from_file() -> Result<Self> {
        let config_path = Self::config_file();

        if !config_path.exists() {
            return Err(ParleyError::config("Config file not found"));
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|e| ParleyError::config(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| ParleyError::config(format!("Failed to parse config: {}", e)))
    }

    /// Environment variables win over the config file
    fn apply_env(&mut self) {
        if let Some(key) = env::var("OPENROUTER_API_KEY").ok().filter(|k| !k.is_empty()) {
            self.openrouter.api_key = Some(key);
        }
        if let Ok(model) = env::var("PARLEY_MODEL_A") {
            self.models.agent_a = model;
        }
        if let Ok(model) = env::var("PARLEY_MODEL_B") {
            self.models.agent_b = model;
        }
        if let Some(rounds) = env::var("PARLEY_MAX_ROUNDS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.negotiation.max_rounds = rounds;
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_dir = Self::config_dir();
        let config_path = Self::config_file();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .map_err(|e| ParleyError::config(format!("Failed to create config dir: {}", e)))?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ParleyError::config(format!("Failed to serialize config: {}", e)))?;

        fs::write(&config_path, content)
            .map_err(|e| ParleyError::config(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Save configuration and return the path
    pub fn save_and_get_path(&self) -> Result<PathBuf> {
        self.save()?;
        Ok(Self::config_file())
    }

    /// The API key, or a configuration error explaining how to set it
    pub fn api_key(&self) -> Result<&str> {
        self.openrouter
            .api_key
            .as_deref()
            .ok_or_else(|| ParleyError::config("OpenRouter API key not configured (set OPENROUTER_API_KEY)"))
    }

    /// Pause between turns
    pub fn turn_delay(&self) -> Duration {
        Duration::from_millis(self.negotiation.turn_delay_ms)
    }

    /// Generate a default config file content for display
    pub fn default_config_toml() -> String {
        let mut config = Config::default();
        config.openrouter.api_key = None;
        toml::to_string_pretty(&config)
            .unwrap_or_else(|_| String::from("# Error generating config"))
    }
}
