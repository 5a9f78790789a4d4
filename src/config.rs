//! Configuration management with environment variable support.
//!
//! This module provides centralized configuration for bug-vision, supporting:
//! - Environment variables for all configurable values
//! - Defaults that work against a local Ollama install
//! - A cached process-wide instance via [`get`]
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `ANALYSIS_MODE` | `mock` or `ollama` | `mock` |
//! | `OLLAMA_URL` | Ollama base URL | `http://127.0.0.1:11434` |
//! | `OLLAMA_MODEL` | Model name (vision-capable for screenshots) | `llava` |
//! | `BUG_VISION_REQUEST_TIMEOUT` | Analysis request timeout in seconds | `180` |
//! | `BUG_VISION_PROBE_TIMEOUT` | Startup reachability probe timeout in seconds | `5` |
//! | `BUG_VISION_MAX_CONCURRENCY` | Analyses the bot runs at once | `4` |
//! | `TELEGRAM_BOT_TOKEN` | Telegram bot token (only for the `telegram` command) | unset |
//! | `TELEGRAM_API_URL` | Telegram Bot API base URL | `https://api.telegram.org` |
//!
//! `ANALYSIS_MODE` and `TELEGRAM_BOT_TOKEN` are read by the CLI arguments
//! (see `ENV_*`); everything else is cached in [`Config`].
//!
//! # Example
//!
//! ```bash
//! export ANALYSIS_MODE=ollama
//! export OLLAMA_MODEL=llava:13b
//! # First request to a vision model can be slow
//! export BUG_VISION_REQUEST_TIMEOUT=300
//! ```

use std::env;
use std::sync::OnceLock;

// ============================================================================
// Default Values
// ============================================================================

/// Default Ollama base URL (127.0.0.1 avoids IPv6 resolution of localhost)
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Default model name
pub const DEFAULT_OLLAMA_MODEL: &str = "llava";

/// Default analysis request timeout (seconds); vision models are slow on first load
pub const DEFAULT_REQUEST_TIMEOUT: u64 = 180;

/// Default reachability probe timeout (seconds)
pub const DEFAULT_PROBE_TIMEOUT: u64 = 5;

/// Default number of analyses the bot runs concurrently
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Default Telegram Bot API base URL
pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Maximum UTF-16 code units per outbound chat message (Telegram counts in UTF-16)
pub const MAX_MESSAGE_UNITS: usize = 4096;

// ============================================================================
// Environment Variable Names
// ============================================================================

/// Environment variable for backend selection
pub const ENV_ANALYSIS_MODE: &str = "ANALYSIS_MODE";

/// Environment variable for the Ollama base URL
pub const ENV_OLLAMA_URL: &str = "OLLAMA_URL";

/// Environment variable for the Ollama model
pub const ENV_OLLAMA_MODEL: &str = "OLLAMA_MODEL";

/// Environment variable for the analysis request timeout
pub const ENV_REQUEST_TIMEOUT: &str = "BUG_VISION_REQUEST_TIMEOUT";

/// Environment variable for the probe timeout
pub const ENV_PROBE_TIMEOUT: &str = "BUG_VISION_PROBE_TIMEOUT";

/// Environment variable for bot concurrency
pub const ENV_MAX_CONCURRENCY: &str = "BUG_VISION_MAX_CONCURRENCY";

/// Environment variable for the Telegram bot token
pub const ENV_TELEGRAM_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";

/// Environment variable for the Telegram Bot API base URL
pub const ENV_TELEGRAM_API_URL: &str = "TELEGRAM_API_URL";

// ============================================================================
// Configuration Getters (with caching)
// ============================================================================

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Get the global configuration (initialized from environment on first access)
pub fn get() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

/// Which analysis backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisMode {
    /// Static canned results, no network
    Mock,
    /// Ollama-compatible generative backend
    Ollama,
}

impl AnalysisMode {
    /// Parse a mode name; anything unrecognized selects the mock backend.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "ollama" => AnalysisMode::Ollama,
            _ => AnalysisMode::Mock,
        }
    }
}

/// Centralized configuration for bug-vision
#[derive(Debug, Clone)]
pub struct Config {
    /// Analysis backend configuration
    pub analysis: AnalysisSettings,
    /// Chat bot configuration
    pub bot: BotSettings,
}

/// Analysis backend settings
#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    /// Ollama base URL
    pub ollama_url: String,
    /// Ollama model name
    pub ollama_model: String,
    /// Analysis request timeout (seconds)
    pub request_timeout: u64,
    /// Reachability probe timeout (seconds)
    pub probe_timeout: u64,
}

/// Chat bot settings
#[derive(Debug, Clone)]
pub struct BotSettings {
    /// Telegram Bot API base URL
    pub telegram_api_url: String,
    /// Analyses run concurrently by the bot
    pub max_concurrency: usize,
}

impl Config {
    /// Create configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            analysis: AnalysisSettings::from_env(),
            bot: BotSettings::from_env(),
        }
    }

    /// Create configuration with all defaults (ignoring environment)
    pub fn defaults() -> Self {
        Self {
            analysis: AnalysisSettings::defaults(),
            bot: BotSettings::defaults(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

impl AnalysisSettings {
    /// Create analysis settings from environment variables
    pub fn from_env() -> Self {
        Self {
            ollama_url: non_empty_var(ENV_OLLAMA_URL)
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            ollama_model: non_empty_var(ENV_OLLAMA_MODEL)
                .unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
            request_timeout: parse_var(ENV_REQUEST_TIMEOUT).unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            probe_timeout: parse_var(ENV_PROBE_TIMEOUT).unwrap_or(DEFAULT_PROBE_TIMEOUT),
        }
    }

    /// Create analysis settings with defaults
    pub fn defaults() -> Self {
        Self {
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            ollama_model: DEFAULT_OLLAMA_MODEL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

impl BotSettings {
    /// Create bot settings from environment variables
    pub fn from_env() -> Self {
        Self {
            telegram_api_url: non_empty_var(ENV_TELEGRAM_API_URL)
                .unwrap_or_else(|| DEFAULT_TELEGRAM_API_URL.to_string()),
            max_concurrency: parse_var::<usize>(ENV_MAX_CONCURRENCY)
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_MAX_CONCURRENCY),
        }
    }

    /// Create bot settings with defaults
    pub fn defaults() -> Self {
        Self {
            telegram_api_url: DEFAULT_TELEGRAM_API_URL.to_string(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Read a variable, treating an empty value as unset
fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Read and parse a variable, ignoring values that do not parse
fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.trim().parse().ok())
}
