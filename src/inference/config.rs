//! Chat engine configuration loading and validation.
//!
//! Reads `config/chat.yaml` and resolves environment variables.
//! Every key has a default, so a missing file yields a usable config.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::errors::InferenceError;

/// Relative location of the config file under a project root.
const CONFIG_RELATIVE_PATH: &str = "config/chat.yaml";

/// Env var naming an explicit config file.
const CONFIG_ENV: &str = "ALFRED_CHAT_CONFIG";

/// Env var overriding the configured model.
const MODEL_ENV: &str = "CHATGPT_MODEL";

// ─── Public Types ────────────────────────────────────────────────────────────

/// Runtime configuration for the chat engine and its completion client.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Model id sent with every request.
    pub model: String,
    /// Endpoint root; `/chat/completions` is appended.
    pub base_url: String,
    /// Sampling temperature, `0.0..=1.0`. Higher is more creative.
    pub temperature: f32,
    /// Maximum characters per delivered chat message.
    pub max_reply_len: usize,
    /// Attempts made before a reply is classified degenerate.
    pub retry_bad_responses: u32,
    /// How long non-addressed messages may still be answered after a
    /// mandatory reply.
    pub corrections_window_secs: u64,
    /// Transport timeout for a single completion request.
    pub request_timeout_secs: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            temperature: 0.2,
            max_reply_len: 2000,
            retry_bad_responses: 3,
            corrections_window_secs: 60,
            request_timeout_secs: 60,
        }
    }
}

impl ChatConfig {
    /// Check bounds that serde cannot express.
    pub fn validate(&self) -> Result<(), InferenceError> {
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(InferenceError::ConfigError {
                reason: format!(
                    "temperature must be between 0 and 1, got {}",
                    self.temperature
                ),
            });
        }
        if self.max_reply_len == 0 {
            return Err(InferenceError::ConfigError {
                reason: "max_reply_len must be positive".into(),
            });
        }
        if self.retry_bad_responses == 0 {
            return Err(InferenceError::ConfigError {
                reason: "retry_bad_responses must be at least 1".into(),
            });
        }
        if self.model.trim().is_empty() {
            return Err(InferenceError::ConfigError {
                reason: "model must not be empty".into(),
            });
        }
        Ok(())
    }

    /// Apply `CHATGPT_MODEL` if it is set and non-empty.
    fn apply_env_overrides(&mut self) {
        if let Ok(model) = std::env::var(MODEL_ENV) {
            if !model.trim().is_empty() {
                self.model = model;
            }
        }
    }
}

// ─── Loading ─────────────────────────────────────────────────────────────────

/// Locate the config file.
///
/// Checks `ALFRED_CHAT_CONFIG` first, then searches upward from `start` for
/// `config/chat.yaml`. Returns `None` when neither exists.
pub fn find_config_path(start: &Path) -> Option<PathBuf> {
    // 1. Explicit file
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        let candidate = PathBuf::from(expand_tilde(&path));
        if candidate.exists() {
            return Some(candidate);
        }
        tracing::warn!(path = %candidate.display(), "{CONFIG_ENV} points at a missing file");
    }

    // 2. Walk upward from `start`
    let mut dir = start.to_path_buf();
    loop {
        let candidate = dir.join(CONFIG_RELATIVE_PATH);
        if candidate.exists() {
            return Some(candidate);
        }
        if !dir.pop() {
            break;
        }
    }

    None
}

/// Load and validate a config file.
///
/// Performs environment-variable interpolation on values matching
/// `${VAR_NAME}` or `${VAR_NAME:-default}` before parsing.
pub fn load_chat_config(path: &Path) -> Result<ChatConfig, InferenceError> {
    let raw = std::fs::read_to_string(path).map_err(|e| InferenceError::ConfigError {
        reason: format!("failed to read {}: {e}", path.display()),
    })?;

    let mut config = parse_chat_config(&raw)?;
    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

/// Load the discovered config file, or defaults when there is none.
pub fn load_or_default(start: &Path) -> Result<ChatConfig, InferenceError> {
    match find_config_path(start) {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading chat config");
            load_chat_config(&path)
        }
        None => {
            tracing::info!("no chat config found, using defaults");
            let mut config = ChatConfig::default();
            config.apply_env_overrides();
            config.validate()?;
            Ok(config)
        }
    }
}

fn parse_chat_config(raw: &str) -> Result<ChatConfig, InferenceError> {
    let interpolated = interpolate_env_vars(raw);
    if interpolated.trim().is_empty() {
        return Ok(ChatConfig::default());
    }
    serde_yaml::from_str(&interpolated).map_err(|e| InferenceError::ConfigError {
        reason: format!("failed to parse config: {e}"),
    })
}

// ─── Env-var interpolation ───────────────────────────────────────────────────

/// Replace `${VAR}` and `${VAR:-default}` in a string.
fn interpolate_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_expr = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_expr.push(c);
            }
            result.push_str(&resolve_var_expr(&var_expr));
        } else {
            result.push(ch);
        }
    }

    result
}

/// Resolve a variable expression like `VAR` or `VAR:-default`.
fn resolve_var_expr(expr: &str) -> String {
    match expr.split_once(":-") {
        Some((var_name, default)) => {
            std::env::var(var_name).unwrap_or_else(|_| expand_tilde(default))
        }
        None => std::env::var(expr).unwrap_or_default(),
    }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            return format!("{}{rest}", home.display());
        }
    }
    path.to_string()
}

// ─── Tests ───────────────────────────────────────────────────────────────────
