//! Process-wide configuration, read once at startup.

use std::fmt;
use std::time::Duration;

use tracing::debug;

use crate::backend::openai::{DEFAULT_BASE_URL, Model};
use crate::error::{Result, TriageError};

pub const API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const MODEL_VAR: &str = "DAMAGE_TRIAGE_MODEL";
pub const BASE_URL_VAR: &str = "DAMAGE_TRIAGE_BASE_URL";
pub const TIMEOUT_VAR: &str = "DAMAGE_TRIAGE_TIMEOUT_SECS";
pub const MAX_TOKENS_VAR: &str = "DAMAGE_TRIAGE_MAX_TOKENS";

pub const DEFAULT_MAX_TOKENS: u32 = 1000;

/// Settings for talking to the completion endpoint.
///
/// `Debug` never prints the API key.
#[derive(Clone)]
pub struct TriageConfig {
    pub api_key: String,
    pub model: Model,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub timeout: Option<Duration>,
    pub base_url: String,
}

impl TriageConfig {
    /// Configuration with defaults for everything but the key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(TriageError::Configuration(format!(
                "{} is empty",
                API_KEY_VAR
            )));
        }
        Ok(Self {
            api_key,
            model: Model::Gpt4O,
            temperature: 0.0,
            max_tokens: Some(DEFAULT_MAX_TOKENS),
            timeout: None,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Read configuration from the process environment.
    ///
    /// `OPENAI_API_KEY` is required. `DAMAGE_TRIAGE_MODEL`, `DAMAGE_TRIAGE_BASE_URL`,
    /// `DAMAGE_TRIAGE_TIMEOUT_SECS` and `DAMAGE_TRIAGE_MAX_TOKENS` are optional.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(API_KEY_VAR).ok_or_else(|| {
            TriageError::Configuration(format!("{} is not set", API_KEY_VAR))
        })?;
        let mut config = Self::new(api_key)?;

        if let Some(model) = lookup(MODEL_VAR).filter(|m| !m.trim().is_empty()) {
            config.model = Model::from_string(model.trim());
        }
        if let Some(base_url) = lookup(BASE_URL_VAR).filter(|u| !u.trim().is_empty()) {
            let base_url = base_url.trim().trim_end_matches('/');
            if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
                return Err(TriageError::Configuration(format!(
                    "{} must be an http(s) URL, got {:?}",
                    BASE_URL_VAR, base_url
                )));
            }
            config.base_url = base_url.to_string();
        }
        if let Some(raw) = lookup(TIMEOUT_VAR) {
            let secs: f64 = raw.trim().parse().map_err(|_| {
                TriageError::Configuration(format!("{} must be a number, got {:?}", TIMEOUT_VAR, raw))
            })?;
            if !secs.is_finite() || secs <= 0.0 {
                return Err(TriageError::Configuration(format!(
                    "{} must be positive, got {}",
                    TIMEOUT_VAR, secs
                )));
            }
            config.timeout = Some(Duration::from_secs_f64(secs));
        }
        if let Some(raw) = lookup(MAX_TOKENS_VAR) {
            let max: u32 = raw.trim().parse().map_err(|_| {
                TriageError::Configuration(format!(
                    "{} must be a positive integer, got {:?}",
                    MAX_TOKENS_VAR, raw
                ))
            })?;
            config.max_tokens = Some(max.max(1));
        }

        debug!(config = ?config, "Loaded configuration");
        Ok(config)
    }
}

impl fmt::Debug for TriageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriageConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout", &self.timeout)
            .field("base_url", &self.base_url)
            .finish()
    }
}
