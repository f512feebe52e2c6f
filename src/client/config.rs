//! Layered configuration: client defaults overlaid by per-call options.
//!
//! Defaults load from YAML or JSON and can be adjusted from the environment:
//! - `HTTP_LIFECYCLE_CACHE_EXPIRY_MS`
//! - `HTTP_LIFECYCLE_RETRY_MAX_ATTEMPTS`
//! - `HTTP_LIFECYCLE_RETRY_DELAY_MS`
//! - `HTTP_LIFECYCLE_KEY_PREFIX`

use crate::cache::DEFAULT_KEY_PREFIX;
use crate::interceptors::Interceptor;
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheDefaults {
    pub enabled: bool,
    pub expiry_ms: u64,
    pub force_refresh: bool,
}

impl Default for CacheDefaults {
    fn default() -> Self {
        Self {
            enabled: false,
            expiry_ms: 2 * 60 * 60 * 1000,
            force_refresh: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CancelDefaults {
    /// Supersede an in-flight duplicate instead of being cancelled by it.
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryDefaults {
    pub enabled: bool,
    pub max_attempts: u32,
    pub delay_ms: u64,
}

impl Default for RetryDefaults {
    fn default() -> Self {
        Self {
            enabled: false,
            max_attempts: 3,
            delay_ms: 1000,
        }
    }
}

/// Client-level defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientDefaults {
    pub cache: CacheDefaults,
    pub cancel: CancelDefaults,
    pub retry: RetryDefaults,
    /// Namespace for persisted cache keys.
    pub key_prefix: String,
    /// Extra descriptor fields that participate in fingerprinting.
    pub identity_fields: Vec<String>,
}

impl Default for ClientDefaults {
    fn default() -> Self {
        Self {
            cache: CacheDefaults::default(),
            cancel: CancelDefaults::default(),
            retry: RetryDefaults::default(),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            identity_fields: Vec::new(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse::<T>().ok())
}

impl ClientDefaults {
    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        serde_yaml::from_str(raw).map_err(|e| {
            Error::configuration_with_context(
                "invalid lifecycle configuration",
                ErrorContext::new()
                    .with_details(e.to_string())
                    .with_source("config_yaml"),
            )
        })
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| {
            Error::configuration_with_context(
                "invalid lifecycle configuration",
                ErrorContext::new()
                    .with_details(e.to_string())
                    .with_source("config_json"),
            )
        })
    }

    /// Load from a file; `.json` is parsed as JSON, anything else as YAML.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration_with_context(
                "cannot read lifecycle configuration",
                ErrorContext::new()
                    .with_field_path(path.display().to_string())
                    .with_details(e.to_string())
                    .with_source("config_file"),
            )
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&raw),
            _ => Self::from_yaml_str(&raw),
        }
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Some(ms) = env_parse::<u64>("HTTP_LIFECYCLE_CACHE_EXPIRY_MS") {
            self.cache.expiry_ms = ms;
        }
        if let Some(n) = env_parse::<u32>("HTTP_LIFECYCLE_RETRY_MAX_ATTEMPTS") {
            self.retry.max_attempts = n;
        }
        if let Some(ms) = env_parse::<u64>("HTTP_LIFECYCLE_RETRY_DELAY_MS") {
            self.retry.delay_ms = ms;
        }
        if let Ok(prefix) = std::env::var("HTTP_LIFECYCLE_KEY_PREFIX") {
            if !prefix.trim().is_empty() {
                self.key_prefix = prefix;
            }
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.key_prefix.is_empty() {
            return Err(Error::configuration_with_context(
                "cache key prefix must not be empty",
                ErrorContext::new()
                    .with_field_path("key_prefix")
                    .with_source("config_validator"),
            ));
        }
        if self.identity_fields.iter().any(|f| f.is_empty()) {
            return Err(Error::configuration_with_context(
                "identity field names must not be empty",
                ErrorContext::new()
                    .with_field_path("identity_fields")
                    .with_source("config_validator"),
            ));
        }
        Ok(())
    }

    /// Overlay per-call options onto these defaults. Pure.
    pub fn resolve(&self, options: &CallOptions) -> ResolvedPolicy {
        let cache = options.cache.clone().unwrap_or_default();
        let cancel = options.cancel.clone().unwrap_or_default();
        let retry = options.retry.clone().unwrap_or_default();
        ResolvedPolicy {
            cache: CachePolicy {
                enabled: cache.enabled.unwrap_or(self.cache.enabled),
                expiry: Duration::from_millis(cache.expiry_ms.unwrap_or(self.cache.expiry_ms)),
                force_refresh: cache.force_refresh.unwrap_or(self.cache.force_refresh),
            },
            cancel: CancelPolicy {
                enabled: cancel.enabled.unwrap_or(self.cancel.enabled),
            },
            retry: RetryPolicy {
                enabled: retry.enabled.unwrap_or(self.retry.enabled),
                max_attempts: retry.max_attempts.unwrap_or(self.retry.max_attempts),
                delay: Duration::from_millis(retry.delay_ms.unwrap_or(self.retry.delay_ms)),
            },
        }
    }
}

/// Per-call cache options; unset fields fall back to the client defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheOverride {
    pub enabled: Option<bool>,
    pub expiry_ms: Option<u64>,
    pub force_refresh: Option<bool>,
}

impl CacheOverride {
    pub fn enabled() -> Self {
        Self {
            enabled: Some(true),
            ..Default::default()
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: Some(false),
            ..Default::default()
        }
    }

    pub fn expiry_ms(mut self, ms: u64) -> Self {
        self.expiry_ms = Some(ms);
        self
    }

    pub fn force_refresh(mut self) -> Self {
        self.force_refresh = Some(true);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOverride {
    pub enabled: Option<bool>,
}

impl CancelOverride {
    pub fn enabled() -> Self {
        Self {
            enabled: Some(true),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryOverride {
    pub enabled: Option<bool>,
    pub max_attempts: Option<u32>,
    pub delay_ms: Option<u64>,
}

impl RetryOverride {
    pub fn enabled() -> Self {
        Self {
            enabled: Some(true),
            ..Default::default()
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: Some(false),
            ..Default::default()
        }
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = Some(n);
        self
    }

    pub fn delay_ms(mut self, ms: u64) -> Self {
        self.delay_ms = Some(ms);
        self
    }
}

/// Options attached to a single request.
#[derive(Clone, Default)]
pub struct CallOptions {
    pub cache: Option<CacheOverride>,
    pub cancel: Option<CancelOverride>,
    pub retry: Option<RetryOverride>,
    pub interceptor: Option<Arc<dyn Interceptor>>,
}

impl std::fmt::Debug for CallOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallOptions")
            .field("cache", &self.cache)
            .field("cancel", &self.cancel)
            .field("retry", &self.retry)
            .field("interceptor", &self.interceptor.as_ref().map(|_| "custom"))
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub enabled: bool,
    pub expiry: Duration,
    pub force_refresh: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CancelPolicy {
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub enabled: bool,
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        let d = RetryDefaults::default();
        Self {
            enabled: d.enabled,
            max_attempts: d.max_attempts,
            delay: Duration::from_millis(d.delay_ms),
        }
    }
}

/// Policies in effect for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPolicy {
    pub cache: CachePolicy,
    pub cancel: CancelPolicy,
    pub retry: RetryPolicy,
}
