//! Namespaced cache keys.

use serde::{Deserialize, Serialize};

pub const DEFAULT_KEY_PREFIX: &str = "HTTP_LIFECYCLE_";

/// A fingerprint together with the key it is persisted under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub fingerprint: String,
    pub storage_key: String,
}

impl CacheKey {
    pub fn new(prefix: &str, fingerprint: impl Into<String>) -> Self {
        let fingerprint = fingerprint.into();
        let storage_key = format!("{}{}", prefix, fingerprint);
        Self {
            fingerprint,
            storage_key,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.storage_key
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.storage_key)
    }
}
