//! Transport response.

use super::RequestDescriptor;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A completed transport call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    pub data: Value,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// The descriptor that produced this response; the cache keys on it.
    pub request: RequestDescriptor,
    /// Set when the response was served by the cache store.
    #[serde(skip)]
    pub from_cache: bool,
}

impl Response {
    pub fn new(status: u16, data: Value, request: RequestDescriptor) -> Self {
        Self {
            status,
            data,
            headers: BTreeMap::new(),
            request,
            from_cache: false,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
