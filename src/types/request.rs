//! Request descriptor.

use crate::cancel::CancelHandle;
use crate::client::config::{CacheOverride, CallOptions, CancelOverride, RetryOverride};
use crate::client::config::RetryPolicy;
use crate::interceptors::Interceptor;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Methods accepted by request validation (lowercase, after normalization).
pub const KNOWN_METHODS: &[&str] = &["get", "post", "put", "patch", "delete", "head", "options"];

/// Metadata attached by the lifecycle pipeline while a call is being processed.
///
/// Reset at the start of every dispatch, so a descriptor re-issued by the retry
/// registry is fingerprinted and registered afresh.
#[derive(Debug, Clone, Default)]
pub struct Lifecycle {
    pub(crate) fingerprint: Option<String>,
    pub(crate) cancel: Option<CancelHandle>,
    pub(crate) retry: Option<RetryPolicy>,
}

/// The caller's request intent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestDescriptor {
    pub method: String,
    pub url: String,
    /// Query parameters. Must be an object when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    /// Request body. A JSON-encoded string and the equivalent structured value
    /// produce the same fingerprint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Additional fields; the ones named by the configured identity fields
    /// participate in fingerprinting.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
    #[serde(skip)]
    pub options: CallOptions,
    #[serde(skip)]
    pub(crate) lifecycle: Lifecycle,
}

impl RequestDescriptor {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new("get", url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new("post", url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new("put", url)
    }

    pub fn patch(url: impl Into<String>) -> Self {
        Self::new("patch", url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new("delete", url)
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }

    pub fn with_body(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Set an extra field, e.g. a tenant id named in the identity fields.
    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.extra.insert(name.into(), value);
        self
    }

    pub fn with_cache(mut self, cache: CacheOverride) -> Self {
        self.options.cache = Some(cache);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelOverride) -> Self {
        self.options.cancel = Some(cancel);
        self
    }

    pub fn with_retry(mut self, retry: RetryOverride) -> Self {
        self.options.retry = Some(retry);
        self
    }

    /// Per-call interceptor; replaces the client-level interceptor for this call.
    pub fn with_interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.options.interceptor = Some(interceptor);
        self
    }

    /// Fingerprint attached by the pipeline, if this descriptor is being processed.
    pub fn fingerprint(&self) -> Option<&str> {
        self.lifecycle.fingerprint.as_deref()
    }

    /// Cancellation handle the transport must observe.
    pub fn cancel_handle(&self) -> Option<&CancelHandle> {
        self.lifecycle.cancel.as_ref()
    }

    pub fn retry_policy(&self) -> Option<&RetryPolicy> {
        self.lifecycle.retry.as_ref()
    }

    pub fn is_cancelled(&self) -> bool {
        self.lifecycle
            .cancel
            .as_ref()
            .map(|h| h.is_cancelled())
            .unwrap_or(false)
    }

    pub(crate) fn reset_lifecycle(&mut self) {
        self.lifecycle = Lifecycle::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serialization_skips_lifecycle_and_options() {
        let desc = RequestDescriptor::post("/report")
            .with_body(json!({"b": 1}))
            .with_retry(RetryOverride::enabled());
        let encoded = serde_json::to_value(&desc).unwrap();
        assert_eq!(
            encoded,
            json!({"method": "post", "url": "/report", "data": {"b": 1}})
        );

        let decoded: RequestDescriptor = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded.url, "/report");
        assert!(decoded.options.retry.is_none());
        assert!(decoded.fingerprint().is_none());
    }

    #[test]
    fn test_not_cancelled_without_handle() {
        let desc = RequestDescriptor::get("/users");
        assert!(!desc.is_cancelled());
        assert!(desc.cancel_handle().is_none());
    }
}
