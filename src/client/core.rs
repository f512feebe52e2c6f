use crate::cache::CacheStore;
use crate::cancel::CancellationRegistry;
use crate::client::config::ClientDefaults;
use crate::client::handlers::{HandlerTable, Outcome};
use crate::client::signals::LifecycleSnapshot;
use crate::fingerprint::FingerprintGenerator;
use crate::interceptors::Interceptor;
use crate::resilience::RetryRegistry;
use crate::transport::Transport;
use crate::types::{RequestDescriptor, Response};
use crate::Result;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Request lifecycle client: deduplication, response caching and bounded
/// retry around a [`Transport`].
///
/// Every registry is owned by the client instance; two clients never share
/// state.
pub struct LifecycleClient {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) fingerprints: Arc<FingerprintGenerator>,
    pub(crate) cancellation: CancellationRegistry,
    pub(crate) cache: CacheStore,
    pub(crate) retries: RetryRegistry,
    pub(crate) defaults: ClientDefaults,
    pub(crate) handlers: HandlerTable,
    pub(crate) interceptor: Option<Arc<dyn Interceptor>>,
}

impl LifecycleClient {
    pub fn builder() -> crate::client::LifecycleClientBuilder {
        crate::client::LifecycleClientBuilder::new()
    }

    /// Run `desc` through the lifecycle and map the outcome through the handler table.
    pub async fn request(&self, desc: RequestDescriptor) -> Result<Value> {
        let outcome = match self.dispatch(desc).await {
            Ok(resp) => Outcome::Success(resp),
            Err(err) => Outcome::Failure(err),
        };
        self.handlers.handle(outcome)
    }

    /// Like [`request`](Self::request), decoding the mapped payload into `T`.
    pub async fn request_json<T: DeserializeOwned>(&self, desc: RequestDescriptor) -> Result<T> {
        let value = self.request(desc).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Run `desc` through the lifecycle and return the raw response, skipping
    /// the handler table.
    pub async fn execute(&self, desc: RequestDescriptor) -> Result<Response> {
        self.dispatch(desc).await
    }

    /// Cancel the in-flight call sharing `desc`'s fingerprint.
    pub fn cancel(&self, desc: &RequestDescriptor) -> bool {
        self.cancellation.cancel(desc)
    }

    /// Cancel every in-flight call and empty the cancellation registry.
    ///
    /// Retries waiting out their delay are dropped as well, so nothing reaches
    /// the transport afterwards. Returns the number of in-flight calls cancelled.
    pub fn cancel_all_in_flight(&self) -> usize {
        let cancelled = self.cancellation.cancel_all();
        self.cancellation.clear();
        let pending_retries = self.retries.cancel_all();
        debug!(cancelled, pending_retries, "cancelled all in-flight requests");
        cancelled
    }

    /// Drop the fresh cache entry for `desc`, if any.
    pub fn invalidate_cache(&self, desc: &RequestDescriptor) -> Result<bool> {
        self.cache.invalidate(desc)
    }

    pub fn clear_cache(&self) -> Result<()> {
        self.cache.clear_all()
    }

    /// Replace the extra descriptor fields that participate in fingerprinting.
    pub fn set_identity_fields(&self, fields: Vec<String>) {
        self.fingerprints.set_identity_fields(fields);
    }

    pub fn identity_fields(&self) -> Vec<String> {
        self.fingerprints.identity_fields()
    }

    /// Fingerprint `desc` would be tracked under.
    pub fn fingerprint(&self, desc: &RequestDescriptor) -> String {
        self.fingerprints.fingerprint(desc)
    }

    pub fn defaults(&self) -> &ClientDefaults {
        &self.defaults
    }

    pub fn handlers(&self) -> &HandlerTable {
        &self.handlers
    }

    pub fn snapshot(&self) -> LifecycleSnapshot {
        LifecycleSnapshot {
            inflight: self.cancellation.len(),
            cached_entries: self.cache.len(),
            retrying: self.retries.len(),
            cache: self.cache.stats(),
        }
    }
}
