use crate::cache::{CacheStore, Clock, PersistedStore, SessionStore};
use crate::cancel::CancellationRegistry;
use crate::client::config::ClientDefaults;
use crate::client::core::LifecycleClient;
use crate::client::handlers::HandlerTable;
use crate::fingerprint::FingerprintGenerator;
use crate::interceptors::Interceptor;
use crate::resilience::RetryRegistry;
use crate::transport::Transport;
use crate::{Error, ErrorContext, Result};
use std::sync::Arc;
use std::time::Duration;

/// Builder for [`LifecycleClient`].
///
/// Keep this surface area small and predictable.
pub struct LifecycleClientBuilder {
    transport: Option<Arc<dyn Transport>>,
    base_url: Option<String>,
    defaults: ClientDefaults,
    store: Option<Arc<dyn PersistedStore>>,
    clock: Option<Arc<dyn Clock>>,
    handlers: HandlerTable,
    interceptor: Option<Arc<dyn Interceptor>>,
    identity_fields: Option<Vec<String>>,
    secret: Option<Vec<u8>>,
}

impl LifecycleClientBuilder {
    pub fn new() -> Self {
        Self {
            transport: None,
            base_url: None,
            defaults: ClientDefaults::default(),
            store: None,
            clock: None,
            handlers: HandlerTable::new(),
            interceptor: None,
            identity_fields: None,
            secret: None,
        }
    }

    /// Use a custom transport instead of the built-in HTTP one.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Base URL for the built-in HTTP transport. Ignored when a custom
    /// transport is set.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn defaults(mut self, defaults: ClientDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Backing store for cached responses. Defaults to a [`SessionStore`].
    pub fn persisted_store(mut self, store: Arc<dyn PersistedStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Timestamp source for cache expiry (primarily for tests).
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn handlers(mut self, handlers: HandlerTable) -> Self {
        self.handlers = handlers;
        self
    }

    /// Client-level interceptor. A per-call interceptor replaces it for that call.
    pub fn interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptor = Some(interceptor);
        self
    }

    /// Overrides `identity_fields` from the defaults.
    pub fn identity_fields(mut self, fields: Vec<String>) -> Self {
        self.identity_fields = Some(fields);
        self
    }

    /// HMAC secret for fingerprints.
    pub fn secret(mut self, secret: impl AsRef<[u8]>) -> Self {
        self.secret = Some(secret.as_ref().to_vec());
        self
    }

    /// Build the client. Must be called inside a Tokio runtime: retry timers
    /// and cancellation need the reactor.
    pub fn build(self) -> Result<LifecycleClient> {
        tokio::runtime::Handle::try_current().map_err(|e| {
            Error::configuration_with_context(
                "lifecycle client must be built inside a Tokio runtime",
                ErrorContext::new()
                    .with_details(e.to_string())
                    .with_source("runtime_guard"),
            )
        })?;
        self.defaults.validate()?;

        let fingerprints = match &self.secret {
            Some(secret) => FingerprintGenerator::with_secret(secret)?,
            None => FingerprintGenerator::new(),
        };
        let identity_fields = self
            .identity_fields
            .unwrap_or_else(|| self.defaults.identity_fields.clone());
        let fingerprints = Arc::new(fingerprints.with_identity_fields(identity_fields));

        let transport = match self.transport {
            Some(t) => t,
            None => default_transport(self.base_url.unwrap_or_default())?,
        };

        let store = self
            .store
            .unwrap_or_else(|| Arc::new(SessionStore::new()));
        let mut cache = CacheStore::new(fingerprints.clone(), store)
            .with_key_prefix(self.defaults.key_prefix.clone());
        if let Some(clock) = self.clock {
            cache = cache.with_clock(clock);
        }
        cache.set_expiry(Duration::from_millis(self.defaults.cache.expiry_ms));

        Ok(LifecycleClient {
            transport,
            cancellation: CancellationRegistry::new(fingerprints.clone()),
            retries: RetryRegistry::new(fingerprints.clone()),
            fingerprints,
            cache,
            defaults: self.defaults,
            handlers: self.handlers,
            interceptor: self.interceptor,
        })
    }
}

#[cfg(feature = "http")]
fn default_transport(base_url: String) -> Result<Arc<dyn Transport>> {
    Ok(Arc::new(crate::transport::HttpTransport::new(base_url)?))
}

#[cfg(not(feature = "http"))]
fn default_transport(_base_url: String) -> Result<Arc<dyn Transport>> {
    Err(Error::configuration_with_context(
        "no transport configured",
        ErrorContext::new()
            .with_details("enable the `http` feature or call `transport(..)`")
            .with_source("client_builder"),
    ))
}

impl Default for LifecycleClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
