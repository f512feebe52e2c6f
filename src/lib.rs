//! # http-lifecycle
//!
//! 请求生命周期层：重复请求取消、响应缓存（滑动过期）与有界重试。
//!
//! A request-lifecycle layer that sits between application code and an HTTP
//! transport.
//!
//! ## Overview
//!
//! Each request is identified by a fingerprint, an HMAC-SHA256 over a
//! canonical projection of its method, URL, query parameters and body. The
//! fingerprint drives three independent behaviors:
//!
//! - **Deduplication**: while a request is in flight, an identical one is
//!   cancelled before it reaches the transport.
//! - **Caching**: successful responses are stored per fingerprint with an
//!   expiry that slides forward on every read.
//! - **Retry**: eligible failures are re-issued after a fixed delay, up to a
//!   configured number of attempts.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use http_lifecycle::{CacheOverride, LifecycleClient, RequestDescriptor, RetryOverride};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> http_lifecycle::Result<()> {
//!     let client = LifecycleClient::builder()
//!         .base_url("https://api.example.com")
//!         .build()?;
//!
//!     let users = client
//!         .request(
//!             RequestDescriptor::get("/users")
//!                 .with_params(json!({"id": 1}))
//!                 .with_cache(CacheOverride::enabled().expiry_ms(60_000))
//!                 .with_retry(RetryOverride::enabled().max_attempts(2)),
//!         )
//!         .await?;
//!     println!("{users}");
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`fingerprint`] | Canonical request identity and HMAC fingerprints |
//! | [`cancel`] | In-flight registry and cancellation handles |
//! | [`cache`] | Response cache with pluggable persisted stores |
//! | [`resilience`] | Bounded fixed-delay retry |
//! | [`client`] | Orchestrator, configuration and handler table |
//! | [`interceptors`] | Request/response/error hooks |
//! | [`transport`] | Transport trait and the reqwest adapter |
//! | [`types`] | Request descriptor and response |

pub mod cache;
pub mod cancel;
pub mod client;
pub mod error;
pub mod fingerprint;
pub mod interceptors;
pub mod resilience;
pub mod transport;
pub mod types;

pub use cache::{CacheStats, CacheStore, PersistedStore, SessionStore};
pub use cancel::{CancelHandle, CancellationRegistry};
pub use client::{
    CacheOverride, CallOptions, CancelOverride, ClientDefaults, HandlerTable, LifecycleClient,
    LifecycleClientBuilder, LifecycleSnapshot, Outcome, OutcomeTag, RetryOverride, RetryPolicy,
};
pub use error::{Error, ErrorCode, ErrorContext};
pub use fingerprint::FingerprintGenerator;
pub use interceptors::{FnInterceptor, Interceptor};
pub use transport::Transport;
#[cfg(feature = "http")]
pub use transport::HttpTransport;
pub use types::{RequestDescriptor, Response};

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
