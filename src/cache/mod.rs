//! 响应缓存模块：内存索引 + 持久化存储，支持滑动过期。
//!
//! # Response Caching Module
//!
//! Caches successful responses per request fingerprint, so a repeated request
//! within the expiry window is answered without calling the transport.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`CacheStore`] | Index + persisted store, write-once-until-expired, sliding expiry on read |
//! | [`PersistedStore`] | Synchronous key-value contract for the backing store |
//! | [`SessionStore`] | Process-lifetime store |
//! | [`NullStore`] | No-op store for disabling persistence |
//! | [`CacheKey`] | Fingerprint plus its namespaced storage key |
//! | [`Clock`] | Timestamp source ([`SystemClock`], [`ManualClock`]) |
//!
//! ## Example
//!
//! ```rust
//! use http_lifecycle::cache::{CacheStore, SessionStore};
//! use http_lifecycle::fingerprint::FingerprintGenerator;
//! use http_lifecycle::types::{RequestDescriptor, Response};
//! use serde_json::json;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let cache = CacheStore::new(Arc::new(FingerprintGenerator::new()), Arc::new(SessionStore::new()));
//! cache.set_expiry(Duration::from_secs(60));
//!
//! let req = RequestDescriptor::get("/users").with_params(json!({"id": 1}));
//! cache.write(&Response::new(200, json!({"name": "ada"}), req.clone())).unwrap();
//! assert_eq!(cache.read(&req).unwrap().data, json!({"name": "ada"}));
//! ```
//!
//! ## Expiry
//!
//! Entries are never swept in the background. Freshness is checked when an
//! entry is accessed, and a successful read resets the entry's age.

mod backend;
mod clock;
mod key;
mod manager;

pub use backend::{NullStore, PersistedStore, SessionStore};
pub use clock::{Clock, ManualClock, SystemClock};
pub use key::{CacheKey, DEFAULT_KEY_PREFIX};
pub use manager::{CacheStats, CacheStore, DEFAULT_EXPIRY};
