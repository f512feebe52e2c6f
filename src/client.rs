//! Lifecycle client: the orchestrator over the fingerprint, cancellation,
//! cache and retry components.
//!
//! Implementation details are split into submodules under `src/client/`.

pub mod builder;
pub mod config;
pub mod core;
mod execution;
pub mod handlers;
pub mod signals;
mod validation;

pub use builder::LifecycleClientBuilder;
pub use config::{
    CacheDefaults, CacheOverride, CachePolicy, CallOptions, CancelDefaults, CancelOverride,
    CancelPolicy, ClientDefaults, ResolvedPolicy, RetryDefaults, RetryOverride, RetryPolicy,
};
pub use core::LifecycleClient;
pub use handlers::{Handler, HandlerTable, Outcome, OutcomeTag};
pub use signals::LifecycleSnapshot;
