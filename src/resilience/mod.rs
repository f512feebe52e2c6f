//! 重试模块：按请求指纹跟踪失败次数，固定间隔重发。
//!
//! # Retry Module
//!
//! Bounded, fixed-delay retry keyed by request fingerprint.
//!
//! | Item | Description |
//! |------|-------------|
//! | [`RetryRegistry`] | Per-fingerprint attempt counts and a replaceable delay timer |
//! | [`RETRYABLE_CODES`] | Error codes retried regardless of HTTP status |
//!
//! A failure is eligible when the call's retry policy is enabled and either
//! its error code is in [`RETRYABLE_CODES`] or the server answered with a
//! status in `400..600`.

pub mod retry;

pub use retry::{RetryRegistry, RETRYABLE_CODES};
