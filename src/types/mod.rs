//! 类型模块：请求描述与响应。
//!
//! # Types Module
//!
//! Core data carried through the lifecycle pipeline.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`RequestDescriptor`] | Caller's request intent plus lifecycle metadata |
//! | [`Response`] | Successful transport result, also the cached payload |
//!
//! Descriptors are plain serde values: per-call options and lifecycle metadata
//! are skipped during serialization so that a cached [`Response`] can carry its
//! originating request.

pub mod request;
pub mod response;

pub use request::{Lifecycle, RequestDescriptor, KNOWN_METHODS};
pub use response::Response;
