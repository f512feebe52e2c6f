//! Transport seam: the only component that talks to the network.
//!
//! Implementations must observe the request's cancel handle and resolve with
//! [`Error::Cancelled`](crate::Error::Cancelled) once it fires. A status of
//! 400 or above resolves as [`Error::Status`](crate::Error::Status) carrying
//! the response.

use async_trait::async_trait;

use crate::types::{RequestDescriptor, Response};
use crate::Result;

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::HttpTransport;

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &RequestDescriptor) -> Result<Response>;
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[cfg(feature = "http")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Other(String),
}
