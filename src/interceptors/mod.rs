//! Optional interceptor hooks around the request lifecycle.
//!
//! An interceptor sees a call at three points:
//! - before validation passes it to the transport (`on_request`, may mutate or reject),
//! - after a successful response (`on_response`),
//! - after a terminal failure (`on_error`).
//!
//! A per-call interceptor replaces the client-level one for that call.

use async_trait::async_trait;
use std::sync::Arc;

use crate::types::{RequestDescriptor, Response};
use crate::{Error, Result};

#[async_trait]
pub trait Interceptor: Send + Sync {
    /// Returning an error aborts the call before it is registered or sent.
    async fn on_request(&self, _req: &mut RequestDescriptor) -> Result<()> {
        Ok(())
    }

    async fn on_response(&self, _resp: &Response) {}

    async fn on_error(&self, _req: &RequestDescriptor, _err: &Error) {}
}

type RequestFn = dyn Fn(&mut RequestDescriptor) -> Result<()> + Send + Sync;
type ResponseFn = dyn Fn(&Response) + Send + Sync;
type ErrorFn = dyn Fn(&RequestDescriptor, &Error) + Send + Sync;

/// Interceptor assembled from closures.
#[derive(Default, Clone)]
pub struct FnInterceptor {
    request: Option<Arc<RequestFn>>,
    response: Option<Arc<ResponseFn>>,
    error: Option<Arc<ErrorFn>>,
}

impl FnInterceptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_request<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut RequestDescriptor) -> Result<()> + Send + Sync + 'static,
    {
        self.request = Some(Arc::new(f));
        self
    }

    pub fn on_response<F>(mut self, f: F) -> Self
    where
        F: Fn(&Response) + Send + Sync + 'static,
    {
        self.response = Some(Arc::new(f));
        self
    }

    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&RequestDescriptor, &Error) + Send + Sync + 'static,
    {
        self.error = Some(Arc::new(f));
        self
    }
}

#[async_trait]
impl Interceptor for FnInterceptor {
    async fn on_request(&self, req: &mut RequestDescriptor) -> Result<()> {
        match &self.request {
            Some(f) => f(req),
            None => Ok(()),
        }
    }

    async fn on_response(&self, resp: &Response) {
        if let Some(f) = &self.response {
            f(resp);
        }
    }

    async fn on_error(&self, req: &RequestDescriptor, err: &Error) {
        if let Some(f) = &self.error {
            f(req, err);
        }
    }
}

/// Runs several interceptors in registration order.
///
/// `on_request` stops at the first interceptor that rejects the call.
pub struct InterceptorPipeline {
    pub(crate) interceptors: Vec<Arc<dyn Interceptor>>,
}

impl InterceptorPipeline {
    pub fn new() -> Self {
        Self {
            interceptors: Vec::new(),
        }
    }

    pub fn with<I: Interceptor + 'static>(mut self, interceptor: I) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }
}

impl Default for InterceptorPipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Interceptor for InterceptorPipeline {
    async fn on_request(&self, req: &mut RequestDescriptor) -> Result<()> {
        for ic in &self.interceptors {
            ic.on_request(req).await?;
        }
        Ok(())
    }

    async fn on_response(&self, resp: &Response) {
        for ic in &self.interceptors {
            ic.on_response(resp).await;
        }
    }

    async fn on_error(&self, req: &RequestDescriptor, err: &Error) {
        for ic in &self.interceptors {
            ic.on_error(req, err).await;
        }
    }
}
