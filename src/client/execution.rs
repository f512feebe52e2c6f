//! 请求生命周期执行：去重、缓存、重试的各阶段。
//!
//! Request lifecycle execution: request, response and error phases.

use crate::client::config::ResolvedPolicy;
use crate::interceptors::Interceptor;
use crate::types::{RequestDescriptor, Response};
use crate::{Error, Result};
use async_recursion::async_recursion;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::core::LifecycleClient;
use super::validation::validate_request;

/// Per-dispatch bookkeeping for logs.
struct CallContext {
    request_id: String,
    started: Instant,
    interceptor: Option<Arc<dyn Interceptor>>,
}

impl LifecycleClient {
    /// One pass through the lifecycle. Retries re-enter here with a fresh
    /// registration, so each attempt is deduplicated and cached on its own.
    #[async_recursion]
    pub(crate) async fn dispatch(&self, mut desc: RequestDescriptor) -> Result<Response> {
        desc.reset_lifecycle();
        desc.method = desc.method.to_lowercase();
        let ctx = CallContext {
            request_id: Uuid::new_v4().to_string(),
            started: Instant::now(),
            interceptor: desc
                .options
                .interceptor
                .clone()
                .or_else(|| self.interceptor.clone()),
        };

        let policy = match self.admit(&mut desc, &ctx).await {
            Ok(ControlFlow::Continue(policy)) => policy,
            Ok(ControlFlow::Break(cached)) => return Ok(cached),
            Err(err) => return self.on_failure(desc, err, &ctx, false).await,
        };

        match self.transport.send(&desc).await {
            Ok(resp) => Ok(self.on_success(&desc, resp, &policy, &ctx).await),
            Err(err) => self.on_failure(desc, err, &ctx, true).await,
        }
    }

    /// Request phase. `Break` carries a cached response that answers the call.
    async fn admit(
        &self,
        desc: &mut RequestDescriptor,
        ctx: &CallContext,
    ) -> Result<ControlFlow<Response, ResolvedPolicy>> {
        validate_request(desc)?;
        if let Some(ic) = &ctx.interceptor {
            ic.on_request(desc).await?;
            desc.method = desc.method.to_lowercase();
            // the hook may have rewritten url, method or params
            validate_request(desc)?;
        }

        let policy = self.defaults.resolve(&desc.options);
        desc.lifecycle.retry = Some(policy.retry);

        if policy.cancel.enabled && self.cancellation.cancel(desc) {
            // desc has no handle yet, so this release is unconditional.
            self.cancellation.release(desc);
            debug!(
                request_id = ctx.request_id.as_str(),
                url = desc.url.as_str(),
                "superseded in-flight duplicate"
            );
        }

        let handle = self.cancellation.register(desc);
        if handle.is_cancelled() {
            return Err(Error::cancelled(format!(
                "duplicate of an in-flight request: {} {}",
                desc.method, desc.url
            )));
        }

        if policy.cache.enabled {
            if policy.cache.force_refresh {
                if let Err(e) = self.cache.invalidate(desc) {
                    warn!(request_id = ctx.request_id.as_str(), error = %e, "cache invalidation failed");
                }
            }
            if let Some(cached) = self.cache.read(desc) {
                self.cancellation.release(desc);
                debug!(
                    request_id = ctx.request_id.as_str(),
                    fingerprint = desc.fingerprint().unwrap_or_default(),
                    "served from cache"
                );
                return Ok(ControlFlow::Break(cached));
            }
        }

        Ok(ControlFlow::Continue(policy))
    }

    /// Response phase.
    async fn on_success(
        &self,
        desc: &RequestDescriptor,
        mut resp: Response,
        policy: &ResolvedPolicy,
        ctx: &CallContext,
    ) -> Response {
        resp.request = desc.clone();
        if policy.cache.enabled {
            if let Err(e) = self.cache.write_with_expiry(&resp, policy.cache.expiry) {
                warn!(request_id = ctx.request_id.as_str(), error = %e, "cache write failed");
            }
        }
        self.cancellation.release(desc);
        self.retries.clear(desc);
        if let Some(ic) = &ctx.interceptor {
            ic.on_response(&resp).await;
        }
        resp
    }

    /// Error phase.
    ///
    /// A successful re-issue answers the call; otherwise the error this attempt
    /// saw is returned, so an exhausted retry surfaces the original failure.
    /// `sent` is false when the call failed before reaching the transport.
    async fn on_failure(
        &self,
        desc: RequestDescriptor,
        err: Error,
        ctx: &CallContext,
        sent: bool,
    ) -> Result<Response> {
        // Calls rejected before registration own nothing.
        if desc.cancel_handle().is_some() {
            self.cancellation.release(&desc);
        }

        if desc.is_cancelled() {
            debug!(
                request_id = ctx.request_id.as_str(),
                url = desc.url.as_str(),
                "request cancelled, not retrying"
            );
            // A rejected duplicate must not reset the retry count of the
            // chain it collided with.
            if sent && desc.retry_policy().is_some() {
                self.retries.clear(&desc);
            }
        } else if self.retries.should_retry(&desc, &err) {
            let attempt = self.retries.record_failure(&desc);
            match self.retries.reissue(&desc, |next| self.dispatch(next)).await {
                Some(Ok(resp)) => return Ok(resp),
                Some(Err(retry_err)) => {
                    debug!(
                        request_id = ctx.request_id.as_str(),
                        attempt,
                        error = %retry_err,
                        "retry attempt failed"
                    );
                }
                None => {}
            }
        } else if desc.retry_policy().is_some() {
            self.retries.clear(&desc);
        }

        info!(
            request_id = ctx.request_id.as_str(),
            fingerprint = desc.fingerprint().unwrap_or_default(),
            http_status = err.http_status(),
            error_code = err.code().as_str(),
            duration_ms = ctx.started.elapsed().as_millis() as u64,
            "request failed"
        );
        if let Some(ic) = &ctx.interceptor {
            ic.on_error(&desc, &err).await;
        }
        Err(err)
    }
}
