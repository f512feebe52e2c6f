//! Scripted in-memory transport shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use http_lifecycle::transport::{Transport, TransportError};
use http_lifecycle::{Error, LifecycleClient, LifecycleClientBuilder, RequestDescriptor, Response};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum Reply {
    Ok(u16, Value),
    Status(u16, Value),
    Timeout,
    Network,
}

/// Answers from a script, then from a fallback reply once the script is empty.
pub struct MockTransport {
    script: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    latency: Duration,
    calls: AtomicUsize,
    seen: Mutex<Vec<RequestDescriptor>>,
}

impl MockTransport {
    pub fn new(fallback: Reply) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback,
            latency: Duration::ZERO,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn ok(data: Value) -> Self {
        Self::new(Reply::Ok(200, data))
    }

    pub fn with_script(self, replies: Vec<Reply>) -> Self {
        *self.script.lock().unwrap() = replies.into();
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<RequestDescriptor> {
        self.seen.lock().unwrap().clone()
    }

    fn next_reply(&self) -> Reply {
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &RequestDescriptor) -> http_lifecycle::Result<Response> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(request.clone());
        let reply = self.next_reply();

        if !self.latency.is_zero() {
            match request.cancel_handle() {
                Some(handle) => {
                    tokio::select! {
                        _ = handle.cancelled() => return Err(Error::cancelled("aborted by handle")),
                        _ = tokio::time::sleep(self.latency) => {}
                    }
                }
                None => tokio::time::sleep(self.latency).await,
            }
        }

        match reply {
            Reply::Ok(status, data) => Ok(Response::new(status, data, request.clone())),
            Reply::Status(status, data) => Err(Error::status(
                Response::new(status, data, request.clone()),
                format!("{} {} failed", request.method, request.url),
            )),
            Reply::Timeout => Err(Error::timeout("deadline exceeded")),
            Reply::Network => Err(Error::Transport(TransportError::Other(
                "connection refused".into(),
            ))),
        }
    }
}

pub fn client_with(transport: Arc<MockTransport>) -> LifecycleClientBuilder {
    LifecycleClientBuilder::new().transport(transport)
}

pub fn build(transport: Arc<MockTransport>) -> LifecycleClient {
    client_with(transport).build().unwrap()
}

pub fn service_unavailable() -> Reply {
    Reply::Status(503, json!({"error": "unavailable"}))
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
