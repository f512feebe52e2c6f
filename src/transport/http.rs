use crate::transport::{Transport, TransportError};
use crate::types::{RequestDescriptor, Response};
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use reqwest::{Method, Proxy};
use serde_json::Value;
use std::collections::BTreeMap;
use std::env;
use std::time::Duration;
use url::Url;

/// reqwest-backed transport.
///
/// Relative descriptor URLs are joined onto `base_url`; absolute ones are used
/// as given.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Env-overridable defaults:
    /// - `HTTP_LIFECYCLE_TIMEOUT_SECS` (default 30)
    /// - `HTTP_LIFECYCLE_PROXY_URL`
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let timeout_secs = env::var("HTTP_LIFECYCLE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(30);

        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .pool_idle_timeout(Some(Duration::from_secs(90)));

        if let Ok(proxy_url) = env::var("HTTP_LIFECYCLE_PROXY_URL") {
            if let Ok(proxy) = Proxy::all(&proxy_url) {
                builder = builder.proxy(proxy);
            }
        }

        let client = builder
            .build()
            .map_err(|e| Error::Transport(TransportError::Other(e.to_string())))?;

        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn resolve_url(&self, path: &str) -> Result<Url> {
        let joined = if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url.trim_end_matches('/'), path)
        } else {
            format!("{}/{}", self.base_url.trim_end_matches('/'), path)
        };
        Url::parse(&joined).map_err(|e| {
            Error::validation_with_context(
                format!("invalid request url: {}", joined),
                ErrorContext::new()
                    .with_field_path("url")
                    .with_details(e.to_string())
                    .with_source("http_transport"),
            )
        })
    }

    fn query_pairs(params: Option<&Value>) -> Vec<(String, String)> {
        match params {
            Some(Value::Object(map)) => map
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| {
                    let v = match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (k.clone(), v)
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    async fn execute(&self, request: &RequestDescriptor) -> Result<Response> {
        let url = self.resolve_url(&request.url)?;
        let method = Method::from_bytes(request.method.to_uppercase().as_bytes()).map_err(|e| {
            Error::validation_with_context(
                format!("unsupported method: {}", request.method),
                ErrorContext::new()
                    .with_field_path("method")
                    .with_details(e.to_string())
                    .with_source("http_transport"),
            )
        })?;

        let mut builder = self.client.request(method, url);
        let query = Self::query_pairs(request.params.as_ref());
        if !query.is_empty() {
            builder = builder.query(&query);
        }
        match &request.data {
            Some(Value::String(raw)) => {
                builder = builder
                    .header("content-type", "application/json")
                    .body(raw.clone());
            }
            Some(Value::Null) | None => {}
            Some(body) => builder = builder.json(body),
        }

        let resp = builder.send().await.map_err(map_reqwest_error)?;
        let status = resp.status().as_u16();
        let headers: BTreeMap<String, String> = resp
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();
        let text = resp.text().await.map_err(map_reqwest_error)?;
        let data = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        let mut response = Response::new(status, data, request.clone());
        response.headers = headers;
        Ok(response)
    }
}

fn map_reqwest_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::timeout(e.to_string())
    } else {
        Error::Transport(TransportError::Http(e))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &RequestDescriptor) -> Result<Response> {
        let response = match request.cancel_handle() {
            Some(handle) => {
                tokio::select! {
                    biased;
                    _ = handle.cancelled() => {
                        return Err(Error::cancelled(format!("{} {} aborted", request.method, request.url)));
                    }
                    res = self.execute(request) => res?,
                }
            }
            None => self.execute(request).await?,
        };

        if response.status >= 400 {
            let message = format!("{} {} failed", request.method, request.url);
            return Err(Error::status(response, message));
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn transport() -> HttpTransport {
        HttpTransport::with_client(reqwest::Client::new(), "http://localhost:8080/api/")
    }

    #[test]
    fn test_resolve_url() {
        let t = transport();
        assert_eq!(
            t.resolve_url("/users").unwrap().as_str(),
            "http://localhost:8080/api/users"
        );
        assert_eq!(
            t.resolve_url("users").unwrap().as_str(),
            "http://localhost:8080/api/users"
        );
        assert_eq!(
            t.resolve_url("https://example.com/x").unwrap().as_str(),
            "https://example.com/x"
        );

        let bare = HttpTransport::with_client(reqwest::Client::new(), "");
        assert!(bare.resolve_url("/users").is_err());
    }

    #[test]
    fn test_query_pairs() {
        let pairs = HttpTransport::query_pairs(Some(&json!({"id": 1, "q": "ada", "skip": null})));
        assert_eq!(
            pairs,
            vec![
                ("id".to_string(), "1".to_string()),
                ("q".to_string(), "ada".to_string())
            ]
        );
        assert!(HttpTransport::query_pairs(None).is_empty());
    }
}
