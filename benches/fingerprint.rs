//! Benchmarks for request fingerprinting and the cached request path
//!
//! This benchmark measures:
//! - Canonicalization + HMAC cost as bodies grow
//! - A full lifecycle round-trip answered from the cache

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use async_trait::async_trait;
use http_lifecycle::fingerprint::{to_canonical_json, FingerprintGenerator};
use http_lifecycle::transport::Transport;
use http_lifecycle::{CacheOverride, LifecycleClient, RequestDescriptor, Response};
use serde_json::{json, Map, Value};
use std::sync::Arc;

fn body_with_fields(n: usize) -> Value {
    let mut map = Map::new();
    for i in (0..n).rev() {
        map.insert(format!("field_{i}"), json!({"value": i, "tags": ["a", "b"]}));
    }
    Value::Object(map)
}

fn bench_fingerprint(c: &mut Criterion) {
    let gen = FingerprintGenerator::new();
    let mut group = c.benchmark_group("fingerprint");

    for size in [1usize, 16, 256] {
        let desc = RequestDescriptor::post("/report")
            .with_params(json!({"page": 1, "size": 20}))
            .with_body(body_with_fields(size));
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("hmac", size), &desc, |b, desc| {
            b.iter(|| gen.fingerprint(black_box(desc)))
        });
        let body = body_with_fields(size);
        group.bench_with_input(BenchmarkId::new("canonical_json", size), &body, |b, body| {
            b.iter(|| to_canonical_json(black_box(body)))
        });
    }

    group.finish();
}

struct EchoTransport;

#[async_trait]
impl Transport for EchoTransport {
    async fn send(&self, request: &RequestDescriptor) -> http_lifecycle::Result<Response> {
        Ok(Response::new(200, json!({"ok": true}), request.clone()))
    }
}

fn bench_cached_request(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let client: LifecycleClient = rt.block_on(async {
        LifecycleClient::builder()
            .transport(Arc::new(EchoTransport))
            .build()
            .unwrap()
    });
    let desc = RequestDescriptor::get("/users")
        .with_params(json!({"id": 1}))
        .with_cache(CacheOverride::enabled());
    rt.block_on(client.request(desc.clone())).unwrap();

    c.bench_function("cached_request", |b| {
        b.to_async(&rt)
            .iter(|| async { client.request(black_box(desc.clone())).await.unwrap() })
    });
}

criterion_group!(benches, bench_fingerprint, bench_cached_request);
criterion_main!(benches);
