//! Retry registry.
//!
//! Per fingerprint: absent → tracking(1) → tracking(n) → removed, where removal
//! happens on success, on a terminal non-retryable failure, or once the count
//! exceeds the configured maximum. The delay between attempts is fixed.

use crate::error::ErrorCode;
use crate::fingerprint::FingerprintGenerator;
use crate::types::RequestDescriptor;
use crate::Error;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Error codes that are retried regardless of HTTP status.
pub const RETRYABLE_CODES: &[ErrorCode] = &[ErrorCode::Cancelled, ErrorCode::Timeout];

struct RetryEntry {
    count: u32,
    delay: Duration,
    request: RequestDescriptor,
    /// Pending one-shot timer for this fingerprint; arming a new one cancels it.
    timer: Option<CancellationToken>,
}

pub struct RetryRegistry {
    fingerprints: Arc<FingerprintGenerator>,
    entries: Mutex<HashMap<String, RetryEntry>>,
}

impl RetryRegistry {
    pub fn new(fingerprints: Arc<FingerprintGenerator>) -> Self {
        Self {
            fingerprints,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, RetryEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Whether `err`, raised for `desc`, is eligible for another attempt.
    pub fn should_retry(&self, desc: &RequestDescriptor, err: &Error) -> bool {
        let enabled = desc.retry_policy().map(|p| p.enabled).unwrap_or(false);
        if !enabled {
            return false;
        }
        if RETRYABLE_CODES.contains(&err.code()) {
            return true;
        }
        matches!(err.http_status(), Some(status) if (400..600).contains(&status))
    }

    /// Count a failure of `desc`, returning the attempt count now tracked.
    pub fn record_failure(&self, desc: &RequestDescriptor) -> u32 {
        let fingerprint = self.fingerprints.identify(desc);
        let delay = desc
            .retry_policy()
            .map(|p| p.delay)
            .unwrap_or_default();
        let mut entries = self.entries();
        let entry = entries.entry(fingerprint).or_insert_with(|| RetryEntry {
            count: 0,
            delay,
            request: desc.clone(),
            timer: None,
        });
        entry.count = entry.count.saturating_add(1);
        entry.delay = delay;
        entry.request = desc.clone();
        entry.count
    }

    /// Re-submit the tracked request through `send` after the fixed delay.
    ///
    /// Returns `None` without calling `send` when the attempt count exceeds the
    /// maximum (the entry is removed), when nothing is tracked, or when a later
    /// schedule for the same fingerprint replaced this one before it fired.
    pub async fn reissue<F, Fut, T>(&self, desc: &RequestDescriptor, send: F) -> Option<T>
    where
        F: FnOnce(RequestDescriptor) -> Fut,
        Fut: Future<Output = T>,
    {
        let fingerprint = self.fingerprints.identify(desc);
        let max_attempts = desc.retry_policy().map(|p| p.max_attempts).unwrap_or(0);

        let (timer, delay, request, attempt) = {
            let mut entries = self.entries();
            let entry = entries.get_mut(&fingerprint)?;
            if entry.count > max_attempts {
                debug!(
                    fingerprint = fingerprint.as_str(),
                    attempts = entry.count - 1,
                    "retries exhausted"
                );
                entries.remove(&fingerprint);
                return None;
            }
            let timer = CancellationToken::new();
            if let Some(previous) = entry.timer.replace(timer.clone()) {
                previous.cancel();
            }
            (timer, entry.delay, entry.request.clone(), entry.count)
        };

        debug!(
            fingerprint = fingerprint.as_str(),
            attempt,
            delay_ms = delay.as_millis() as u64,
            "retry scheduled"
        );
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = timer.cancelled() => {
                debug!(fingerprint = fingerprint.as_str(), "retry superseded by a later schedule");
                return None;
            }
        }
        Some(send(request).await)
    }

    pub fn clear(&self, desc: &RequestDescriptor) {
        let fingerprint = self.fingerprints.identify(desc);
        if let Some(entry) = self.entries().remove(&fingerprint) {
            if let Some(timer) = entry.timer {
                timer.cancel();
            }
        }
    }

    /// Disarm every pending retry timer and forget all tracked attempts.
    ///
    /// Waiters in [`reissue`](Self::reissue) resolve to `None`. Returns how
    /// many entries were tracked.
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<RetryEntry> = self.entries().drain().map(|(_, e)| e).collect();
        for timer in drained.iter().filter_map(|e| e.timer.as_ref()) {
            timer.cancel();
        }
        drained.len()
    }

    pub fn attempts(&self, desc: &RequestDescriptor) -> Option<u32> {
        let fingerprint = self.fingerprints.identify(desc);
        self.entries().get(&fingerprint).map(|e| e.count)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::config::RetryPolicy;
    use crate::types::Response;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn registry() -> RetryRegistry {
        RetryRegistry::new(Arc::new(FingerprintGenerator::new()))
    }

    fn with_policy(mut desc: RequestDescriptor, max_attempts: u32, delay_ms: u64) -> RequestDescriptor {
        desc.lifecycle.retry = Some(RetryPolicy {
            enabled: true,
            max_attempts,
            delay: Duration::from_millis(delay_ms),
        });
        desc
    }

    fn status_error(status: u16) -> Error {
        Error::status(
            Response::new(status, json!(null), RequestDescriptor::get("/x")),
            "failed",
        )
    }

    #[test]
    fn test_should_retry() {
        let reg = registry();
        let desc = with_policy(RequestDescriptor::get("/x"), 3, 10);

        assert!(reg.should_retry(&desc, &Error::cancelled("aborted")));
        assert!(reg.should_retry(&desc, &Error::timeout("slow")));
        assert!(reg.should_retry(&desc, &status_error(400)));
        assert!(reg.should_retry(&desc, &status_error(503)));
        assert!(!reg.should_retry(&desc, &status_error(302)));
        assert!(!reg.should_retry(
            &desc,
            &Error::validation_with_context("bad", Default::default())
        ));

        // no policy or disabled policy
        assert!(!reg.should_retry(&RequestDescriptor::get("/x"), &status_error(503)));
        let mut disabled = desc.clone();
        disabled.lifecycle.retry = Some(RetryPolicy { enabled: false, ..RetryPolicy::default() });
        assert!(!reg.should_retry(&disabled, &status_error(503)));
    }

    #[test]
    fn test_record_failure_counts_per_fingerprint() {
        let reg = registry();
        let a = with_policy(RequestDescriptor::get("/a"), 3, 10);
        let b = with_policy(RequestDescriptor::get("/b"), 3, 10);
        assert_eq!(reg.record_failure(&a), 1);
        assert_eq!(reg.record_failure(&a), 2);
        assert_eq!(reg.record_failure(&b), 1);
        assert_eq!(reg.len(), 2);

        reg.clear(&a);
        assert_eq!(reg.attempts(&a), None);
        assert_eq!(reg.attempts(&b), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reissue_waits_fixed_delay() {
        let reg = registry();
        let desc = with_policy(RequestDescriptor::get("/a"), 2, 100);
        reg.record_failure(&desc);

        let start = tokio::time::Instant::now();
        let out = reg.reissue(&desc, |d| async move { d.url }).await;
        assert_eq!(out.as_deref(), Some("/a"));
        assert!(start.elapsed() >= Duration::from_millis(100));
        assert!(start.elapsed() < Duration::from_millis(150));

        reg.record_failure(&desc);
        let start = tokio::time::Instant::now();
        assert!(reg.reissue(&desc, |_| async {}).await.is_some());
        // fixed, not exponential
        assert!(start.elapsed() >= Duration::from_millis(100));
        assert!(start.elapsed() < Duration::from_millis(150));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reissue_stops_after_max() {
        let reg = registry();
        let desc = with_policy(RequestDescriptor::get("/a"), 1, 10);
        let calls = AtomicU32::new(0);

        reg.record_failure(&desc);
        reg.reissue(&desc, |_| async { calls.fetch_add(1, Ordering::SeqCst) }).await;
        reg.record_failure(&desc);
        let out = reg
            .reissue(&desc, |_| async { calls.fetch_add(1, Ordering::SeqCst) })
            .await;

        assert!(out.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(reg.is_empty());
    }

    #[tokio::test]
    async fn test_reissue_without_entry_is_noop() {
        let reg = registry();
        let desc = with_policy(RequestDescriptor::get("/a"), 3, 10);
        assert!(reg.reissue(&desc, |_| async {}).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_later_schedule_replaces_pending_timer() {
        let reg = Arc::new(registry());
        let desc = with_policy(RequestDescriptor::get("/a"), 5, 100);
        reg.record_failure(&desc);

        let first = {
            let reg = reg.clone();
            let desc = desc.clone();
            tokio::spawn(async move { reg.reissue(&desc, |_| async { "first" }).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        reg.record_failure(&desc);
        let second = reg.reissue(&desc, |_| async { "second" }).await;

        assert_eq!(first.await.unwrap(), None);
        assert_eq!(second, Some("second"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_disarms_pending_timers() {
        let reg = Arc::new(registry());
        let a = with_policy(RequestDescriptor::get("/a"), 3, 1_000);
        let b = with_policy(RequestDescriptor::get("/b"), 3, 1_000);
        reg.record_failure(&a);
        reg.record_failure(&b);

        let waiting = {
            let reg = reg.clone();
            let a = a.clone();
            tokio::spawn(async move { reg.reissue(&a, |_| async { "sent" }).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(reg.cancel_all(), 2);
        assert!(reg.is_empty());
        assert_eq!(waiting.await.unwrap(), None);
    }
}
