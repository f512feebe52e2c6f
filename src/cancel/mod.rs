//! 请求取消：按指纹登记进行中的请求，重复请求自动取消。
//!
//! # Cancellation Registry
//!
//! Tracks in-flight calls by fingerprint. The first registrant for a fingerprint
//! owns the slot; a duplicate registered while it is in flight has its own
//! handle cancelled immediately and never reaches the transport.
//!
//! Cancellation is cooperative: a [`CancelHandle`] is attached to the
//! descriptor and the transport observes it.

use crate::fingerprint::FingerprintGenerator;
use crate::types::RequestDescriptor;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

/// Cooperative cancellation signal for a single call.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    id: Uuid,
    token: CancellationToken,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            token: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the handle is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    pub fn same_as(&self, other: &CancelHandle) -> bool {
        self.id == other.id
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

struct InflightEntry {
    descriptor: RequestDescriptor,
    handle: CancelHandle,
}

pub struct CancellationRegistry {
    fingerprints: Arc<FingerprintGenerator>,
    pending: Mutex<HashMap<String, InflightEntry>>,
}

impl CancellationRegistry {
    pub fn new(fingerprints: Arc<FingerprintGenerator>) -> Self {
        Self {
            fingerprints,
            pending: Mutex::new(HashMap::new()),
        }
    }

    fn pending(&self) -> MutexGuard<'_, HashMap<String, InflightEntry>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Attach a fresh handle and fingerprint to `desc` and record it as in flight.
    ///
    /// If the fingerprint is already in flight the returned handle is already
    /// cancelled and the registry is left untouched.
    pub fn register(&self, desc: &mut RequestDescriptor) -> CancelHandle {
        let fingerprint = self.fingerprints.identify(desc);
        let handle = CancelHandle::new();
        desc.lifecycle.fingerprint = Some(fingerprint.clone());
        desc.lifecycle.cancel = Some(handle.clone());

        let mut pending = self.pending();
        if pending.contains_key(&fingerprint) {
            debug!(
                fingerprint = fingerprint.as_str(),
                url = desc.url.as_str(),
                "duplicate request cancelled"
            );
            handle.cancel();
        } else {
            pending.insert(
                fingerprint,
                InflightEntry {
                    descriptor: desc.clone(),
                    handle: handle.clone(),
                },
            );
        }
        handle
    }

    /// Cancel the call registered under `desc`'s fingerprint, which may be an
    /// earlier call than `desc` itself.
    pub fn cancel(&self, desc: &RequestDescriptor) -> bool {
        let fingerprint = self.fingerprints.identify(desc);
        match self.pending().get(&fingerprint) {
            Some(entry) => {
                entry.handle.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every registered call. Entries stay until released or cleared.
    pub fn cancel_all(&self) -> usize {
        let pending = self.pending();
        for entry in pending.values() {
            entry.handle.cancel();
        }
        pending.len()
    }

    /// Remove the entry for `desc`'s fingerprint. Idempotent.
    ///
    /// When `desc` carries its own handle, only an entry owned by that handle is
    /// removed: a cancelled duplicate must not free the slot of the call it
    /// collided with.
    pub fn release(&self, desc: &RequestDescriptor) {
        let fingerprint = self.fingerprints.identify(desc);
        let mut pending = self.pending();
        let owned = match (pending.get(&fingerprint), desc.cancel_handle()) {
            (Some(entry), Some(handle)) => entry.handle.same_as(handle),
            (Some(_), None) => true,
            (None, _) => false,
        };
        if owned {
            pending.remove(&fingerprint);
        }
    }

    /// Drop all entries without signalling them.
    pub fn clear(&self) {
        self.pending().clear();
    }

    pub fn contains(&self, desc: &RequestDescriptor) -> bool {
        let fingerprint = self.fingerprints.identify(desc);
        self.pending().contains_key(&fingerprint)
    }

    /// Descriptor of the call currently owning `desc`'s fingerprint.
    pub fn owner(&self, desc: &RequestDescriptor) -> Option<RequestDescriptor> {
        let fingerprint = self.fingerprints.identify(desc);
        self.pending().get(&fingerprint).map(|e| e.descriptor.clone())
    }

    pub fn len(&self) -> usize {
        self.pending().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
