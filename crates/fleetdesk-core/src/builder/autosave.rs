//! Debounced, fire-and-forget draft saving for one storage key.
//!
//! Every [`DraftAutosaver::schedule`] call supersedes the previously
//! scheduled draft and restarts the quiet period. Only the newest draft is
//! ever written, and a write never replaces one scheduled after it: each
//! draft carries a generation number, and writes are serialized behind a lock
//! that remembers the highest generation already persisted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use fleetdesk_types::error::RepositoryError;

use super::draft_store::{Draft, DraftStore};

struct Inner<S> {
    store: S,
    debounce: Duration,
    generation: AtomicU64,
    pending: Mutex<Option<(u64, Draft)>>,
    /// Highest generation written so far.
    written: tokio::sync::Mutex<u64>,
    last_error: Mutex<Option<String>>,
}

/// One autosaver per builder session; every scheduled draft shares a key.
pub struct DraftAutosaver<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for DraftAutosaver<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: DraftStore + 'static> DraftAutosaver<S> {
    pub fn new(store: S, debounce: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                debounce,
                generation: AtomicU64::new(0),
                pending: Mutex::new(None),
                written: tokio::sync::Mutex::new(0),
                last_error: Mutex::new(None),
            }),
        }
    }

    pub fn store(&self) -> &S {
        &self.inner.store
    }

    /// Queue `draft` for writing once the debounce interval passes without a
    /// newer schedule. Returns immediately; must be called inside a tokio
    /// runtime.
    pub fn schedule(&self, draft: Draft) {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(key = %draft.key, generation, "draft save scheduled");
        *self
            .inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some((generation, draft));

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(inner.debounce).await;
            if inner.generation.load(Ordering::SeqCst) != generation {
                return;
            }
            if let Err(e) = inner.write_pending().await {
                tracing::warn!(error = %e, "debounced draft save failed");
            }
        });
    }

    /// Write the pending draft now, bypassing the debounce.
    ///
    /// Returns `Ok(false)` when nothing was pending.
    pub async fn flush(&self) -> Result<bool, RepositoryError> {
        self.inner.write_pending().await
    }

    pub fn has_pending(&self) -> bool {
        self.inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Message of the most recent failed write, cleared by a successful one.
    pub fn last_error(&self) -> Option<String> {
        self.inner
            .last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl<S: DraftStore> Inner<S> {
    async fn write_pending(&self) -> Result<bool, RepositoryError> {
        let mut written = self.written.lock().await;

        let taken = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some((generation, draft)) = taken else {
            return Ok(false);
        };
        if generation <= *written {
            return Ok(false);
        }

        let key = draft.key.clone();
        match self.store.save_draft(draft.clone()).await {
            Ok(()) => {
                *written = generation;
                *self.last_error.lock().unwrap_or_else(PoisonError::into_inner) = None;
                tracing::debug!(key = %key, generation, "draft saved");
                Ok(true)
            }
            Err(e) => {
                // Keep the draft for the next flush unless a newer one arrived.
                let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
                if pending.is_none() {
                    *pending = Some((generation, draft));
                }
                drop(pending);
                *self.last_error.lock().unwrap_or_else(PoisonError::into_inner) = Some(e.to_string());
                Err(e)
            }
        }
    }
}
