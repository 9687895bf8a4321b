//! In-memory store for testing.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use gradeboard_core::error::StoreError;
use gradeboard_core::traits::LedgerStore;

/// A process-local store for exercising the sync engine without I/O.
///
/// Counts calls and can be told to fail reads or writes.
#[derive(Default)]
pub struct MemoryStore {
    document: Mutex<Option<Value>>,
    reads: AtomicU32,
    writes: AtomicU32,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a document already stored.
    pub fn with_document(document: Value) -> Self {
        let store = Self::default();
        *store.lock() = Some(document);
        store
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Value>> {
        self.document
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The currently stored document.
    pub fn document(&self) -> Option<Value> {
        self.lock().clone()
    }

    /// Overwrite the stored document, as another client would.
    pub fn replace(&self, document: Value) {
        *self.lock() = Some(document);
    }

    pub fn read_count(&self) -> u32 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Number of successful writes.
    pub fn write_count(&self) -> u32 {
        self.writes.load(Ordering::Relaxed)
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::Relaxed);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self) -> anyhow::Result<Option<Value>> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        if self.fail_reads.load(Ordering::Relaxed) {
            return Err(StoreError::Unavailable("memory store read disabled".into()).into());
        }
        Ok(self.document())
    }

    async fn set(&self, document: &Value) -> anyhow::Result<()> {
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(StoreError::Unavailable("memory store write disabled".into()).into());
        }
        self.writes.fetch_add(1, Ordering::Relaxed);
        *self.lock() = Some(document.clone());
        Ok(())
    }
}
