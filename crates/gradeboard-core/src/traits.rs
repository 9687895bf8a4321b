//! The storage seam.
//!
//! Implemented by the `gradeboard-stores` crate for files, remote key-value
//! entries, and an in-memory double.

use async_trait::async_trait;
use serde_json::Value;

/// At-most-one-document storage for the shared ledger.
///
/// There are no transactions, versions, or partial updates: `set` replaces
/// whatever is stored, so concurrent writers resolve as last-write-wins.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Human-readable backend name (e.g. "file").
    fn name(&self) -> &str;

    /// Fetch the stored document, or `None` if nothing has been written yet.
    async fn get(&self) -> anyhow::Result<Option<Value>>;

    /// Replace the stored document wholesale.
    async fn set(&self, document: &Value) -> anyhow::Result<()>;
}
