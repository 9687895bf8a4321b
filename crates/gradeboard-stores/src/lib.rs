//! gradeboard-stores: Ledger store backends.
//!
//! Implements the `LedgerStore` trait for a local JSON file, a REST
//! key-value service, and an in-memory double, plus the configuration
//! that selects between them.

pub mod config;
pub mod file;
pub mod memory;
pub mod rest_kv;

pub use config::{
    create_store, load_config_from, GradeboardConfig, StoreConfig, SyncSettings,
};
pub use gradeboard_core::error::StoreError;
