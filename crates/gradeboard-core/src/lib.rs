//! gradeboard-core: Grading ledger, attribution, metrics, and sync.
//!
//! This crate defines the shared ledger data model, the rules for moving
//! reviewer credit as grades change, the reliability metrics derived from
//! the ledger, and the engine that keeps a client in step with the store.

pub mod attribution;
pub mod corpus;
pub mod error;
pub mod model;
pub mod report;
pub mod statistics;
pub mod sync;
pub mod traits;
