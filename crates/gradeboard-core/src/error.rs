//! Error types for the grading core.
//!
//! Store errors are defined here rather than in `gradeboard-stores` so the
//! sync engine can classify failures without string matching.

use thiserror::Error;

use crate::model::{BatchId, QuestionIndex};

/// A grade mutation was rejected before touching the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GradeError {
    /// No reviewer identity was supplied with the change.
    #[error("a reviewer name is required before grading")]
    MissingReviewer,

    /// The slot does not exist in the question/answer corpus.
    #[error("no such slot in corpus: batch {batch}, question {question}, model '{model}'")]
    UnknownSlot {
        batch: BatchId,
        question: QuestionIndex,
        model: String,
    },
}

/// An administrative operation was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdminError {
    /// The supplied PIN does not match, or no PIN is configured.
    #[error("invalid admin PIN")]
    InvalidPin,
}

/// The fetched document could not be interpreted as a ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("malformed ledger document: {0}")]
    Malformed(String),
}

/// Errors that can occur when talking to a ledger store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not be reached (filesystem or network failure).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The backend answered with a non-success HTTP status.
    #[error("store error (HTTP {status}): {message}")]
    Http { status: u16, message: String },

    /// The request timed out.
    #[error("store request timed out after {0}s")]
    Timeout(u64),

    /// The backend returned something that is not a JSON document.
    #[error("malformed store response: {0}")]
    Malformed(String),
}

impl StoreError {
    /// Returns `true` if the failure is worth retrying on the next cycle.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Unavailable(_) | StoreError::Timeout(_) => true,
            StoreError::Http { status, .. } => *status == 429 || *status >= 500,
            StoreError::Malformed(_) => false,
        }
    }
}
