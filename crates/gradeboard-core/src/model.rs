//! Core data model types for gradeboard.
//!
//! The [`Ledger`] is the single shared document: every grade, who gave it,
//! and how many grades each reviewer is currently credited with.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::corpus::Corpus;
use crate::error::LedgerError;

/// Batch identifier as it appears in the corpus.
pub type BatchId = u32;

/// Zero-based position of a question inside its batch.
pub type QuestionIndex = u32;

/// `batch -> question -> model -> T`
pub type SlotMap<T> = BTreeMap<BatchId, BTreeMap<QuestionIndex, BTreeMap<String, T>>>;

/// A reviewer's verdict on one model answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
    Correct,
    #[serde(alias = "somewhat correct")]
    SomewhatCorrect,
    Wrong,
    #[serde(alias = "no answer")]
    NoAnswer,
}

impl Grade {
    pub const ALL: [Grade; 4] = [
        Grade::Correct,
        Grade::SomewhatCorrect,
        Grade::Wrong,
        Grade::NoAnswer,
    ];
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grade::Correct => write!(f, "correct"),
            Grade::SomewhatCorrect => write!(f, "somewhat_correct"),
            Grade::Wrong => write!(f, "wrong"),
            Grade::NoAnswer => write!(f, "no_answer"),
        }
    }
}

impl FromStr for Grade {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "correct" => Ok(Grade::Correct),
            "somewhat_correct" | "partial" => Ok(Grade::SomewhatCorrect),
            "wrong" => Ok(Grade::Wrong),
            "no_answer" | "abstain" => Ok(Grade::NoAnswer),
            other => Err(format!("unknown grade: {other}")),
        }
    }
}

/// Address of one gradeable answer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Slot {
    pub batch: BatchId,
    pub question: QuestionIndex,
    pub model: String,
}

impl Slot {
    pub fn new(batch: BatchId, question: QuestionIndex, model: impl Into<String>) -> Self {
        Self {
            batch,
            question,
            model: model.into(),
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.batch, self.question, self.model)
    }
}

/// The shared grading document.
///
/// A `null` grade is kept as `Some(None)` in the map so that documents
/// written by other clients compare equal after a round trip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ledger {
    #[serde(default)]
    pub grades: SlotMap<Option<Grade>>,
    #[serde(default)]
    pub graded_by: SlotMap<String>,
    #[serde(default)]
    pub user_stats: BTreeMap<String, u64>,
}

const CANONICAL_KEYS: [&str; 3] = ["grades", "gradedBy", "userStats"];

impl Ledger {
    /// The grade currently stored for a slot, if any.
    pub fn grade(&self, batch: BatchId, question: QuestionIndex, model: &str) -> Option<Grade> {
        self.grades
            .get(&batch)
            .and_then(|q| q.get(&question))
            .and_then(|m| m.get(model))
            .copied()
            .flatten()
    }

    /// The reviewer credited with a slot's grade, if any.
    pub fn author(&self, batch: BatchId, question: QuestionIndex, model: &str) -> Option<&str> {
        self.graded_by
            .get(&batch)
            .and_then(|q| q.get(&question))
            .and_then(|m| m.get(model))
            .map(String::as_str)
    }

    /// Contribution count for a reviewer (0 when unknown).
    pub fn contributions(&self, reviewer: &str) -> u64 {
        self.user_stats.get(reviewer).copied().unwrap_or(0)
    }

    /// Interpret a document fetched from a store.
    ///
    /// Accepts the canonical shape, `null` (nothing stored yet), a JSON
    /// string wrapping a document, and the legacy shape where the whole
    /// object is the `grades` mapping.
    pub fn from_document(document: Value) -> Result<Self, LedgerError> {
        let document = match document {
            Value::String(text) => serde_json::from_str(&text)
                .map_err(|e| LedgerError::Malformed(format!("stringified document: {e}")))?,
            other => other,
        };

        match document {
            Value::Null => Ok(Ledger::default()),
            Value::Object(mut map) if CANONICAL_KEYS.iter().any(|k| map.contains_key(*k)) => {
                // A null top-level key reads as an empty mapping.
                map.retain(|key, value| {
                    !(value.is_null() && CANONICAL_KEYS.contains(&key.as_str()))
                });
                serde_json::from_value(Value::Object(map))
                    .map_err(|e| LedgerError::Malformed(e.to_string()))
            }
            Value::Object(map) => {
                tracing::info!("upgrading legacy ledger document without a grades key");
                let grades = serde_json::from_value(Value::Object(map))
                    .map_err(|e| LedgerError::Malformed(format!("legacy grades: {e}")))?;
                Ok(Ledger {
                    grades,
                    ..Ledger::default()
                })
            }
            other => Err(LedgerError::Malformed(format!(
                "expected an object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// The canonical document shape written back to stores.
    pub fn to_document(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Default::default()))
    }

    /// Check the ledger's structural invariants against the corpus.
    ///
    /// Returns one human-readable line per violation; empty means consistent.
    pub fn invariant_violations(&self, corpus: &Corpus) -> Vec<String> {
        let mut violations = Vec::new();

        for (batch, questions) in &self.grades {
            for (question, models) in questions {
                for (model, grade) in models {
                    let slot = Slot::new(*batch, *question, model.as_str());
                    if !corpus.contains(&slot) {
                        violations.push(format!("grade for unknown slot {slot}"));
                    }
                    if grade.is_some() && self.author(*batch, *question, model).is_none() {
                        violations.push(format!("graded slot {slot} has no author"));
                    }
                }
            }
        }

        for (batch, questions) in &self.graded_by {
            for (question, models) in questions {
                for (model, author) in models {
                    if self.grade(*batch, *question, model).is_none() {
                        violations.push(format!(
                            "author '{author}' recorded for ungraded slot {batch}/{question}/{model}"
                        ));
                    }
                    if self.contributions(author) == 0 {
                        violations.push(format!(
                            "reviewer '{author}' is credited with {batch}/{question}/{model} but has no contributions"
                        ));
                    }
                }
            }
        }

        violations
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
