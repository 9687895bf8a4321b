//! Grade mutations and contribution accounting.
//!
//! Every operation takes the prior ledger by reference and returns a fresh
//! one, so callers can compare old and new values and swap atomically.

use std::fmt;

use crate::corpus::Corpus;
use crate::error::{AdminError, GradeError};
use crate::model::{BatchId, Grade, Ledger, QuestionIndex, Slot};

/// One requested change to a single slot. `grade: None` clears the slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeChange {
    pub batch: BatchId,
    pub question: QuestionIndex,
    pub model: String,
    pub grade: Option<Grade>,
}

impl GradeChange {
    pub fn set(batch: BatchId, question: QuestionIndex, model: &str, grade: Grade) -> Self {
        Self {
            batch,
            question,
            model: model.to_string(),
            grade: Some(grade),
        }
    }

    pub fn clear(batch: BatchId, question: QuestionIndex, model: &str) -> Self {
        Self {
            batch,
            question,
            model: model.to_string(),
            grade: None,
        }
    }

    pub fn slot(&self) -> Slot {
        Slot::new(self.batch, self.question, self.model.as_str())
    }
}

/// How a change moved credit between reviewers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribution {
    /// First grade for the slot; the acting reviewer gains one.
    Created { reviewer: String },
    /// Grade cleared; the original author (if known) loses one.
    Removed { previous_author: Option<String> },
    /// Someone else's grade overwritten; credit moves to the acting reviewer.
    Reassigned {
        previous_author: Option<String>,
        reviewer: String,
    },
    /// The author changed their own grade; counts unchanged.
    Revised { reviewer: String },
    /// Clearing an already empty slot.
    Unchanged,
}

impl fmt::Display for Attribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attribution::Created { reviewer } => write!(f, "created by {reviewer}"),
            Attribution::Removed {
                previous_author: Some(author),
            } => write!(f, "removed (credit taken from {author})"),
            Attribution::Removed {
                previous_author: None,
            } => write!(f, "removed"),
            Attribution::Reassigned {
                previous_author: Some(author),
                reviewer,
            } => write!(f, "reassigned from {author} to {reviewer}"),
            Attribution::Reassigned {
                previous_author: None,
                reviewer,
            } => write!(f, "claimed by {reviewer}"),
            Attribution::Revised { reviewer } => write!(f, "revised by {reviewer}"),
            Attribution::Unchanged => write!(f, "unchanged"),
        }
    }
}

/// Apply one grade change on behalf of `reviewer`.
///
/// Rejects the change when no reviewer is given or the slot is not in the
/// corpus. Contribution counts never go below zero.
pub fn apply_grade(
    ledger: &Ledger,
    corpus: &Corpus,
    change: &GradeChange,
    reviewer: Option<&str>,
) -> Result<(Ledger, Attribution), GradeError> {
    let reviewer = reviewer
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .ok_or(GradeError::MissingReviewer)?;

    if !corpus.contains(&change.slot()) {
        return Err(GradeError::UnknownSlot {
            batch: change.batch,
            question: change.question,
            model: change.model.clone(),
        });
    }

    let mut next = ledger.clone();
    let (batch, question, model) = (change.batch, change.question, change.model.as_str());
    let prev_grade = ledger.grade(batch, question, model);
    let prev_author = ledger.author(batch, question, model).map(str::to_string);

    next.grades
        .entry(batch)
        .or_default()
        .entry(question)
        .or_default()
        .insert(model.to_string(), change.grade);

    let authors = next
        .graded_by
        .entry(batch)
        .or_default()
        .entry(question)
        .or_default();
    match change.grade {
        Some(_) => {
            authors.insert(model.to_string(), reviewer.to_string());
        }
        None => {
            authors.remove(model);
        }
    }

    let attribution = match (prev_grade, change.grade) {
        (None, Some(_)) => {
            credit(&mut next, reviewer);
            Attribution::Created {
                reviewer: reviewer.to_string(),
            }
        }
        (Some(_), None) => {
            if let Some(author) = &prev_author {
                debit(&mut next, author);
            }
            Attribution::Removed {
                previous_author: prev_author,
            }
        }
        (Some(_), Some(_)) if prev_author.as_deref() == Some(reviewer) => Attribution::Revised {
            reviewer: reviewer.to_string(),
        },
        (Some(_), Some(_)) => {
            if let Some(author) = &prev_author {
                debit(&mut next, author);
            }
            credit(&mut next, reviewer);
            Attribution::Reassigned {
                previous_author: prev_author,
                reviewer: reviewer.to_string(),
            }
        }
        (None, None) => Attribution::Unchanged,
    };

    Ok((next, attribution))
}

fn credit(ledger: &mut Ledger, reviewer: &str) {
    *ledger.user_stats.entry(reviewer.to_string()).or_insert(0) += 1;
}

fn debit(ledger: &mut Ledger, reviewer: &str) {
    let count = ledger.user_stats.entry(reviewer.to_string()).or_insert(0);
    *count = count.saturating_sub(1);
}

/// Remove a reviewer's counter and every attribution naming them.
///
/// Grades stay in place without an author. Returns the new ledger and the
/// number of attributions removed.
pub fn delete_reviewer(ledger: &Ledger, name: &str) -> (Ledger, usize) {
    let mut next = ledger.clone();
    next.user_stats.remove(name);

    let mut removed = 0;
    for questions in next.graded_by.values_mut() {
        for models in questions.values_mut() {
            let before = models.len();
            models.retain(|_, author| author != name);
            removed += before - models.len();
        }
    }

    (next, removed)
}

/// The empty ledger that replaces everything on a full wipe.
pub fn wipe_all() -> Ledger {
    Ledger::default()
}

/// Shared-secret check guarding administrative operations.
#[derive(Clone, Default)]
pub struct AdminGate {
    pin: Option<String>,
}

impl AdminGate {
    pub fn new(pin: Option<String>) -> Self {
        Self {
            pin: pin.filter(|p| !p.is_empty()),
        }
    }

    /// Accept only an exact match against a configured PIN.
    pub fn authorize(&self, candidate: &str) -> Result<(), AdminError> {
        match &self.pin {
            Some(pin) if pin == candidate.trim() => Ok(()),
            _ => Err(AdminError::InvalidPin),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.pin.is_some()
    }
}

impl fmt::Debug for AdminGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminGate")
            .field("pin", &self.pin.as_ref().map(|_| "***"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Batch;
    use indexmap::IndexMap;

    fn corpus() -> Corpus {
        let mut answers = IndexMap::new();
        answers.insert("ModelA".to_string(), vec!["a0".into(), "a1".into()]);
        answers.insert("ModelB".to_string(), vec!["b0".into(), "b1".into()]);
        Corpus::new(vec![
            Batch {
                batch_id: 1,
                questions: vec!["q0".into(), "q1".into()],
                model_answers: answers.clone(),
            },
            Batch {
                batch_id: 2,
                questions: vec!["q0".into(), "q1".into()],
                model_answers: answers,
            },
        ])
    }

    fn grade(
        ledger: &Ledger,
        change: GradeChange,
        reviewer: &str,
    ) -> (Ledger, Attribution) {
        apply_grade(ledger, &corpus(), &change, Some(reviewer)).unwrap()
    }

    #[test]
    fn create_reassign_remove_scenario() {
        let l0 = Ledger::default();

        let (l1, a) = grade(&l0, GradeChange::set(1, 0, "ModelA", Grade::Correct), "Alice");
        assert!(matches!(a, Attribution::Created { .. }));
        assert_eq!(l1.contributions("Alice"), 1);

        let (l2, a) = grade(&l1, GradeChange::set(1, 0, "ModelA", Grade::Wrong), "Bob");
        assert_eq!(
            a,
            Attribution::Reassigned {
                previous_author: Some("Alice".into()),
                reviewer: "Bob".into()
            }
        );
        assert_eq!(l2.contributions("Alice"), 0);
        assert_eq!(l2.user_stats.get("Alice"), Some(&0));
        assert_eq!(l2.contributions("Bob"), 1);
        assert_eq!(l2.author(1, 0, "ModelA"), Some("Bob"));

        let (l3, a) = grade(&l2, GradeChange::clear(1, 0, "ModelA"), "Bob");
        assert!(matches!(a, Attribution::Removed { .. }));
        assert_eq!(l3.contributions("Bob"), 0);
        assert_eq!(l3.author(1, 0, "ModelA"), None);
        assert_eq!(l3.grades[&1][&0].get("ModelA"), Some(&None));

        // The prior value was never touched.
        assert_eq!(l1.author(1, 0, "ModelA"), Some("Alice"));
    }

    #[test]
    fn removal_debits_original_author_not_clearer() {
        let (l1, _) = grade(
            &Ledger::default(),
            GradeChange::set(1, 1, "ModelB", Grade::SomewhatCorrect),
            "Alice",
        );
        let (l2, a) = grade(&l1, GradeChange::clear(1, 1, "ModelB"), "Carol");
        assert_eq!(
            a,
            Attribution::Removed {
                previous_author: Some("Alice".into())
            }
        );
        assert_eq!(l2.contributions("Alice"), 0);
        assert!(!l2.user_stats.contains_key("Carol"));
    }

    #[test]
    fn same_author_revision_keeps_counts() {
        let (l1, _) = grade(
            &Ledger::default(),
            GradeChange::set(2, 0, "ModelA", Grade::Wrong),
            "Alice",
        );
        let (l2, a) = grade(&l1, GradeChange::set(2, 0, "ModelA", Grade::Correct), "Alice");
        assert!(matches!(a, Attribution::Revised { .. }));
        assert_eq!(l2.contributions("Alice"), 1);
        assert_eq!(l2.grade(2, 0, "ModelA"), Some(Grade::Correct));
    }

    #[test]
    fn missing_reviewer_is_rejected() {
        let change = GradeChange::set(1, 0, "ModelA", Grade::Correct);
        for reviewer in [None, Some(""), Some("   ")] {
            let err = apply_grade(&Ledger::default(), &corpus(), &change, reviewer).unwrap_err();
            assert_eq!(err, GradeError::MissingReviewer);
        }
    }

    #[test]
    fn unknown_slot_is_rejected() {
        let change = GradeChange::set(9, 0, "ModelA", Grade::Correct);
        let err = apply_grade(&Ledger::default(), &corpus(), &change, Some("Alice")).unwrap_err();
        assert!(matches!(err, GradeError::UnknownSlot { batch: 9, .. }));

        let change = GradeChange::set(1, 5, "ModelA", Grade::Correct);
        assert!(apply_grade(&Ledger::default(), &corpus(), &change, Some("Alice")).is_err());

        let change = GradeChange::set(1, 0, "ModelZ", Grade::Correct);
        assert!(apply_grade(&Ledger::default(), &corpus(), &change, Some("Alice")).is_err());
    }

    #[test]
    fn decrement_floors_at_zero_for_unattributed_grades() {
        // Legacy documents carry grades with no author and no counters.
        let mut legacy = Ledger::default();
        legacy
            .grades
            .entry(1)
            .or_default()
            .entry(0)
            .or_default()
            .insert("ModelA".into(), Some(Grade::Correct));

        let (l1, a) = grade(&legacy, GradeChange::set(1, 0, "ModelA", Grade::Wrong), "Bob");
        assert_eq!(
            a,
            Attribution::Reassigned {
                previous_author: None,
                reviewer: "Bob".into()
            }
        );
        assert_eq!(l1.contributions("Bob"), 1);

        let mut orphan = l1.clone();
        orphan.user_stats.clear();
        let (l2, _) = grade(&orphan, GradeChange::clear(1, 0, "ModelA"), "Bob");
        assert_eq!(l2.user_stats.get("Bob"), Some(&0));
    }

    #[test]
    fn invariants_and_conservation_hold_over_sequences() {
        let corpus = corpus();
        let reviewers = ["Alice", "Bob", "Carol"];
        let models = ["ModelA", "ModelB"];
        let grades = [
            Some(Grade::Correct),
            None,
            Some(Grade::Wrong),
            Some(Grade::SomewhatCorrect),
            None,
            Some(Grade::NoAnswer),
        ];

        let mut ledger = Ledger::default();
        // Deterministic pseudo-random walk over slots, grades, and reviewers.
        let mut seed: u64 = 0x9e37_79b9_7f4a_7c15;
        for _ in 0..500 {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            let change = GradeChange {
                batch: 1 + (seed % 2) as u32,
                question: ((seed >> 8) % 2) as u32,
                model: models[((seed >> 16) % 2) as usize].to_string(),
                grade: grades[((seed >> 24) % grades.len() as u64) as usize],
            };
            let reviewer = reviewers[((seed >> 32) % 3) as usize];
            let (next, _) = apply_grade(&ledger, &corpus, &change, Some(reviewer)).unwrap();
            ledger = next;

            let violations = ledger.invariant_violations(&corpus);
            assert!(violations.is_empty(), "violations: {violations:?}");

            // Credit in circulation equals the number of graded slots.
            let graded = ledger
                .grades
                .values()
                .flat_map(|q| q.values())
                .flat_map(|m| m.values())
                .filter(|g| g.is_some())
                .count() as u64;
            let credited: u64 = ledger.user_stats.values().sum();
            assert_eq!(graded, credited);
        }
    }

    #[test]
    fn delete_reviewer_strips_attributions_but_keeps_grades() {
        let (l1, _) = grade(
            &Ledger::default(),
            GradeChange::set(1, 0, "ModelA", Grade::Correct),
            "Alice",
        );
        let (l2, _) = grade(&l1, GradeChange::set(1, 1, "ModelA", Grade::Wrong), "Alice");
        let (l3, _) = grade(&l2, GradeChange::set(2, 0, "ModelB", Grade::Correct), "Bob");

        let (l4, removed) = delete_reviewer(&l3, "Alice");
        assert_eq!(removed, 2);
        assert!(!l4.user_stats.contains_key("Alice"));
        assert_eq!(l4.contributions("Bob"), 1);
        assert_eq!(l4.grade(1, 0, "ModelA"), Some(Grade::Correct));
        assert_eq!(l4.author(1, 0, "ModelA"), None);
        assert_eq!(l4.author(2, 0, "ModelB"), Some("Bob"));
    }

    #[test]
    fn wipe_all_is_empty() {
        let ledger = wipe_all();
        assert!(ledger.grades.is_empty());
        assert!(ledger.graded_by.is_empty());
        assert!(ledger.user_stats.is_empty());
    }

    #[test]
    fn admin_gate_checks_pin() {
        let gate = AdminGate::new(Some("4321".into()));
        assert!(gate.authorize("4321").is_ok());
        assert_eq!(gate.authorize("1234"), Err(AdminError::InvalidPin));
        assert!(!format!("{gate:?}").contains("4321"));

        let open = AdminGate::new(None);
        assert!(!open.is_configured());
        assert_eq!(open.authorize(""), Err(AdminError::InvalidPin));
    }
}
