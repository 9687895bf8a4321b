//! Reliability metrics and aggregate progress.
//!
//! Everything here is a pure function of the ledger and corpus: no cached
//! state, so calling twice on the same inputs yields identical output.

use serde::{Deserialize, Serialize};

use crate::corpus::Corpus;
use crate::model::{Grade, Ledger};

/// Weight of each outcome in the composite score.
const CORRECT_WEIGHT: f64 = 1.0;
const PARTIAL_WEIGHT: f64 = 0.5;
const ABSTAIN_WEIGHT: f64 = 0.0;
const WRONG_WEIGHT: f64 = -1.0;

/// Outcome counts for one model. The four buckets sum to `total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeCounts {
    pub correct: u32,
    pub partial: u32,
    pub wrong: u32,
    /// Answers graded `no_answer` plus slots nobody has graded yet.
    pub abstain: u32,
    pub total: u32,
}

impl GradeCounts {
    fn record(&mut self, grade: Option<Grade>) {
        self.total += 1;
        match grade {
            Some(Grade::Correct) => self.correct += 1,
            Some(Grade::SomewhatCorrect) => self.partial += 1,
            Some(Grade::Wrong) => self.wrong += 1,
            Some(Grade::NoAnswer) | None => self.abstain += 1,
        }
    }

    /// Percentage of `count` over the total, one decimal place.
    fn rate(&self, count: u32) -> f64 {
        round1(count as f64 / self.total.max(1) as f64 * 100.0)
    }
}

/// Penalty-weighted composite in `[0, 100]`.
///
/// A wrong answer costs as much as a correct one earns, so a model that
/// hallucinates at least as often as it is right scores zero.
pub fn composite_score(counts: &GradeCounts) -> f64 {
    let raw = counts.correct as f64 * CORRECT_WEIGHT
        + counts.partial as f64 * PARTIAL_WEIGHT
        + counts.abstain as f64 * ABSTAIN_WEIGHT
        + counts.wrong as f64 * WRONG_WEIGHT;
    let normalized = raw / counts.total.max(1) as f64 * 100.0;
    round1(normalized.clamp(0.0, 100.0))
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Rates and composite score for a single model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub model: String,
    pub counts: GradeCounts,
    /// Share of answers graded correct.
    pub truthfulness: f64,
    /// Share of answers graded wrong.
    pub hallucination: f64,
    /// Share of answers graded somewhat correct.
    pub groundedness: f64,
    /// Share of answers with no answer or no grade.
    pub abstention: f64,
    /// Reliability index used for ranking.
    pub composite: f64,
}

/// Compute per-model metrics, ranked by composite score (descending).
///
/// Ties keep the corpus model order.
pub fn compute_metrics(ledger: &Ledger, corpus: &Corpus) -> Vec<ModelMetrics> {
    let models = corpus.models();

    let mut metrics: Vec<ModelMetrics> = models
        .iter()
        .map(|model| {
            let mut counts = GradeCounts::default();
            for (batch, question) in corpus.questions() {
                counts.record(ledger.grade(batch.batch_id, question, model));
            }
            ModelMetrics {
                model: model.clone(),
                counts,
                truthfulness: counts.rate(counts.correct),
                hallucination: counts.rate(counts.wrong),
                groundedness: counts.rate(counts.partial),
                abstention: counts.rate(counts.abstain),
                composite: composite_score(&counts),
            }
        })
        .collect();

    metrics.sort_by(|a, b| b.composite.total_cmp(&a.composite));
    metrics
}

/// Standout models for a metrics table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Highlights {
    pub top_composite: String,
    pub top_truthfulness: String,
    pub top_hallucination: String,
}

/// Pick the leaders; the earliest model wins a tie. `None` when empty.
pub fn highlights(metrics: &[ModelMetrics]) -> Option<Highlights> {
    let leader = |key: fn(&ModelMetrics) -> f64| -> Option<String> {
        let mut best: Option<&ModelMetrics> = None;
        for m in metrics {
            if best.map_or(true, |b| key(m) > key(b)) {
                best = Some(m);
            }
        }
        best.map(|m| m.model.clone())
    };

    Some(Highlights {
        top_composite: leader(|m| m.composite)?,
        top_truthfulness: leader(|m| m.truthfulness)?,
        top_hallucination: leader(|m| m.hallucination)?,
    })
}

/// How much of the corpus has been fully graded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Questions where every model has a non-null grade.
    pub graded_questions: usize,
    pub total_questions: usize,
    /// Rounded to the nearest whole percent.
    pub percent: u32,
}

pub fn compute_progress(ledger: &Ledger, corpus: &Corpus) -> Progress {
    let models = corpus.models();
    let total_questions = corpus.total_questions();
    let graded_questions = corpus
        .questions()
        .filter(|(batch, question)| {
            !models.is_empty()
                && models
                    .iter()
                    .all(|m| ledger.grade(batch.batch_id, *question, m).is_some())
        })
        .count();

    let percent = if total_questions == 0 {
        0
    } else {
        (graded_questions as f64 / total_questions as f64 * 100.0).round() as u32
    };

    Progress {
        graded_questions,
        total_questions,
        percent,
    }
}

/// One reviewer's standing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewerActivity {
    pub name: String,
    pub contributions: u64,
}

/// Reviewers by contribution count (descending), plus the overall total.
pub fn reviewer_activity(ledger: &Ledger) -> (Vec<ReviewerActivity>, u64) {
    let mut reviewers: Vec<ReviewerActivity> = ledger
        .user_stats
        .iter()
        .map(|(name, count)| ReviewerActivity {
            name: name.clone(),
            contributions: *count,
        })
        .collect();
    reviewers.sort_by(|a, b| {
        b.contributions
            .cmp(&a.contributions)
            .then_with(|| a.name.cmp(&b.name))
    });
    let total = reviewers.iter().map(|r| r.contributions).sum();
    (reviewers, total)
}
