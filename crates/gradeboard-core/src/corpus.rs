//! The static question/answer corpus.
//!
//! Loaded once at startup from a JSON array of batches and never mutated.

use std::path::Path;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::{BatchId, QuestionIndex, Slot};

/// One evaluation round: its questions and every model's answers to them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    pub batch_id: BatchId,
    #[serde(default)]
    pub questions: Vec<String>,
    /// Answers per model, index-aligned with `questions`. Keeps file order.
    #[serde(default)]
    pub model_answers: IndexMap<String, Vec<String>>,
}

impl Batch {
    /// The answer a model gave to a question, if one was extracted.
    pub fn answer(&self, model: &str, question: QuestionIndex) -> Option<&str> {
        self.model_answers
            .get(model)
            .and_then(|answers| answers.get(question as usize))
            .map(String::as_str)
    }
}

/// The full, ordered list of batches.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Corpus {
    batches: Vec<Batch>,
}

/// A problem found while validating a corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusWarning {
    pub batch_id: Option<BatchId>,
    pub message: String,
}

impl Corpus {
    pub fn new(batches: Vec<Batch>) -> Self {
        Self { batches }
    }

    /// Load a corpus from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read corpus file: {}", path.display()))?;
        Self::from_json_str(&content)
            .with_context(|| format!("failed to parse corpus: {}", path.display()))
    }

    /// Parse a corpus from JSON text.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let corpus: Corpus = serde_json::from_str(content).context("invalid corpus JSON")?;
        Ok(corpus)
    }

    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    pub fn batch(&self, batch_id: BatchId) -> Option<&Batch> {
        self.batches.iter().find(|b| b.batch_id == batch_id)
    }

    /// Model names in the order the first batch lists them.
    pub fn models(&self) -> Vec<String> {
        self.batches
            .first()
            .map(|b| b.model_answers.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of `(batch, question)` pairs.
    pub fn total_questions(&self) -> usize {
        self.batches.iter().map(|b| b.questions.len()).sum()
    }

    /// Whether a slot names a real batch, question, and model.
    pub fn contains(&self, slot: &Slot) -> bool {
        let Some(batch) = self.batch(slot.batch) else {
            return false;
        };
        (slot.question as usize) < batch.questions.len()
            && self.models().iter().any(|m| *m == slot.model)
    }

    /// Every `(batch, question)` pair in corpus order.
    pub fn questions(&self) -> impl Iterator<Item = (&Batch, QuestionIndex)> + '_ {
        self.batches
            .iter()
            .flat_map(|b| (0..b.questions.len() as QuestionIndex).map(move |q| (b, q)))
    }
}

/// Check a corpus for structural problems.
pub fn validate_corpus(corpus: &Corpus) -> Vec<CorpusWarning> {
    let mut warnings = Vec::new();

    if corpus.batches().is_empty() {
        warnings.push(CorpusWarning {
            batch_id: None,
            message: "corpus has no batches".into(),
        });
        return warnings;
    }

    let models = corpus.models();
    if models.is_empty() {
        warnings.push(CorpusWarning {
            batch_id: None,
            message: "first batch has no model answers, so no models can be graded".into(),
        });
    }

    let mut seen = std::collections::HashSet::new();
    for batch in corpus.batches() {
        if !seen.insert(batch.batch_id) {
            warnings.push(CorpusWarning {
                batch_id: Some(batch.batch_id),
                message: "duplicate batch id".into(),
            });
        }
        if batch.questions.is_empty() {
            warnings.push(CorpusWarning {
                batch_id: Some(batch.batch_id),
                message: "batch has no questions".into(),
            });
        }
        for model in &models {
            match batch.model_answers.get(model) {
                None => warnings.push(CorpusWarning {
                    batch_id: Some(batch.batch_id),
                    message: format!("model '{model}' has no answers"),
                }),
                Some(answers) if answers.len() < batch.questions.len() => {
                    warnings.push(CorpusWarning {
                        batch_id: Some(batch.batch_id),
                        message: format!(
                            "model '{model}' has {} answers for {} questions",
                            answers.len(),
                            batch.questions.len()
                        ),
                    })
                }
                Some(_) => {}
            }
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        {
            "batchId": 1,
            "questions": ["What replaced section 302?", "Define theft."],
            "modelAnswers": {
                "ModelB": ["Section 103", "Section 303"],
                "ModelA": ["Section 101", ""]
            }
        },
        {
            "batchId": 2,
            "questions": ["Punishment for cheating?"],
            "modelAnswers": {
                "ModelA": ["Section 318"]
            }
        }
    ]"#;

    #[test]
    fn models_keep_file_order() {
        let corpus = Corpus::from_json_str(
            r#"[{
                "batchId": 1,
                "questions": ["q"],
                "modelAnswers": { "Zeta": ["z"], "Alpha": ["a"], "Mid": ["m"] }
            }]"#,
        )
        .unwrap();
        assert_eq!(corpus.models(), vec!["Zeta", "Alpha", "Mid"]);
    }

    #[test]
    fn parse_sample_corpus() {
        let corpus = Corpus::from_json_str(SAMPLE).unwrap();
        assert_eq!(corpus.batches().len(), 2);
        assert_eq!(corpus.models(), vec!["ModelA", "ModelB"]);
        assert_eq!(corpus.total_questions(), 3);
        assert_eq!(corpus.questions().count(), 3);
        assert_eq!(
            corpus.batch(1).unwrap().answer("ModelB", 1),
            Some("Section 303")
        );
        assert_eq!(corpus.batch(2).unwrap().answer("ModelB", 0), None);
    }

    #[test]
    fn contains_checks_every_coordinate() {
        let corpus = Corpus::from_json_str(SAMPLE).unwrap();
        assert!(corpus.contains(&Slot::new(1, 1, "ModelA")));
        assert!(corpus.contains(&Slot::new(2, 0, "ModelB")));
        assert!(!corpus.contains(&Slot::new(2, 1, "ModelA")));
        assert!(!corpus.contains(&Slot::new(3, 0, "ModelA")));
        assert!(!corpus.contains(&Slot::new(1, 0, "ModelC")));
    }

    #[test]
    fn validate_reports_missing_answers() {
        let corpus = Corpus::from_json_str(SAMPLE).unwrap();
        let warnings = validate_corpus(&corpus);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].batch_id, Some(2));
        assert!(warnings[0].message.contains("ModelB"));
    }

    #[test]
    fn validate_empty_corpus() {
        let warnings = validate_corpus(&Corpus::default());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("no batches"));
    }

    #[test]
    fn load_missing_file_fails() {
        let err = Corpus::load(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(format!("{err:#}").contains("failed to read corpus file"));
    }
}
