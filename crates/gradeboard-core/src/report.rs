//! Point-in-time export of the corpus joined with the ledger.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::corpus::Corpus;
use crate::model::{BatchId, Grade, Ledger, QuestionIndex};

/// Placeholder used when a model has no answer for a question.
pub const MISSING_ANSWER: &str = "No answer extracted";

/// A flattened snapshot for offline analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportReport {
    /// Unique export identifier.
    pub id: Uuid,
    /// When the export was produced.
    pub timestamp: DateTime<Utc>,
    pub models: Vec<String>,
    pub batches: Vec<ExportBatch>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBatch {
    pub batch_id: BatchId,
    pub questions: Vec<ExportQuestion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportQuestion {
    pub question_index: QuestionIndex,
    pub question_text: String,
    /// Keyed by model name.
    pub evaluations: BTreeMap<String, Evaluation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub answer: String,
    pub evaluation: Option<Grade>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

impl ExportReport {
    /// Join every corpus slot with its grade and author.
    pub fn build(ledger: &Ledger, corpus: &Corpus) -> Self {
        let models = corpus.models();

        let batches = corpus
            .batches()
            .iter()
            .map(|batch| ExportBatch {
                batch_id: batch.batch_id,
                questions: batch
                    .questions
                    .iter()
                    .enumerate()
                    .map(|(index, text)| {
                        let question = index as QuestionIndex;
                        let evaluations = models
                            .iter()
                            .map(|model| {
                                let evaluation = Evaluation {
                                    answer: batch
                                        .answer(model, question)
                                        .filter(|a| !a.is_empty())
                                        .unwrap_or(MISSING_ANSWER)
                                        .to_string(),
                                    evaluation: ledger.grade(batch.batch_id, question, model),
                                    author: ledger
                                        .author(batch.batch_id, question, model)
                                        .map(str::to_string),
                                };
                                (model.clone(), evaluation)
                            })
                            .collect();
                        ExportQuestion {
                            question_index: question,
                            question_text: text.clone(),
                            evaluations,
                        }
                    })
                    .collect(),
            })
            .collect();

        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            models,
            batches,
        }
    }

    /// Default file name, stamped with the export time.
    pub fn file_name(&self) -> String {
        format!(
            "gradeboard-export-{}.json",
            self.timestamp.format("%Y-%m-%dT%H%M%S")
        )
    }

    /// Save the report as pretty JSON.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize export")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write export to {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribution::{apply_grade, GradeChange};

    fn corpus() -> Corpus {
        Corpus::from_json_str(
            r#"[{
                "batchId": 4,
                "questions": ["Q one", "Q two"],
                "modelAnswers": { "A": ["a1"], "B": ["b1", "b2"] }
            }]"#,
        )
        .unwrap()
    }

    #[test]
    fn export_joins_answers_grades_and_authors() {
        let corpus = corpus();
        let (ledger, _) = apply_grade(
            &Ledger::default(),
            &corpus,
            &GradeChange::set(4, 1, "B", Grade::SomewhatCorrect),
            Some("Dana"),
        )
        .unwrap();

        let report = ExportReport::build(&ledger, &corpus);
        assert_eq!(report.models, vec!["A", "B"]);
        let q1 = &report.batches[0].questions[1];
        assert_eq!(q1.question_text, "Q two");
        assert_eq!(q1.evaluations["A"].answer, MISSING_ANSWER);
        assert_eq!(q1.evaluations["A"].evaluation, None);
        assert_eq!(
            q1.evaluations["B"],
            Evaluation {
                answer: "b2".into(),
                evaluation: Some(Grade::SomewhatCorrect),
                author: Some("Dana".into()),
            }
        );
    }

    #[test]
    fn save_json_writes_camel_case() {
        let dir = tempfile::tempdir().unwrap();
        let report = ExportReport::build(&Ledger::default(), &corpus());
        let path = dir.path().join("out").join(report.file_name());
        report.save_json(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["batches"][0]["batchId"], 4);
        assert_eq!(value["batches"][0]["questions"][0]["questionText"], "Q one");
        assert!(value["batches"][0]["questions"][0]["evaluations"]["A"]
            .get("author")
            .is_none());
    }
}
