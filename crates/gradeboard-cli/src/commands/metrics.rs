//! The `gradeboard metrics` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};
use serde::Serialize;

use gradeboard_core::statistics::{compute_metrics, highlights, Highlights, ModelMetrics};

use super::Session;

#[derive(Serialize)]
struct MetricsOutput {
    models: Vec<ModelMetrics>,
    highlights: Option<Highlights>,
}

pub async fn execute(config_path: Option<PathBuf>, format: String) -> Result<()> {
    let session = Session::open(config_path.as_deref()).await?;
    let ledger = session.engine.snapshot();
    let metrics = compute_metrics(&ledger, session.engine.corpus());
    let leaders = highlights(&metrics);

    match format.as_str() {
        "json" => {
            let output = MetricsOutput {
                models: metrics,
                highlights: leaders,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        "text" => print_table(&metrics, leaders.as_ref()),
        other => anyhow::bail!("unknown format: {other} (expected text or json)"),
    }

    Ok(())
}

fn print_table(metrics: &[ModelMetrics], leaders: Option<&Highlights>) {
    if metrics.is_empty() {
        println!("No models in corpus.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec![
        "Model",
        "Composite",
        "Truthfulness %",
        "Hallucination %",
        "Groundedness %",
        "Abstention %",
        "Graded",
    ]);

    for m in metrics {
        let graded = m.counts.correct + m.counts.partial + m.counts.wrong;
        table.add_row(vec![
            Cell::new(&m.model),
            Cell::new(format!("{:.1}", m.composite)),
            Cell::new(format!("{:.1}", m.truthfulness)),
            Cell::new(format!("{:.1}", m.hallucination)),
            Cell::new(format!("{:.1}", m.groundedness)),
            Cell::new(format!("{:.1}", m.abstention)),
            Cell::new(format!("{graded}/{}", m.counts.total)),
        ]);
    }

    println!("{table}");

    if let Some(h) = leaders {
        println!("\nMost reliable: {}", h.top_composite);
        println!("Most truthful: {}", h.top_truthfulness);
        println!("Most hallucinations: {}", h.top_hallucination);
    }
}
