//! The `gradeboard export` command.

use std::path::PathBuf;

use anyhow::Result;

use gradeboard_core::report::ExportReport;

use super::Session;

pub async fn execute(config_path: Option<PathBuf>, output: Option<PathBuf>) -> Result<()> {
    let session = Session::open(config_path.as_deref()).await?;
    let report = ExportReport::build(&session.engine.snapshot(), session.engine.corpus());

    let path = output.unwrap_or_else(|| PathBuf::from(report.file_name()));
    report.save_json(&path)?;

    tracing::info!(export_id = %report.id, "export written");
    println!("Exported {} batches to {}", report.batches.len(), path.display());
    Ok(())
}
