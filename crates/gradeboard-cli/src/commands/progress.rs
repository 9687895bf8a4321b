//! The `gradeboard progress` command.

use std::path::PathBuf;

use anyhow::Result;

use gradeboard_core::statistics::compute_progress;

use super::Session;

pub async fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let session = Session::open(config_path.as_deref()).await?;
    let progress = compute_progress(&session.engine.snapshot(), session.engine.corpus());

    println!(
        "Graded {}/{} questions ({}%)",
        progress.graded_questions, progress.total_questions, progress.percent
    );
    Ok(())
}
