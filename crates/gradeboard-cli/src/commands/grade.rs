//! The `gradeboard grade` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use gradeboard_core::attribution::GradeChange;
use gradeboard_core::model::Grade;

use super::{resolve_reviewer, Session};

pub async fn execute(
    config_path: Option<PathBuf>,
    reviewer: Option<String>,
    batch: u32,
    question: u32,
    model: String,
    grade: String,
) -> Result<()> {
    let change = match grade.trim() {
        "none" | "clear" => GradeChange::clear(batch, question, &model),
        other => {
            let grade = other.parse::<Grade>().map_err(anyhow::Error::msg)?;
            GradeChange::set(batch, question, &model, grade)
        }
    };

    let session = Session::open(config_path.as_deref()).await?;
    let reviewer = resolve_reviewer(reviewer, &session.config);

    let attribution = session
        .engine
        .apply_grade(&change, reviewer.as_deref())
        .with_context(|| format!("cannot grade {}", change.slot()))?;
    session.save().await?;

    let shown = change
        .grade
        .map_or_else(|| "cleared".to_string(), |g| g.to_string());
    println!("{}: {shown} ({attribution})", change.slot());
    Ok(())
}
