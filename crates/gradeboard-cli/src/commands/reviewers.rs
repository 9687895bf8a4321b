//! The `gradeboard reviewers` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use gradeboard_core::statistics::reviewer_activity;

use super::Session;

pub async fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let session = Session::open(config_path.as_deref()).await?;
    let (reviewers, total) = reviewer_activity(&session.engine.snapshot());

    if reviewers.is_empty() {
        println!("No reviewers yet.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Reviewer", "Grades"]);
    for r in &reviewers {
        table.add_row(vec![Cell::new(&r.name), Cell::new(r.contributions)]);
    }

    println!("{table}");
    println!("\nTotal contributions: {total}");
    Ok(())
}
