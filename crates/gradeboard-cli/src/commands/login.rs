//! The `gradeboard login` command.

use anyhow::Result;

use gradeboard_stores::config::remember_reviewer;

pub fn execute(name: String) -> Result<()> {
    let name = name.trim();
    anyhow::ensure!(!name.is_empty(), "reviewer name must not be empty");

    let path = remember_reviewer(name)?;
    tracing::debug!(path = %path.display(), "reviewer remembered");
    println!("Logged in as {name}");
    Ok(())
}
