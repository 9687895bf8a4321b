//! The `gradeboard admin` commands.
//!
//! The PIN is checked against the config before the store is touched.

use std::path::PathBuf;

use anyhow::Result;

use gradeboard_stores::{load_config_from, GradeboardConfig};

use super::Session;

fn authorized_config(config_path: Option<PathBuf>, pin: &str) -> Result<GradeboardConfig> {
    let config = load_config_from(config_path.as_deref())?;
    config.admin_gate().authorize(pin)?;
    Ok(config)
}

pub async fn delete_reviewer(config_path: Option<PathBuf>, name: String, pin: String) -> Result<()> {
    let config = authorized_config(config_path, &pin)?;
    let session = Session::connect(config).await?;
    let name = name.trim();
    let removed = session.engine.delete_reviewer(&pin, name)?;
    session.save().await?;

    println!("Deleted reviewer {name} ({removed} attributions removed)");
    Ok(())
}

pub async fn wipe(config_path: Option<PathBuf>, pin: String) -> Result<()> {
    let config = authorized_config(config_path, &pin)?;
    let session = Session::connect(config).await?;
    session.engine.wipe_all(&pin)?;
    session.save().await?;

    println!("All grades wiped");
    Ok(())
}
