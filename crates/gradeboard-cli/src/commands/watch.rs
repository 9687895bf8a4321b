//! The `gradeboard watch` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use gradeboard_core::statistics::compute_progress;

use super::Session;

pub async fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let session = Session::open(config_path.as_deref()).await?;
    let engine = session.engine;
    let interval = engine.config().poll_interval;

    let handle = engine.spawn();
    let mut status = engine.subscribe_status();
    let mut last_progress = compute_progress(&engine.snapshot(), engine.corpus());
    eprintln!(
        "Watching ledger every {:.1}s, {}% graded (Ctrl-C to stop)",
        interval.as_secs_f64(),
        last_progress.percent
    );

    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for Ctrl-C")?;
                break;
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *status.borrow_and_update();
                eprintln!("  sync: {current}");
            }
            _ = ticker.tick() => {
                let progress = compute_progress(&engine.snapshot(), engine.corpus());
                if progress != last_progress {
                    eprintln!(
                        "  progress: {}/{} questions ({}%)",
                        progress.graded_questions, progress.total_questions, progress.percent
                    );
                    last_progress = progress;
                }
            }
        }
    }

    handle.shutdown().await;
    tracing::info!("sync stopped");
    Ok(())
}
