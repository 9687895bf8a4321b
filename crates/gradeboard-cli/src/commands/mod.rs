pub mod admin;
pub mod export;
pub mod grade;
pub mod init;
pub mod login;
pub mod metrics;
pub mod progress;
pub mod reviewers;
pub mod watch;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use gradeboard_core::corpus::{validate_corpus, Corpus};
use gradeboard_core::sync::{PullOutcome, PushOutcome, SyncEngine};
use gradeboard_core::traits::LedgerStore;
use gradeboard_stores::config::recall_reviewer;
use gradeboard_stores::{create_store, load_config_from, GradeboardConfig};

/// A configured engine holding the freshly pulled ledger.
pub struct Session {
    pub config: GradeboardConfig,
    pub engine: Arc<SyncEngine>,
}

impl Session {
    /// Load config and corpus, connect the store, and pull once.
    pub async fn open(config_path: Option<&Path>) -> Result<Self> {
        Self::connect(load_config_from(config_path)?).await
    }

    /// Like [`Session::open`] with an already loaded config.
    pub async fn connect(config: GradeboardConfig) -> Result<Self> {
        tracing::debug!(?config, "configuration");

        let corpus = Corpus::load(&config.corpus)?;
        for warning in validate_corpus(&corpus) {
            tracing::warn!(batch = ?warning.batch_id, "corpus: {}", warning.message);
        }

        let store: Arc<dyn LedgerStore> = Arc::from(create_store(&config.store)?);
        let store_name = store.name().to_string();
        let engine = Arc::new(SyncEngine::new(
            store,
            Arc::new(corpus),
            config.sync.to_sync_config()?,
            config.admin_gate(),
        ));

        if engine.pull().await == PullOutcome::Failed {
            anyhow::bail!("could not load the ledger from the {store_name} store");
        }

        Ok(Self { config, engine })
    }

    /// Push local edits now, failing if the store rejects them.
    pub async fn save(&self) -> Result<()> {
        match self.engine.flush().await {
            PushOutcome::Failed => anyhow::bail!("failed to save the ledger; changes were not stored"),
            PushOutcome::Pushed | PushOutcome::Skipped => Ok(()),
        }
    }
}

/// Who is acting: `--reviewer`, `GRADEBOARD_REVIEWER`, the login file, then config.
pub fn resolve_reviewer(flag: Option<String>, config: &GradeboardConfig) -> Option<String> {
    flag.or_else(|| std::env::var("GRADEBOARD_REVIEWER").ok())
        .or_else(recall_reviewer)
        .or_else(|| config.reviewer.clone())
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
}
