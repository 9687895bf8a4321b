//! Client-side synchronization with the shared ledger store.
//!
//! Two timers drive the engine: a fixed-interval pull and a debounced push
//! that restarts on every local edit. The only concurrency control is a
//! grace window after each local edit during which pulls are skipped;
//! between clients the store resolves conflicts as last-write-wins on the
//! whole document.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::attribution::{self, AdminGate, Attribution, GradeChange};
use crate::corpus::Corpus;
use crate::error::{AdminError, GradeError, StoreError};
use crate::model::Ledger;
use crate::traits::LedgerStore;

/// Timer configuration for the sync engine.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// How often to pull the remote document.
    pub poll_interval: Duration,
    /// Quiet period after the last edit before pushing.
    pub debounce: Duration,
    /// How long after a local edit pulls are skipped.
    pub edit_grace: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            debounce: Duration::from_secs(1),
            edit_grace: Duration::from_secs(5),
        }
    }
}

/// Outcome of the most recent push, as shown to reviewers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Synced,
    Saving,
    Error,
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStatus::Synced => write!(f, "synced"),
            SyncStatus::Saving => write!(f, "saving"),
            SyncStatus::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullOutcome {
    /// A recent local edit is protected; nothing was fetched or applied.
    Skipped,
    /// The remote document equals local state.
    Unchanged,
    /// Local state was replaced by the remote document.
    Adopted,
    /// The store could not be read; local state kept.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Guard not satisfied (no successful pull or no local edit yet).
    Skipped,
    Pushed,
    Failed,
}

struct SyncState {
    ledger: Arc<Ledger>,
    /// At least one pull attempt finished, successful or not.
    loaded: bool,
    /// At least one pull succeeded.
    pulled: bool,
    last_local_change: Option<Instant>,
    /// Bumped on every local edit.
    revision: u64,
    /// Highest revision known to be in the store.
    pushed_revision: u64,
}

impl SyncState {
    /// Whether a pull must leave local state alone.
    ///
    /// Unpushed edits stay protected at least until their debounced push is due.
    fn in_grace(&self, config: &SyncConfig) -> bool {
        let window = if self.revision > self.pushed_revision {
            config.edit_grace.max(config.debounce)
        } else {
            config.edit_grace
        };
        self.last_local_change
            .is_some_and(|at| at.elapsed() < window)
    }
}

/// Keeps one client's ledger copy eventually consistent with the store.
pub struct SyncEngine {
    store: Arc<dyn LedgerStore>,
    corpus: Arc<Corpus>,
    admin: AdminGate,
    config: SyncConfig,
    state: Mutex<SyncState>,
    status: watch::Sender<SyncStatus>,
    edits: Notify,
}

impl SyncEngine {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        corpus: Arc<Corpus>,
        config: SyncConfig,
        admin: AdminGate,
    ) -> Self {
        let (status, _) = watch::channel(SyncStatus::Synced);
        Self {
            store,
            corpus,
            admin,
            config,
            state: Mutex::new(SyncState {
                ledger: Arc::new(Ledger::default()),
                loaded: false,
                pulled: false,
                last_local_change: None,
                revision: 0,
                pushed_revision: 0,
            }),
            status,
            edits: Notify::new(),
        }
    }

    fn state(&self) -> MutexGuard<'_, SyncState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The current local ledger.
    pub fn snapshot(&self) -> Arc<Ledger> {
        Arc::clone(&self.state().ledger)
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn status(&self) -> SyncStatus {
        *self.status.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    /// Whether the first pull attempt has finished.
    pub fn is_loaded(&self) -> bool {
        self.state().loaded
    }

    /// Whether local edits exist that no push has confirmed yet.
    pub fn has_unpushed_changes(&self) -> bool {
        let state = self.state();
        state.revision > state.pushed_revision
    }

    /// Fetch the remote document and adopt it unless a local edit is recent.
    #[tracing::instrument(skip(self), fields(store = self.store.name()))]
    pub async fn pull(&self) -> PullOutcome {
        if self.state().in_grace(&self.config) {
            tracing::debug!("skipping pull: recent local edit");
            return PullOutcome::Skipped;
        }

        let fetched = match self.store.get().await {
            Ok(document) => {
                Ledger::from_document(document.unwrap_or(Value::Null)).map_err(anyhow::Error::from)
            }
            Err(e) => Err(e),
        };

        let mut state = self.state();
        state.loaded = true;
        match fetched {
            Ok(remote) => {
                // An edit may have landed while the fetch was in flight.
                if state.in_grace(&self.config) {
                    tracing::debug!("discarding pulled document: local edit during fetch");
                    return PullOutcome::Skipped;
                }
                state.pulled = true;
                if *state.ledger == remote {
                    PullOutcome::Unchanged
                } else {
                    tracing::debug!("adopting remote ledger");
                    state.ledger = Arc::new(remote);
                    state.pushed_revision = state.revision;
                    PullOutcome::Adopted
                }
            }
            Err(e) => {
                self.log_store_failure("pull", &e);
                PullOutcome::Failed
            }
        }
    }

    /// Replace the stored document with the local ledger.
    ///
    /// Refuses to run before a successful pull and a local edit, so a fresh
    /// client never overwrites the shared document with an empty one.
    #[tracing::instrument(skip(self), fields(store = self.store.name()))]
    pub async fn push(&self) -> PushOutcome {
        let (document, revision) = {
            let state = self.state();
            if !state.pulled || state.last_local_change.is_none() {
                tracing::debug!(
                    pulled = state.pulled,
                    edited = state.last_local_change.is_some(),
                    "push deferred"
                );
                return PushOutcome::Skipped;
            }
            (state.ledger.to_document(), state.revision)
        };

        self.status.send_replace(SyncStatus::Saving);
        match self.store.set(&document).await {
            Ok(()) => {
                {
                    let mut state = self.state();
                    state.pushed_revision = state.pushed_revision.max(revision);
                }
                tracing::info!(revision, "ledger pushed");
                self.status.send_replace(SyncStatus::Synced);
                PushOutcome::Pushed
            }
            Err(e) => {
                self.log_store_failure("push", &e);
                self.status.send_replace(SyncStatus::Error);
                PushOutcome::Failed
            }
        }
    }

    /// Push now if there are unconfirmed local edits.
    pub async fn flush(&self) -> PushOutcome {
        if !self.has_unpushed_changes() {
            return PushOutcome::Skipped;
        }
        self.push().await
    }

    /// Apply a grade change locally and schedule a push.
    pub fn apply_grade(
        &self,
        change: &GradeChange,
        reviewer: Option<&str>,
    ) -> Result<Attribution, GradeError> {
        let mut state = self.state();
        let (next, attribution) =
            attribution::apply_grade(&state.ledger, &self.corpus, change, reviewer)?;
        tracing::debug!(slot = %change.slot(), %attribution, "grade applied");
        self.commit(&mut state, next);
        Ok(attribution)
    }

    /// Remove a reviewer's counter and attributions. Requires the admin PIN.
    pub fn delete_reviewer(&self, pin: &str, name: &str) -> Result<usize, AdminError> {
        self.admin.authorize(pin)?;
        let mut state = self.state();
        let (next, removed) = attribution::delete_reviewer(&state.ledger, name);
        self.commit(&mut state, next);
        tracing::info!(reviewer = name, removed, "reviewer deleted");
        Ok(removed)
    }

    /// Reset the ledger to empty. Requires the admin PIN.
    pub fn wipe_all(&self, pin: &str) -> Result<(), AdminError> {
        self.admin.authorize(pin)?;
        let mut state = self.state();
        self.commit(&mut state, attribution::wipe_all());
        tracing::warn!("ledger wiped");
        Ok(())
    }

    fn commit(&self, state: &mut SyncState, next: Ledger) {
        state.ledger = Arc::new(next);
        state.last_local_change = Some(Instant::now());
        state.revision += 1;
        self.edits.notify_one();
    }

    fn log_store_failure(&self, operation: &str, error: &anyhow::Error) {
        let transient = error
            .downcast_ref::<StoreError>()
            .map_or(true, StoreError::is_transient);
        if transient {
            tracing::warn!("{operation} failed, retrying next cycle: {error:#}");
        } else {
            tracing::error!("{operation} failed: {error:#}");
        }
    }

    /// Start the pull interval and push debounce timers.
    pub fn spawn(self: &Arc<Self>) -> SyncHandle {
        let (shutdown, rx) = watch::channel(false);
        let poller = tokio::spawn(Arc::clone(self).poll_loop(rx.clone()));
        let pusher = tokio::spawn(Arc::clone(self).push_loop(rx));
        SyncHandle {
            shutdown,
            tasks: vec![poller, pusher],
        }
    }

    async fn poll_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {
                    let outcome = self.pull().await;
                    tracing::trace!(?outcome, "scheduled pull");
                }
            }
        }
        tracing::debug!("poll timer stopped");
    }

    async fn push_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = self.edits.notified() => {}
            }

            // Every further edit restarts the quiet period.
            let quiet = loop {
                tokio::select! {
                    _ = shutdown.changed() => break false,
                    _ = self.edits.notified() => continue,
                    _ = tokio::time::sleep(self.config.debounce) => break true,
                }
            };
            if !quiet {
                break;
            }

            let outcome = self.push().await;
            tracing::trace!(?outcome, "debounced push");
        }
        tracing::debug!("push timer stopped");
    }
}

/// Running timers for a [`SyncEngine`]. Dropping the handle also stops them.
pub struct SyncHandle {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl SyncHandle {
    /// Stop both timers and wait for them. An in-flight push completes first.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::warn!("sync task ended abnormally: {e}");
            }
        }
    }
}
