//! Phase sequencing for one batch run.
//!
//! Three phases against the persisted progress store: resume polling for
//! anything left `submitted` by a previous run, bounded-concurrency
//! submission of everything `pending`, then polling until nothing remains
//! in flight. Per-item failures are recorded on the store and never abort
//! the run.

use std::sync::Arc;

use anyhow::Result;
use tokio::task::JoinSet;

use crate::input::Item;
use crate::poll::Poller;
use crate::progress::{JobState, ProgressStore, StateCounts};
use crate::submit::Submitter;
use crate::ui::Ui;

pub struct Orchestrator {
    pub store: Arc<ProgressStore>,
    pub items: Vec<Item>,
    pub submitter: Submitter,
    pub poller: Poller,
    pub dry_run: bool,
    pub ui: Ui,
}

impl Orchestrator {
    /// Run resume, submission and drain phases, returning the final
    /// counts. The store is re-queried between phases rather than trusting
    /// in-memory state.
    pub async fn run(&self) -> Result<StateCounts> {
        self.ui.counts(&self.store.counts());

        // Phase 1: resume anything still in flight from a previous run.
        let leftover = self.store.ids_in_state(JobState::Submitted);
        if !leftover.is_empty() && !self.dry_run {
            self.ui.info(&format!(
                "Resuming: re-polling {} previously submitted items...",
                leftover.len()
            ));
            self.poller.poll_until_drained().await?;
            self.ui.counts(&self.store.counts());
        }

        // Phase 2: submit everything pending, bounded by the permit pool.
        let pending: Vec<Item> = self
            .items
            .iter()
            .filter(|item| {
                self.store
                    .get(&item.path)
                    .is_some_and(|r| r.state == JobState::Pending)
            })
            .cloned()
            .collect();
        if !pending.is_empty() {
            self.ui
                .info(&format!("Submitting {} pending items...", pending.len()));
            let mut tasks = JoinSet::new();
            for item in pending {
                let submitter = self.submitter.clone();
                tasks.spawn(async move { submitter.submit_item(&item).await });
            }
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => self.ui.warn(&format!("Submit task error: {err:#}")),
                    Err(err) => self.ui.warn(&format!("Submit task panicked: {err}")),
                }
            }
            self.ui.counts(&self.store.counts());
        }

        // Phase 3: drain. Skipped in dry-run, where nothing was really
        // submitted.
        if !self.dry_run {
            self.poller.poll_until_drained().await?;
        }

        let counts = self.store.counts();
        self.ui.phase("=== FINAL RESULTS ===");
        self.ui.counts(&counts);
        if counts.failed > 0 {
            self.ui.info(&format!(
                "{} items failed. Re-run to retry them.",
                counts.failed
            ));
        }
        Ok(counts)
    }
}
