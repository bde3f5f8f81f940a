//! Polling of submitted predictions until each reaches a terminal state.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::task::JoinSet;

use crate::progress::{JobState, ProgressStore};
use crate::ui::Ui;
use crate::wavespeed::WavespeedClient;

#[derive(Clone)]
pub struct Poller {
    pub client: Arc<WavespeedClient>,
    pub store: Arc<ProgressStore>,
    pub interval: Duration,
    pub ui: Ui,
}

impl Poller {
    /// Poll one submitted item. Returns whether it reached a terminal
    /// state. Poll errors are logged and reported as "not terminal" —
    /// they are never recorded as job failures.
    pub async fn poll_item(&self, id: &str) -> Result<bool> {
        let Some(record) = self.store.get(id) else {
            return Ok(true);
        };

        // Submitted without a request id means the store is inconsistent;
        // nothing can be polled, so fail the item outright.
        let Some(request_id) = record.request_id else {
            self.store
                .update(id, |r| r.mark_failed("No requestId to poll"))?;
            return Ok(true);
        };

        match self.client.poll(&request_id).await {
            Ok(data) => match data.status.as_deref() {
                Some("completed") => {
                    let result_ref = data.outputs.first().cloned();
                    self.store.update(id, |r| r.mark_completed(result_ref))?;
                    self.ui.completed(id);
                    Ok(true)
                }
                Some("failed") => {
                    let error = data.error.unwrap_or_else(|| "Unknown error".to_string());
                    self.ui.failed(id, &error);
                    self.store.update(id, |r| r.mark_failed(error))?;
                    Ok(true)
                }
                // Still processing (or an unknown status): poll again later.
                _ => Ok(false),
            },
            Err(err) => {
                self.ui.warn(&format!("Poll error for {id}: {err}"));
                Ok(false)
            }
        }
    }

    /// Poll every `submitted` item concurrently, sleeping the poll
    /// interval between rounds, until none remain. Reentrant: used both
    /// to resume a previous run and to drain the current one.
    pub async fn poll_until_drained(&self) -> Result<()> {
        loop {
            let submitted = self.store.ids_in_state(JobState::Submitted);
            if submitted.is_empty() {
                break;
            }
            self.ui
                .debug(&format!("[polling] {} items in flight...", submitted.len()));

            let mut tasks = JoinSet::new();
            for id in submitted {
                let poller = self.clone();
                tasks.spawn(async move { poller.poll_item(&id).await });
            }
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(Ok(_)) => {}
                    Ok(Err(err)) => self.ui.warn(&format!("Poll task error: {err:#}")),
                    Err(err) => self.ui.warn(&format!("Poll task panicked: {err}")),
                }
            }

            let remaining = self.store.ids_in_state(JobState::Submitted);
            if remaining.is_empty() {
                break;
            }
            self.ui.counts(&self.store.counts());
            self.ui
                .wait_for_next_round(self.interval, remaining.len())
                .await;
        }
        Ok(())
    }
}
