//! Submission of one item to the generation API.
//!
//! Each item acquires a concurrency permit, encodes its source image,
//! posts the request under the retry policy, and records the terminal
//! outcome on its progress record. Nothing here ever aborts the batch:
//! every failure path ends in a persisted `failed` record.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::Semaphore;

use crate::catalog::PresetCatalog;
use crate::input::Item;
use crate::media::image_to_data_uri;
use crate::progress::record::DRY_RUN_REF;
use crate::progress::ProgressStore;
use crate::retry::{retry, RetryPolicy};
use crate::ui::Ui;
use crate::wavespeed::{SubmitRequest, WavespeedClient};

#[derive(Clone)]
pub struct Submitter {
    pub client: Arc<WavespeedClient>,
    pub store: Arc<ProgressStore>,
    pub catalog: Arc<PresetCatalog>,
    pub policy: RetryPolicy,
    pub semaphore: Arc<Semaphore>,
    /// Inter-submission throttle, applied after every attempt chain while
    /// the permit is still held.
    pub delay: Duration,
    pub duration_secs: u32,
    pub dry_run: bool,
    pub ui: Ui,
}

impl Submitter {
    /// Submit one item. The progress record ends in `submitted`,
    /// `completed` (dry-run only) or `failed`; errors returned from here
    /// are store I/O failures, never per-item API outcomes.
    pub async fn submit_item(&self, item: &Item) -> Result<()> {
        let _permit = self.semaphore.acquire().await?;
        let name = file_name(&item.path);

        if self.dry_run {
            self.ui.dry_run(&name, &item.category);
            self.store.update(&item.path, |r| {
                r.mark_completed(Some(DRY_RUN_REF.to_string()))
            })?;
            return Ok(());
        }

        // Unreadable source asset: terminal for this run, no retry.
        let data_uri = match image_to_data_uri(Path::new(&item.path)) {
            Ok(uri) => uri,
            Err(err) => {
                let message = format!("Image not readable: {err:#}");
                self.ui.failed(&name, &message);
                self.store.update(&item.path, |r| r.mark_failed(message))?;
                return Ok(());
            }
        };

        let preset = self.catalog.preset(&item.category);
        let body = SubmitRequest {
            image: data_uri,
            prompt: preset.prompt.clone(),
            duration: self.duration_secs,
            loras: preset.loras.clone(),
            high_noise_loras: preset.high_noise_loras.clone(),
            low_noise_loras: preset.low_noise_loras.clone(),
        };

        let outcome = retry(
            &self.policy,
            || self.client.submit(&body),
            |err| err.is_transient(),
            |attempt, err, delay| {
                self.ui.retry(
                    &name,
                    attempt,
                    self.policy.max_attempts,
                    &err.to_string(),
                    delay,
                );
            },
        )
        .await;

        match outcome {
            Ok(request_id) => {
                self.ui.submitted(&name, &item.category, &request_id);
                self.store
                    .update(&item.path, |r| r.mark_submitted(request_id))?;
            }
            Err(err) => {
                let message = err.to_string();
                self.ui.failed(&name, &message);
                self.store.update(&item.path, |r| r.mark_failed(message))?;
            }
        }

        // Throttle request rate independent of the permit count.
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}

fn file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
        .to_string()
}
