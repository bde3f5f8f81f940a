//! Post-generation publishing: download artifacts, hand them to the
//! storage upload collaborator, and append entries to the content feed.
//!
//! Publishing is idempotent: the dedup key is the destination URL derived
//! from the source path, so items already in the feed are never
//! re-downloaded, re-uploaded, or re-appended. One item's failure skips
//! that item and the pass continues.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::input::Item;
use crate::progress::record::DRY_RUN_REF;
use crate::progress::{JobState, ProgressStore};
use crate::ui::Ui;
use crate::wavespeed::WavespeedClient;

const UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// One entry of the downstream feed file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedEntry {
    pub id: String,
    pub video_url: String,
    pub title: String,
    pub creator: String,
    pub creator_avatar: String,
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
    pub tags: Vec<String>,
}

/// Narrow seam to the external storage upload tool.
pub trait Uploader {
    fn upload(
        &self,
        key: &str,
        file: &Path,
        content_type: &str,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Production uploader: shells out to `wrangler r2 object put`.
/// A non-zero exit is a per-item recoverable failure.
pub struct WranglerUploader {
    pub bucket: String,
    pub prefix: String,
}

impl Uploader for WranglerUploader {
    async fn upload(&self, key: &str, file: &Path, content_type: &str) -> Result<()> {
        let object = format!("{}/{}/{key}", self.bucket, self.prefix);
        let output = tokio::time::timeout(
            UPLOAD_TIMEOUT,
            Command::new("wrangler")
                .args(["r2", "object", "put", &object, "--file"])
                .arg(file)
                .args(["--content-type", content_type, "--remote"])
                .output(),
        )
        .await
        .map_err(|_| anyhow!("wrangler upload timed out for {object}"))?
        .context("failed to run wrangler")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let snippet: String = stderr.chars().take(200).collect();
            bail!("wrangler exited with {}: {snippet}", output.status);
        }
        Ok(())
    }
}

/// Destination key derived from the source path: parent directory name
/// plus file stem, e.g. `downloads/gaizellic/123_1.jpg` → `gaizellic_123_1`.
pub fn derive_video_key(path: &str) -> String {
    let p = Path::new(path);
    let account = p
        .parent()
        .and_then(|d| d.file_name())
        .and_then(|n| n.to_str())
        .unwrap_or("unknown");
    let stem = p
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("video");
    format!("{account}_{stem}")
}

pub struct Publisher<U> {
    pub client: Arc<WavespeedClient>,
    pub store: Arc<ProgressStore>,
    pub uploader: U,
    pub generated_dir: PathBuf,
    pub feed_file: PathBuf,
    pub public_base_url: String,
    pub upload_prefix: String,
    /// `(input file, mirror destination)` copied after a successful pass.
    pub classified_mirror: Option<(PathBuf, PathBuf)>,
    pub ui: Ui,
}

impl<U: Uploader> Publisher<U> {
    /// Publish every completed record with a real result reference that is
    /// not already in the feed. Sequential on purpose: storage operations
    /// stay orderly. Returns the number of feed entries appended.
    pub async fn publish_completed(&self, items: &[Item]) -> Result<usize> {
        fs::create_dir_all(&self.generated_dir).with_context(|| {
            format!("failed to create {}", self.generated_dir.display())
        })?;

        let items_by_path: HashMap<&str, &Item> =
            items.iter().map(|i| (i.path.as_str(), i)).collect();

        let mut feed = load_feed(&self.feed_file)?;
        let existing_urls: HashSet<String> =
            feed.iter().map(|v| v.video_url.clone()).collect();
        let mut next_id = feed
            .iter()
            .filter_map(|v| v.id.parse::<u64>().ok())
            .max()
            .unwrap_or(0)
            + 1;

        let mut records: Vec<_> = self.store.snapshot().into_values().collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));

        let mut added = 0usize;
        for record in records {
            if record.state != JobState::Completed {
                continue;
            }
            let Some(result_ref) = record.result_ref.clone() else {
                continue;
            };
            if result_ref == DRY_RUN_REF {
                continue;
            }

            let key = derive_video_key(&record.id);
            let public_url =
                format!("{}/{}/{key}.mp4", self.public_base_url, self.upload_prefix);
            if existing_urls.contains(&public_url) {
                continue;
            }

            let local = self.generated_dir.join(format!("{key}.mp4"));
            if !local.exists() {
                self.ui.info(&format!("[download] {key}.mp4 ..."));
                let bytes = match self.client.download(&result_ref).await {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        self.ui.warn(&format!("Download failed for {key}: {err}"));
                        continue;
                    }
                };
                if let Err(err) = fs::write(&local, bytes) {
                    self.ui
                        .warn(&format!("Failed to cache {}: {err}", local.display()));
                    continue;
                }
            }

            self.ui.info(&format!("[upload] {key}.mp4 ..."));
            if let Err(err) = self
                .uploader
                .upload(&format!("{key}.mp4"), &local, "video/mp4")
                .await
            {
                self.ui.warn(&format!("Upload failed for {key}: {err:#}"));
                continue;
            }

            let item = items_by_path.get(record.id.as_str());
            let category = item
                .map(|i| i.category.clone())
                .unwrap_or_else(|| "general".to_string());
            // Orphaned records (no longer in the input list) fall back to
            // the parent directory name, the same derivation as
            // `Item::account_name`.
            let account = item.map(|i| i.account_name()).unwrap_or_else(|| {
                Path::new(&record.id)
                    .parent()
                    .and_then(|d| d.file_name())
                    .and_then(|n| n.to_str())
                    .unwrap_or("unknown")
                    .to_string()
            });
            let likes = item.map(|i| i.favorite_count).unwrap_or(0);

            feed.push(FeedEntry {
                id: next_id.to_string(),
                video_url: public_url,
                title: format!("{} - {account}", title_case(&category)),
                creator: account,
                creator_avatar: "🎬".to_string(),
                likes,
                comments: 0,
                shares: 0,
                tags: vec!["ai".to_string(), "wan2.2".to_string(), category],
            });
            self.ui.info(&format!("[feed] Added {key} as id={next_id}"));
            next_id += 1;
            added += 1;
        }

        if added > 0 {
            let json = serde_json::to_string_pretty(&feed)?;
            fs::write(&self.feed_file, json)
                .with_context(|| format!("failed to write {}", self.feed_file.display()))?;
            self.ui.info(&format!(
                "[feed] Updated {}: added {added} videos (total: {})",
                self.feed_file.display(),
                feed.len()
            ));

            if let Some((src, dest)) = &self.classified_mirror
                && src.exists()
            {
                if let Some(parent) = dest.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::copy(src, dest)
                    .with_context(|| format!("failed to mirror to {}", dest.display()))?;
                self.ui
                    .info(&format!("[sync] Mirrored input to {}", dest.display()));
            }
        } else {
            self.ui.info("[feed] No new videos to add.");
        }

        Ok(added)
    }
}

fn load_feed(path: &Path) -> Result<Vec<FeedEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read feed {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("invalid feed file {}", path.display()))
}

/// `anal_cowgirl` → `Anal Cowgirl`, `oral` → `Oral`.
fn title_case(category: &str) -> String {
    category
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
