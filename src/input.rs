//! Input item list: the classified images to animate.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// One classified source image. Immutable for the duration of a run;
/// `path` doubles as the unique tracking key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    /// Source image path, unique across the batch.
    pub path: String,
    /// Category label selecting the generation preset.
    #[serde(default = "default_category")]
    pub category: String,
    /// Account the image was collected from, when known.
    #[serde(default)]
    pub account: Option<String>,
    /// Popularity carried into the feed entry.
    #[serde(default)]
    pub favorite_count: u64,
}

fn default_category() -> String {
    "general".to_string()
}

impl Item {
    /// Account name for feed attribution: the explicit `account` field,
    /// falling back to the parent directory of the source path.
    pub fn account_name(&self) -> String {
        if let Some(account) = &self.account
            && !account.is_empty()
        {
            return account.clone();
        }
        Path::new(&self.path)
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string()
    }
}

/// Load the JSON array of items. A missing input file is a fatal startup
/// error.
pub fn load_items(path: &Path) -> Result<Vec<Item>, AppError> {
    if !path.exists() {
        return Err(AppError::Config(format!(
            "Input file not found: {}",
            path.display()
        )));
    }
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}
