//! Static per-category generation presets.
//!
//! Pure data: each category maps to a motion prompt and the LoRA slots to
//! attach. Unknown categories fall back to the `general` entry, so preset
//! lookup never fails. A `presets.toml` next to the config can replace
//! the built-in table wholesale.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::AppError;
use crate::wavespeed::LoraWeight;

const DEFAULT_CATEGORY: &str = "general";

const LORA_BASE: &str =
    "https://huggingface.co/wavespeed-community/wan22-motion-loras/resolve/main";

/// Prompt plus LoRA slots for one category.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationPreset {
    pub prompt: String,
    #[serde(default)]
    pub loras: Vec<LoraWeight>,
    #[serde(default)]
    pub high_noise_loras: Vec<LoraWeight>,
    #[serde(default)]
    pub low_noise_loras: Vec<LoraWeight>,
}

/// Immutable category → preset mapping with a guaranteed default entry.
pub struct PresetCatalog {
    presets: HashMap<String, GenerationPreset>,
}

#[derive(Debug, Deserialize)]
struct PresetFile {
    #[serde(default)]
    categories: HashMap<String, GenerationPreset>,
}

fn lora(file: &str, scale: f64) -> LoraWeight {
    LoraWeight {
        path: format!("{LORA_BASE}/{file}"),
        scale,
    }
}

fn builtin() -> HashMap<String, GenerationPreset> {
    let mut presets = HashMap::new();
    presets.insert(
        "portrait".to_string(),
        GenerationPreset {
            prompt: "portrait subject, subtle head and shoulder movement, natural blinking, \
                     cinematic lighting, smooth animation"
                .to_string(),
            loras: vec![],
            high_noise_loras: vec![lora("portrait_motion_high.safetensors", 1.2)],
            low_noise_loras: vec![],
        },
    );
    presets.insert(
        "landscape".to_string(),
        GenerationPreset {
            prompt: "sweeping landscape, drifting clouds, gentle parallax camera push-in, \
                     smooth animation"
                .to_string(),
            loras: vec![],
            high_noise_loras: vec![lora("landscape_parallax_high.safetensors", 1.0)],
            low_noise_loras: vec![],
        },
    );
    presets.insert(
        "dance".to_string(),
        GenerationPreset {
            prompt: "dancer in motion, rhythmic full-body movement, flowing fabric, \
                     smooth animation"
                .to_string(),
            loras: vec![],
            high_noise_loras: vec![lora("dance_rhythm_high.safetensors", 1.5)],
            low_noise_loras: vec![],
        },
    );
    presets.insert(
        "action".to_string(),
        GenerationPreset {
            prompt: "dynamic action scene, fast camera tracking, energetic motion, \
                     smooth animation"
                .to_string(),
            loras: vec![],
            high_noise_loras: vec![lora("action_tracking_high.safetensors", 1.2)],
            low_noise_loras: vec![lora("detail_refine_low.safetensors", 0.8)],
        },
    );
    presets.insert(
        DEFAULT_CATEGORY.to_string(),
        GenerationPreset {
            prompt: "smooth natural motion, high quality animation".to_string(),
            loras: vec![],
            high_noise_loras: vec![lora("general_motion_high.safetensors", 1.0)],
            low_noise_loras: vec![],
        },
    );
    presets
}

impl PresetCatalog {
    /// Built-in presets, or the table from `path` when that file exists.
    /// The `general` fallback entry is always present.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let mut presets = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let file: PresetFile = toml::from_str(&contents)?;
            file.categories
        } else {
            builtin()
        };
        presets
            .entry(DEFAULT_CATEGORY.to_string())
            .or_insert_with(|| {
                builtin()
                    .remove(DEFAULT_CATEGORY)
                    .expect("builtin table has a general entry")
            });
        Ok(Self { presets })
    }

    /// Preset for a category label; unknown labels get the default entry.
    pub fn preset(&self, category: &str) -> &GenerationPreset {
        self.presets
            .get(category)
            .unwrap_or_else(|| &self.presets[DEFAULT_CATEGORY])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn known_category_uses_its_preset() {
        let tmp = TempDir::new().unwrap();
        let catalog = PresetCatalog::load(&tmp.path().join("presets.toml")).unwrap();
        let preset = catalog.preset("dance");
        assert!(preset.prompt.contains("dancer"));
        assert_eq!(preset.high_noise_loras[0].scale, 1.5);
    }

    #[test]
    fn unknown_category_falls_back_to_general() {
        let tmp = TempDir::new().unwrap();
        let catalog = PresetCatalog::load(&tmp.path().join("presets.toml")).unwrap();
        let preset = catalog.preset("does-not-exist");
        assert_eq!(preset.prompt, catalog.preset("general").prompt);
    }

    #[test]
    fn preset_file_replaces_builtin_table() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("presets.toml");
        std::fs::write(
            &path,
            r#"
            [categories.timelapse]
            prompt = "city timelapse, streaking lights"
            high_noise_loras = [{ path = "https://example.com/tl.safetensors", scale = 1.1 }]
            "#,
        )
        .unwrap();

        let catalog = PresetCatalog::load(&path).unwrap();
        let preset = catalog.preset("timelapse");
        assert_eq!(preset.prompt, "city timelapse, streaking lights");
        assert_eq!(preset.high_noise_loras[0].scale, 1.1);
        // Builtin categories are gone, but the fallback is re-inserted.
        assert_eq!(
            catalog.preset("dance").prompt,
            catalog.preset("general").prompt
        );
    }

    #[test]
    fn action_preset_has_low_noise_slot() {
        let tmp = TempDir::new().unwrap();
        let catalog = PresetCatalog::load(&tmp.path().join("presets.toml")).unwrap();
        let preset = catalog.preset("action");
        assert_eq!(preset.low_noise_loras.len(), 1);
        assert!(preset.low_noise_loras[0].path.ends_with(".safetensors"));
    }
}
