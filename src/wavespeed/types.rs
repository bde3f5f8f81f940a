//! Request and response types for the WaveSpeed image-to-video endpoint.
//!
//! All structs derive `Serialize`/`Deserialize` for JSON conversion in the
//! shape expected by the `wan-2.2/image-to-video-lora` endpoint and the
//! `predictions/{id}/result` endpoint.

use serde::{Deserialize, Serialize};

/// A single LoRA slot: a weights URL plus its strength.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoraWeight {
    /// URL of the `.safetensors` file.
    pub path: String,
    /// Strength applied to this LoRA.
    pub scale: f64,
}

/// Body of a submit request.
///
/// The three LoRA lists map to the endpoint's named slots; empty lists are
/// omitted from the serialized body entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRequest {
    /// Source image as a base64 data URI.
    pub image: String,
    /// Motion prompt for the generation.
    pub prompt: String,
    /// Clip duration in seconds.
    pub duration: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub loras: Vec<LoraWeight>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub high_noise_loras: Vec<LoraWeight>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub low_noise_loras: Vec<LoraWeight>,
}

/// Response envelope used by both the submit and result endpoints.
///
/// The API normally nests the payload under `data`, but some responses carry
/// a top-level `id`; both shapes are accepted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiEnvelope {
    #[serde(default)]
    pub data: Option<PredictionData>,
    #[serde(default)]
    pub id: Option<String>,
}

impl ApiEnvelope {
    /// Prediction id from either the nested payload or the top level.
    pub fn request_id(&self) -> Option<String> {
        self.data
            .as_ref()
            .and_then(|d| d.id.clone())
            .or_else(|| self.id.clone())
    }
}

/// State of one prediction as reported by the result endpoint.
///
/// `status` is an open vocabulary: `"completed"` and `"failed"` are
/// terminal, anything else means the job is still processing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PredictionData {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}
