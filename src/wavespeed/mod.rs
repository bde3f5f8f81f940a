pub mod client;
pub mod error;
pub mod types;

pub use client::WavespeedClient;
pub use error::WavespeedError;
pub use types::{LoraWeight, PredictionData, SubmitRequest};
