//! Speech denoising inference boundary
//!
//! The pipeline only sees the [`Denoiser`] trait: normalized 16kHz mono
//! samples go in as a `[1, N]` tensor and denoised samples come back. The
//! production implementation runs one of the exported ONNX model variants
//! through tract.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tract_onnx::prelude::TractError;

mod onnx;
pub use onnx::OnnxDenoiser;


/// Errors that can occur during denoiser operations
#[derive(Debug, Error)]
pub enum DenoiserError {
    /// Failed to load ONNX model file
    #[error("Failed to load model from {path}: {source}")]
    ModelLoadError {
        path: String,
        #[source]
        source: TractError,
    },

    /// Model file not found
    #[error("Model file not found: {0}")]
    ModelNotFound(String),

    /// Failed to optimize model for the input shape
    #[error("Failed to optimize model: {0}")]
    ModelOptimizationError(String),

    /// Model ran but inference failed or produced unusable output
    #[error("Inference failed: {0}")]
    InferenceError(String),

    /// Nothing to denoise
    #[error("Cannot denoise empty audio")]
    EmptyInput,
}

/// Anything that turns a noisy clip into a denoised one
pub trait Denoiser {
    /// Denoise a whole clip.
    ///
    /// Takes ownership of the input; the output length is whatever the model
    /// produces.
    fn denoise(&mut self, samples: Vec<f32>) -> Result<Vec<f32>, DenoiserError>;
}

/// Exported model variants, differing in how they were quantized
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelVariant {
    /// Unquantized pretrained weights
    Pretrained,
    DynamicOnly,
    StaticOnly,
    StaticEncoderOnly,
    StaticLstmOnly,
    #[default]
    StaticAndDynamic,
}

impl ModelVariant {
    /// Every variant, in selection-menu order
    pub fn all() -> [ModelVariant; 6] {
        [
            ModelVariant::Pretrained,
            ModelVariant::DynamicOnly,
            ModelVariant::StaticOnly,
            ModelVariant::StaticEncoderOnly,
            ModelVariant::StaticLstmOnly,
            ModelVariant::StaticAndDynamic,
        ]
    }

    pub fn key(&self) -> &'static str {
        match self {
            ModelVariant::Pretrained => "pretrained",
            ModelVariant::DynamicOnly => "dynamic_only",
            ModelVariant::StaticOnly => "static_only",
            ModelVariant::StaticEncoderOnly => "static_encoder_only",
            ModelVariant::StaticLstmOnly => "static_lstm_only",
            ModelVariant::StaticAndDynamic => "static_and_dynamic",
        }
    }

    /// Model file name inside the model directory
    pub fn file_name(&self) -> String {
        format!("{}.onnx", self.key())
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
