//! ONNX-backed denoiser
//!
//! The model is parsed once and kept as an inference model; the input
//! length differs per clip, so the `[1, N]` shape is pinned and the plan
//! optimized on each call.

use std::path::{Path, PathBuf};
use tract_onnx::prelude::*;

use super::{Denoiser, DenoiserError, ModelVariant};

/// Denoiser running a [`ModelVariant`] loaded from a model directory
pub struct OnnxDenoiser {
    model_dir: PathBuf,
    variant: ModelVariant,
    /// Parsed model, loaded lazily on first use
    model: Option<InferenceModel>,
}

impl OnnxDenoiser {
    /// Create a denoiser; the model file is not read until needed
    pub fn new(model_dir: impl Into<PathBuf>, variant: ModelVariant) -> Self {
        Self {
            model_dir: model_dir.into(),
            variant,
            model: None,
        }
    }

    pub fn variant(&self) -> ModelVariant {
        self.variant
    }

    /// Path of the current variant's model file
    pub fn model_path(&self) -> PathBuf {
        self.model_dir.join(self.variant.file_name())
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    /// Switch to another variant, dropping the loaded model if it changed
    pub fn set_variant(&mut self, variant: ModelVariant) {
        if variant == self.variant {
            return;
        }
        crate::info!("Switching denoiser model {} -> {}", self.variant, variant);
        self.variant = variant;
        self.model = None;
    }

    /// Load the current variant's model if it is not loaded yet
    ///
    /// # Returns
    /// * `Ok(())` - Model is loaded
    /// * `Err(DenoiserError)` - If the file is missing or cannot be parsed
    pub fn load(&mut self) -> Result<(), DenoiserError> {
        if self.model.is_some() {
            return Ok(());
        }

        let path = self.model_path();
        crate::debug!("Loading model {} from {}", self.variant, path.display());
        self.model = Some(Self::load_model(&path)?);
        Ok(())
    }

    fn load_model(path: &Path) -> Result<InferenceModel, DenoiserError> {
        if !path.exists() {
            return Err(DenoiserError::ModelNotFound(
                path.to_string_lossy().to_string(),
            ));
        }

        tract_onnx::onnx()
            .model_for_path(path)
            .map_err(|e| DenoiserError::ModelLoadError {
                path: path.to_string_lossy().to_string(),
                source: e,
            })
    }

    /// Run one clip through the model with input shape `[1, N]`
    fn run(model: &InferenceModel, samples: Vec<f32>) -> Result<Vec<f32>, DenoiserError> {
        let len = samples.len();

        let plan = model
            .clone()
            .with_input_fact(0, f32::fact([1, len]).into())
            .and_then(|m| m.into_optimized())
            .and_then(|m| m.into_runnable())
            .map_err(|e| DenoiserError::ModelOptimizationError(e.to_string()))?;

        let input: Tensor = tract_ndarray::Array2::from_shape_vec((1, len), samples)
            .map_err(|e| DenoiserError::InferenceError(e.to_string()))?
            .into();

        let result = plan
            .run(tvec!(input.into()))
            .map_err(|e| DenoiserError::InferenceError(e.to_string()))?;

        let output = result
            .first()
            .ok_or_else(|| DenoiserError::InferenceError("model produced no outputs".to_string()))?
            .to_array_view::<f32>()
            .map_err(|e| DenoiserError::InferenceError(e.to_string()))?;

        Ok(output.iter().copied().collect())
    }
}

impl Denoiser for OnnxDenoiser {
    fn denoise(&mut self, samples: Vec<f32>) -> Result<Vec<f32>, DenoiserError> {
        if samples.is_empty() {
            return Err(DenoiserError::EmptyInput);
        }

        self.load()?;
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| DenoiserError::ModelNotFound(self.model_path().to_string_lossy().to_string()))?;

        Self::run(model, samples)
    }
}

impl std::fmt::Debug for OnnxDenoiser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxDenoiser")
            .field("model_dir", &self.model_dir)
            .field("variant", &self.variant)
            .field("loaded", &self.model.is_some())
            .finish()
    }
}
