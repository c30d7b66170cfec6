//! Classifier adapter: raw image bytes in, two-class probability vector out.
//!
//! The model itself is opaque behind the [`Model`] trait; this module owns
//! the deterministic preprocessing (decode, resize to a fixed square, RGB
//! channels-first float tensor) and nothing else. The adapter trusts the
//! model's own normalization and never re-normalizes, but it does refuse to
//! hand back a vector that is not a probability vector at all.

use image::imageops::FilterType;
use thiserror::Error;

/// Channels-first `1 x 3 x size x size` float tensor, values in `[0,1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    pub data: Vec<f32>,
    pub size: u32,
}

#[derive(Debug, Error)]
#[error("model inference failed: {reason}")]
pub struct ModelError {
    pub reason: String,
}

impl ModelError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// The opaque two-class model boundary.
pub trait Model {
    fn infer(&self, input: &ImageTensor) -> Result<[f32; 2], ModelError>;
}

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("cannot decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("model returned an out-of-range probability vector [{0}, {1}]")]
    BadProbabilities(f32, f32),
}

/// Wraps a [`Model`] with deterministic image preprocessing.
pub struct Classifier<M> {
    model: M,
    input_size: u32,
}

impl<M> Classifier<M> {
    pub fn new(model: M, input_size: u32) -> Self {
        Self { model, input_size }
    }
}

impl<M: Model> Classifier<M> {
    /// Scores raw image bytes, returning `[p0, p1]` with `p0 + p1 ~= 1`.
    ///
    /// Any decode, resize, or model failure propagates; no score is ever
    /// synthesized on failure.
    pub fn classify(&self, bytes: &[u8]) -> Result<[f32; 2], ClassifierError> {
        let tensor = self.prepare_input(bytes)?;
        let probs = self.model.infer(&tensor)?;
        if probs.iter().any(|p| !p.is_finite() || !(0.0..=1.0).contains(p)) {
            return Err(ClassifierError::BadProbabilities(probs[0], probs[1]));
        }
        Ok(probs)
    }

    fn prepare_input(&self, bytes: &[u8]) -> Result<ImageTensor, ClassifierError> {
        let img = image::load_from_memory(bytes)?;
        let size = self.input_size;
        let resized = img
            .resize_exact(size, size, FilterType::Triangle)
            .to_rgb8();
        let plane = (size * size) as usize;
        let mut data = vec![0.0f32; 3 * plane];
        for (x, y, pixel) in resized.enumerate_pixels() {
            let [r, g, b] = pixel.0;
            let offset = (y * size + x) as usize;
            data[offset] = r as f32 / 255.0;
            data[plane + offset] = g as f32 / 255.0;
            data[2 * plane + offset] = b as f32 / 255.0;
        }
        Ok(ImageTensor { data, size })
    }
}

#[cfg(feature = "ort")]
mod onnx {
    use super::{ImageTensor, Model, ModelError};
    use ndarray::{Array4, CowArray};
    use once_cell::sync::Lazy;
    use ort::{
        GraphOptimizationLevel, SessionBuilder, environment::Environment, session::Session,
        tensor::OrtOwnedTensor, value::Value,
    };
    use std::path::Path;
    use std::sync::Arc;

    static ORT_ENV: Lazy<Arc<Environment>> = Lazy::new(|| {
        Environment::builder()
            .with_name("pixel-triage")
            .build()
            .expect("failed to initialize ONNX Runtime environment")
            .into_arc()
    });

    /// Two-class ONNX model, loaded once and held for the process lifetime.
    pub struct OnnxModel {
        session: Session,
    }

    impl OnnxModel {
        pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
            let path = path.as_ref();
            if !path.exists() {
                return Err(ModelError::new(format!(
                    "model file missing: {}",
                    path.display()
                )));
            }
            let env = ORT_ENV.clone();
            let session = SessionBuilder::new(&env)
                .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level1))
                .and_then(|b| b.with_model_from_file(path))
                .map_err(|e| ModelError::new(e.to_string()))?;
            Ok(Self { session })
        }
    }

    impl Model for OnnxModel {
        fn infer(&self, input: &ImageTensor) -> Result<[f32; 2], ModelError> {
            let s = input.size as usize;
            let array = Array4::from_shape_vec((1, 3, s, s), input.data.clone())
                .map_err(|e| ModelError::new(e.to_string()))?
                .into_dyn();
            let cow = CowArray::from(array.view());
            let value = Value::from_array(self.session.allocator(), &cow)
                .map_err(|e| ModelError::new(format!("cannot build input tensor: {e}")))?;
            let outputs: Vec<Value> = self
                .session
                .run(vec![value])
                .map_err(|e| ModelError::new(e.to_string()))?;
            let Some(first) = outputs.first() else {
                return Err(ModelError::new("model produced no output"));
            };
            let probs: OrtOwnedTensor<f32, _> = first
                .try_extract()
                .map_err(|e| ModelError::new(e.to_string()))?;
            let view = probs.view();
            let scores: Vec<f32> = view.iter().cloned().collect();
            match scores.as_slice() {
                [p0, p1] => Ok([*p0, *p1]),
                other => Err(ModelError::new(format!(
                    "expected a two-class output, got {} values",
                    other.len()
                ))),
            }
        }
    }
}

#[cfg(feature = "ort")]
pub use onnx::OnnxModel;
