mod onnx;
mod preprocess;

pub use onnx::OnnxModel;
pub use preprocess::{Normalization, Preprocessor, TensorLayout};

use ndarray::Array4;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::ClassifierError;
use crate::labels::LabelSet;
use crate::models::RankedClass;

/// A loaded network: one preprocessed batch in, one score per class out.
pub trait Model: Send + Sync {
    fn forward(&self, input: Array4<f32>) -> Result<Vec<f32>, ClassifierError>;
}

#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub model_path: PathBuf,
    pub labels_path: Option<PathBuf>,
    pub preprocessor: Preprocessor,
    pub apply_softmax: bool,
}

pub struct Classifier {
    model: Box<dyn Model>,
    labels: LabelSet,
    preprocessor: Preprocessor,
    apply_softmax: bool,
}

impl Classifier {
    pub fn new(
        model: Box<dyn Model>,
        labels: LabelSet,
        preprocessor: Preprocessor,
        apply_softmax: bool,
    ) -> Self {
        Self {
            model,
            labels,
            preprocessor,
            apply_softmax,
        }
    }

    pub fn load(settings: &ModelSettings) -> Result<Self, ClassifierError> {
        let labels = match &settings.labels_path {
            Some(path) => LabelSet::from_file(path)?,
            None => LabelSet::builtin(),
        };
        let model = OnnxModel::load(
            &settings.model_path,
            settings.preprocessor.input_shape(),
            labels.len(),
        )?;
        Ok(Self::new(
            Box::new(model),
            labels,
            settings.preprocessor,
            settings.apply_softmax,
        ))
    }

    pub fn num_classes(&self) -> usize {
        self.labels.len()
    }

    /// Decodes, runs and ranks one image. The result holds every label,
    /// most probable first.
    pub fn classify(&self, image_bytes: &[u8]) -> Result<Vec<RankedClass>, ClassifierError> {
        let input = self.preprocessor.prepare(image_bytes)?;
        let mut scores = self.model.forward(input)?;
        if scores.len() != self.labels.len() {
            return Err(ClassifierError::OutputMismatch {
                expected: self.labels.len(),
                actual: scores.len(),
            });
        }
        if let Some(idx) = scores.iter().position(|s| !s.is_finite()) {
            return Err(ClassifierError::Inference(format!(
                "model produced a non-finite score for class {}",
                idx
            )));
        }
        if self.apply_softmax {
            scores = softmax(&scores);
        }
        Ok(rank(&self.labels, &scores))
    }
}

pub enum ModelState {
    Loaded(Arc<Classifier>),
    Unavailable { reason: String },
}

impl ModelState {
    /// Never fails: a bad artifact leaves the service running but unavailable.
    pub fn load(settings: &ModelSettings) -> Self {
        match Classifier::load(settings) {
            Ok(classifier) => {
                log::info!(
                    "Model '{}' loaded with {} classes",
                    settings.model_path.display(),
                    classifier.num_classes()
                );
                ModelState::Loaded(Arc::new(classifier))
            }
            Err(e) => {
                log::error!("Model unavailable: {}", e);
                ModelState::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }
}

pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max_logit = logits.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
    let exp: Vec<f32> = logits.iter().map(|&x| (x - max_logit).exp()).collect();
    let sum: f32 = exp.iter().sum();
    exp.into_iter().map(|x| x / sum).collect()
}

/// Pairs scores with labels and sorts descending. Ties keep label order.
pub fn rank(labels: &LabelSet, scores: &[f32]) -> Vec<RankedClass> {
    let mut indexed: Vec<(usize, f32)> = scores.iter().copied().enumerate().collect();
    indexed.sort_by(|a, b| b.1.total_cmp(&a.1));

    indexed
        .into_iter()
        .filter_map(|(idx, probability)| {
            labels.get(idx).map(|label| RankedClass {
                code: label.code.clone(),
                name: label.name.clone(),
                probability,
            })
        })
        .collect()
}
