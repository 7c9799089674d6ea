use clap::Parser;
use log::LevelFilter;
use std::path::PathBuf;

use crate::classifier::{ModelSettings, Normalization, Preprocessor, TensorLayout};

#[derive(Debug, Clone, Parser)]
#[command(name = "skin-lesion-api", about = "Skin lesion image classification service")]
pub struct Config {
    #[arg(long, env = "SKIN_API_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "SKIN_API_PORT", default_value_t = 5000)]
    pub port: u16,

    /// ONNX export of the classification model
    #[arg(long, env = "SKIN_API_MODEL", default_value = "skin_cancer_B3_BALANCED.onnx")]
    pub model_path: PathBuf,

    /// JSON array of {code, name} in model output order; built-in labels when absent
    #[arg(long, env = "SKIN_API_LABELS")]
    pub labels_path: Option<PathBuf>,

    /// Square input edge expected by the model
    #[arg(
        long,
        env = "SKIN_API_IMAGE_SIZE",
        default_value_t = 300,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub image_size: u32,

    #[arg(long, env = "SKIN_API_NORMALIZATION", value_enum, default_value_t = Normalization::Raw)]
    pub normalization: Normalization,

    #[arg(long, env = "SKIN_API_LAYOUT", value_enum, default_value_t = TensorLayout::Nhwc)]
    pub layout: TensorLayout,

    /// Apply softmax to the model output (for graphs that emit logits)
    #[arg(long, env = "SKIN_API_SOFTMAX")]
    pub softmax: bool,

    #[arg(long, env = "SKIN_API_MAX_UPLOAD_MB", default_value_t = 10)]
    pub max_upload_mb: usize,

    #[arg(long, env = "SKIN_API_LOG_LEVEL", default_value = "info")]
    pub log_level: LevelFilter,
}

impl Config {
    pub fn model_settings(&self) -> ModelSettings {
        ModelSettings {
            model_path: self.model_path.clone(),
            labels_path: self.labels_path.clone(),
            preprocessor: Preprocessor {
                width: self.image_size,
                height: self.image_size,
                normalization: self.normalization,
                layout: self.layout,
            },
            apply_softmax: self.softmax,
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}
