use image::DynamicImage;
use thiserror::Error;

/// Arg-max outcome of a single inference. `confidence` is a percentage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub class_index: usize,
    pub confidence: f32,
}

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("session mutex poisoned: {0}")]
    SessionPoisoned(String),
    #[error("failed to build input tensor: {0}")]
    TensorBuild(String),
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("failed to extract output tensor: {0}")]
    OutputExtract(String),
    #[error("model returned an empty probability vector")]
    EmptyOutput,
}

pub trait ClassifierService: Send + Sync + 'static {
    fn classify(&self, image: &DynamicImage) -> Result<Prediction, ClassifierError>;
}
