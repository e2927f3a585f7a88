use crate::{
    classifier_service::{ClassifierError, ClassifierService, Prediction},
    config::ModelConfig,
};
use image::{imageops::FilterType, DynamicImage, GenericImageView};
use ndarray::{Array, Ix4};
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::TensorRef,
};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

/// Input resolution the model was trained with.
pub const INPUT_SIZE: u32 = 224;

pub fn decode_image(image_data: &[u8]) -> Result<DynamicImage, image::ImageError> {
    let reader = image::ImageReader::new(std::io::Cursor::new(image_data))
        .with_guessed_format()
        .map_err(image::ImageError::IoError)?;

    reader.decode()
}

/// Resize to 224x224 (bilinear, matching the training-time preprocessing),
/// scale to [0,1] and lay out as an NHWC batch of one.
pub fn image_to_tensor(image: &DynamicImage) -> Array<f32, Ix4> {
    let img = image.resize_exact(INPUT_SIZE, INPUT_SIZE, FilterType::Triangle);

    let size = INPUT_SIZE as usize;
    let mut input = Array::zeros((1, size, size, 3));
    for pixel in img.pixels() {
        let x = pixel.0 as usize;
        let y = pixel.1 as usize;
        let [r, g, b, _] = pixel.2 .0;
        input[[0, y, x, 0]] = (r as f32) / 255.;
        input[[0, y, x, 1]] = (g as f32) / 255.;
        input[[0, y, x, 2]] = (b as f32) / 255.;
    }

    input
}

/// Stable arg-max: the first index wins ties.
pub fn argmax(probabilities: &[f32]) -> Option<(usize, f32)> {
    probabilities
        .iter()
        .copied()
        .enumerate()
        .reduce(|accum, row| if row.1 > accum.1 { row } else { accum })
}

pub struct OrtClassifier {
    sessions: Arc<Vec<Arc<Mutex<Session>>>>,
    counter: Arc<AtomicUsize>,
    output_name: String,
}

impl OrtClassifier {
    pub fn new(model_config: &ModelConfig) -> Result<Self, Box<dyn std::error::Error>> {
        ort::init().commit();
        let num_instances = model_config.num_instances;
        let sessions = (0..num_instances)
            .map(|_| {
                let session = Session::builder()?
                    .with_optimization_level(GraphOptimizationLevel::Level3)?
                    .commit_from_file(model_config.get_model_path())?;
                Ok(Arc::new(Mutex::new(session)))
            })
            .collect::<Result<Vec<_>, ort::Error>>()?;

        let output_name = {
            let session = sessions[0].lock().map_err(|e| e.to_string())?;
            session
                .outputs()
                .first()
                .ok_or("model has no outputs")?
                .name()
                .to_string()
        };

        tracing::info!("Created {} ONNX sessions", num_instances);

        Ok(Self {
            counter: Arc::new(AtomicUsize::new(0)),
            sessions: Arc::new(sessions),
            output_name,
        })
    }

    fn run_inference(&self, input: &Array<f32, Ix4>) -> Result<Vec<f32>, ClassifierError> {
        let index = self.counter.fetch_add(1, Ordering::SeqCst) % self.sessions.len();
        let session_arc = &self.sessions[index];
        let mut session = session_arc
            .lock()
            .map_err(|e| ClassifierError::SessionPoisoned(e.to_string()))?;

        tracing::debug!("Handling request with session {}", index);
        let tensor_ref = TensorRef::from_array_view(input.view())
            .map_err(|e| ClassifierError::TensorBuild(e.to_string()))?;

        let outputs = session
            .run(ort::inputs![tensor_ref])
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;

        let (_shape, data) = outputs[self.output_name.as_str()]
            .try_extract_tensor::<f32>()
            .map_err(|e| ClassifierError::OutputExtract(e.to_string()))?;

        // Batch of one: the flattened output is the softmax row itself.
        Ok(data.to_vec())
    }
}

impl ClassifierService for OrtClassifier {
    fn classify(&self, image: &DynamicImage) -> Result<Prediction, ClassifierError> {
        let input = image_to_tensor(image);
        let probabilities = self.run_inference(&input)?;

        let (class_index, probability) =
            argmax(&probabilities).ok_or(ClassifierError::EmptyOutput)?;

        Ok(Prediction {
            class_index,
            confidence: probability * 100.,
        })
    }
}
