use crate::{classifier_service::Prediction, labels::LabelTable};
use serde::{Deserialize, Serialize};

/// Inclusive rejection threshold: at or below this confidence the image is
/// treated as outside the supported vegetable types.
pub const CONFIDENCE_THRESHOLD: f32 = 90.0;

pub const UNSUPPORTED_MESSAGE: &str =
    "⚠️ Gambar ini tidak termasuk jenis sayuran yang telah di dukung.";
pub const INVALID_URL_MESSAGE: &str = "❌ URL tidak valid atau tidak bisa diakses.";

const UNKNOWN_LABEL: &str = "Tidak Diketahui";
const MISSING_NUTRITION: &str = "Informasi kandungan belum tersedia.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictKind {
    Success,
    Unsupported,
    Error,
}

/// What the UI renders in the result area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub kind: VerdictKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl Verdict {
    /// Apply the out-of-domain decision rule and compose the user-facing
    /// message. Below-threshold predictions ignore the arg-max label
    /// entirely.
    pub fn from_prediction(prediction: &Prediction, labels: &LabelTable) -> Self {
        if prediction.confidence <= CONFIDENCE_THRESHOLD {
            return Self {
                kind: VerdictKind::Unsupported,
                message: UNSUPPORTED_MESSAGE.to_string(),
                label: None,
                confidence: None,
            };
        }

        let entry = labels.get(prediction.class_index);
        let name = entry.map(|l| l.name.as_str()).unwrap_or(UNKNOWN_LABEL);
        let nutrition = entry
            .map(|l| l.nutrition.as_str())
            .unwrap_or(MISSING_NUTRITION);

        let message = format!(
            "✅ Termasuk Jenis Sayuran **{}**\n🔢 Akurasi: {:.2}%\n🥗 Kandungan: {}",
            name, prediction.confidence, nutrition
        );

        Self {
            kind: VerdictKind::Success,
            message,
            label: Some(name.to_string()),
            confidence: Some(prediction.confidence),
        }
    }

    /// The single generic message shown for any URL-mode acquisition
    /// failure, network or decode alike.
    pub fn invalid_url() -> Self {
        Self {
            kind: VerdictKind::Error,
            message: INVALID_URL_MESSAGE.to_string(),
            label: None,
            confidence: None,
        }
    }
}
