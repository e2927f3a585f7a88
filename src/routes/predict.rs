use crate::{
    classifier_service::{ClassifierError, ClassifierService},
    fetch::FetchError,
    labels::LabelTable,
    ort_classifier::decode_image,
    server::SharedState,
    telemetry::Metrics,
    verdict::Verdict,
};
use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use thiserror::Error;
use tracing::instrument;

#[derive(Error, Debug)]
pub enum PredictError {
    #[error("no image file in upload")]
    MissingUpload,
    #[error("multipart read failed: {0}")]
    Multipart(#[from] MultipartError),
    #[error("image decode failed: {0}")]
    Decode(#[from] image::ImageError),
    #[error("classifier failed: {0}")]
    Classifier(#[from] ClassifierError),
}

impl IntoResponse for PredictError {
    fn into_response(self) -> Response {
        let status = match self {
            PredictError::MissingUpload
            | PredictError::Multipart(_)
            | PredictError::Decode(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PredictError::Classifier(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, format!("Something went wrong: {}", self)).into_response()
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct UrlRequest {
    pub url: String,
}

/// Decode, classify, and apply the decision rule. Both input modes funnel
/// through here so they cannot drift apart.
fn classify_bytes(
    classifier: &dyn ClassifierService,
    labels: &LabelTable,
    metrics: &Metrics,
    image_data: &[u8],
    source: &str,
) -> Result<Verdict, PredictError> {
    metrics.record_prediction(source);

    let started = Instant::now();
    let image = decode_image(image_data)?;
    let prediction = classifier.classify(&image)?;
    metrics.record_inference_duration(started.elapsed().as_millis() as u64, source);

    tracing::debug!(
        "Predicted class {} at {:.2}% from {}",
        prediction.class_index,
        prediction.confidence,
        source
    );

    Ok(Verdict::from_prediction(&prediction, labels))
}

#[instrument(skip(state, multipart))]
pub async fn predict_upload(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<Json<Verdict>, PredictError> {
    let mut image_data: Vec<u8> = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("file") {
            image_data = field.bytes().await?.to_vec();
        }
    }

    if image_data.is_empty() {
        return Err(PredictError::MissingUpload);
    }

    let verdict = classify_bytes(
        state.classifier.as_ref(),
        &state.labels,
        &state.metrics,
        &image_data,
        "upload",
    )?;

    Ok(Json(verdict))
}

#[instrument(skip(state))]
pub async fn predict_url(
    State(state): State<SharedState>,
    Json(request): Json<UrlRequest>,
) -> Result<Json<Verdict>, PredictError> {
    let image_data = match state.fetcher.fetch(&request.url).await {
        Ok(bytes) => bytes,
        Err(FetchError::Request(e)) => {
            tracing::warn!("Image fetch failed for {}: {}", request.url, e);
            return Ok(Json(Verdict::invalid_url()));
        }
    };

    // A fetched body that is not an image gets the same generic message as a
    // network failure; only the log line tells them apart.
    match classify_bytes(
        state.classifier.as_ref(),
        &state.labels,
        &state.metrics,
        &image_data,
        "url",
    ) {
        Ok(verdict) => Ok(Json(verdict)),
        Err(PredictError::Decode(e)) => {
            tracing::warn!("Fetched body from {} is not an image: {}", request.url, e);
            Ok(Json(Verdict::invalid_url()))
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        classifier_service::Prediction,
        config::FetcherConfig,
        fetch::ImageFetcher,
        labels::table_from_str,
        routes::api_routes,
        verdict::{VerdictKind, INVALID_URL_MESSAGE, UNSUPPORTED_MESSAGE},
    };
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use image::{DynamicImage, ImageBuffer, Rgb};
    use std::{io::Cursor, path::PathBuf, sync::Arc};
    use tower::ServiceExt;

    struct FixedClassifier {
        prediction: Prediction,
    }

    impl ClassifierService for FixedClassifier {
        fn classify(&self, _image: &DynamicImage) -> Result<Prediction, ClassifierError> {
            Ok(self.prediction)
        }
    }

    fn test_state(prediction: Prediction) -> SharedState {
        SharedState {
            classifier: Arc::new(FixedClassifier { prediction }),
            labels: Arc::new(table_from_str(
                "Brokoli|Vitamin C, Vitamin K, Serat, Folat, Antioksidan\n\
                 Capsicum|Vitamin A, Vitamin C, Vitamin B6, Folat, Antioksidan\n\
                 Tomat|Likopen, Vitamin C, Vitamin K, Folat, Kalium\n",
            )),
            fetcher: Arc::new(ImageFetcher::new(&FetcherConfig { timeout_secs: 2 }).unwrap()),
            metrics: Arc::new(Metrics::new()),
            example_image: PathBuf::from("./assets/contoh_sayuran.png"),
        }
    }

    fn png_bytes() -> Vec<u8> {
        let img = ImageBuffer::<Rgb<u8>, Vec<u8>>::from_pixel(32, 32, Rgb([200, 40, 40]));
        let mut image_data: Vec<u8> = Vec::new();
        img.write_to(&mut Cursor::new(&mut image_data), image::ImageFormat::Png)
            .unwrap();
        image_data
    }

    // High-entropy pixels barely compress, so the encoded file stays close
    // to the raw 3 MB of a 1024x1024 RGB image.
    fn noisy_png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut seed: u64 = 0x5eed;
        let mut next = move || {
            seed = seed
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (seed >> 33) as u8
        };
        let img = ImageBuffer::<Rgb<u8>, Vec<u8>>::from_fn(width, height, |_, _| {
            Rgb([next(), next(), next()])
        });
        let mut image_data: Vec<u8> = Vec::new();
        img.write_to(&mut Cursor::new(&mut image_data), image::ImageFormat::Png)
            .unwrap();
        image_data
    }

    fn multipart_request(field_name: &str, filename: &str, payload: &[u8]) -> Request<Body> {
        let boundary = "sayur-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; \
                 name=\"{field_name}\"; filename=\"{filename}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(payload);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/api/predict/upload")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[test]
    fn confident_classification_yields_the_success_verdict() {
        let state = test_state(Prediction {
            class_index: 2,
            confidence: 95.30,
        });

        let verdict = classify_bytes(
            state.classifier.as_ref(),
            &state.labels,
            &state.metrics,
            &png_bytes(),
            "upload",
        )
        .unwrap();

        assert_eq!(verdict.kind, VerdictKind::Success);
        assert!(verdict.message.contains("Tomat"));
        assert!(verdict.message.contains("95.30%"));
        assert!(verdict
            .message
            .contains("Likopen, Vitamin C, Vitamin K, Folat, Kalium"));
    }

    #[test]
    fn low_confidence_classification_yields_the_warning_verdict() {
        let state = test_state(Prediction {
            class_index: 0,
            confidence: 45.0,
        });

        let verdict = classify_bytes(
            state.classifier.as_ref(),
            &state.labels,
            &state.metrics,
            &png_bytes(),
            "upload",
        )
        .unwrap();

        assert_eq!(verdict.kind, VerdictKind::Unsupported);
        assert_eq!(verdict.message, UNSUPPORTED_MESSAGE);
    }

    #[test]
    fn undecodable_upload_is_a_decode_error() {
        let state = test_state(Prediction {
            class_index: 0,
            confidence: 99.0,
        });

        let result = classify_bytes(
            state.classifier.as_ref(),
            &state.labels,
            &state.metrics,
            b"not an image at all",
            "upload",
        );

        assert!(matches!(result, Err(PredictError::Decode(_))));
    }

    #[tokio::test]
    async fn upload_past_the_default_body_cap_still_reaches_the_classifier() {
        let app = api_routes().with_state(test_state(Prediction {
            class_index: 2,
            confidence: 95.30,
        }));

        let png = noisy_png_bytes(1024, 1024);
        assert!(png.len() > 2 * 1024 * 1024);

        let response = app
            .oneshot(multipart_request("file", "sayur.png", &png))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let verdict: Verdict = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(verdict.kind, VerdictKind::Success);
        assert_eq!(verdict.label.as_deref(), Some("Tomat"));
    }

    #[tokio::test]
    async fn upload_without_a_file_field_is_unprocessable() {
        let app = api_routes().with_state(test_state(Prediction {
            class_index: 2,
            confidence: 95.30,
        }));

        let response = app
            .oneshot(multipart_request("keterangan", "notes.txt", b"bukan gambar"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn undecodable_upload_body_is_unprocessable() {
        let app = api_routes().with_state(test_state(Prediction {
            class_index: 2,
            confidence: 95.30,
        }));

        let response = app
            .oneshot(multipart_request("file", "sayur.png", b"not an image"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn unreachable_url_returns_the_generic_inline_error() {
        let state = test_state(Prediction {
            class_index: 2,
            confidence: 95.30,
        });

        let response = predict_url(
            State(state),
            Json(UrlRequest {
                url: "http://127.0.0.1:1/sayur.png".into(),
            }),
        )
        .await
        .unwrap();

        assert_eq!(response.0.kind, VerdictKind::Error);
        assert_eq!(response.0.message, INVALID_URL_MESSAGE);
    }
}
