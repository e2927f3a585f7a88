mod health;
mod index;
mod metrics;
mod predict;

use crate::server::SharedState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        .route("/", get(index::index_page))
        .route("/assets/example", get(index::example_image))
        .route("/health_check", get(health::healthcheck))
        .route("/metrics", get(metrics::metrics_handler))
        .route(
            "/api/predict/upload",
            // Uploads are whole camera photos, routinely past axum's 2 MiB
            // default body cap. This route takes bodies of any size.
            post(predict::predict_upload).layer(DefaultBodyLimit::disable()),
        )
        .route("/api/predict/url", post(predict::predict_url))
}
