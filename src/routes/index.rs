use crate::server::SharedState;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
};

pub async fn index_page() -> Html<&'static str> {
    Html(include_str!("../../static/index.html"))
}

/// Serves the static example image shown above the input form.
pub async fn example_image(State(state): State<SharedState>) -> Response {
    match tokio::fs::read(&state.example_image).await {
        Ok(bytes) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "image/png")],
            bytes,
        )
            .into_response(),
        Err(e) => {
            tracing::warn!("Example image {:?} unreadable: {}", state.example_image, e);
            StatusCode::NOT_FOUND.into_response()
        }
    }
}
