use axum::{response::IntoResponse, response::Json};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
pub struct Status {
    service: String,
    status: String,
}

pub async fn healthcheck() -> impl IntoResponse {
    Json(Status {
        service: env!("CARGO_PKG_NAME").into(),
        status: "Available".into(),
    })
}
