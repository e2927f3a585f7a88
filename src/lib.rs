mod classifier_service;
mod fetch;
mod labels;
mod ort_classifier;
mod routes;
mod server;
mod telemetry;
mod verdict;

pub mod app;
pub mod config;

pub use app::start_app;
