use opentelemetry::{
    global,
    metrics::{Counter, Histogram, MeterProvider},
    KeyValue,
};
use prometheus::Registry;

pub struct Metrics {
    prediction_counter: Counter<u64>,
    inference_duration: Histogram<u64>,
    pub registry: Registry,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();
        // TODO: deprecated crate to be replaced with an OLTP exporter
        let exporter = opentelemetry_prometheus::exporter()
            .with_registry(registry.clone())
            .build()
            .unwrap();

        let provider = opentelemetry_sdk::metrics::SdkMeterProvider::builder()
            .with_reader(exporter)
            .build();

        let meter = provider.meter("vegetable_classifier");
        global::set_meter_provider(provider);

        let prediction_counter = meter
            .u64_counter("predictions_total")
            .with_description("Total number of prediction requests")
            .build();

        let inference_duration = meter
            .u64_histogram("inference_duration_ms")
            .with_boundaries(vec![5., 10., 25., 50., 100., 250., 500., 1000., 2500.])
            .with_description("Duration of decode plus model inference in milliseconds")
            .build();

        Metrics {
            prediction_counter,
            inference_duration,
            registry,
        }
    }

    pub fn record_prediction(&self, source: &str) {
        let attributes = vec![KeyValue::new("source", source.to_string())];
        self.prediction_counter.add(1, &attributes);
    }

    pub fn record_inference_duration(&self, duration_ms: u64, source: &str) {
        let attributes = vec![KeyValue::new("source", source.to_string())];
        self.inference_duration.record(duration_ms, &attributes);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
