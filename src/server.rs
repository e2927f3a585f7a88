use crate::{
    classifier_service::ClassifierService, config::Config, fetch::ImageFetcher,
    labels::LabelTable, routes::api_routes, telemetry::Metrics,
};
use axum::Router;
use axum_otel_metrics::HttpMetricsLayerBuilder;
use std::{path::PathBuf, sync::Arc};
use tokio::{net::TcpListener, sync::broadcast::Receiver, task::JoinHandle};

#[derive(Clone)]
pub struct SharedState {
    pub classifier: Arc<dyn ClassifierService>,
    pub labels: Arc<LabelTable>,
    pub fetcher: Arc<ImageFetcher>,
    pub metrics: Arc<Metrics>,
    pub example_image: PathBuf,
}

pub struct HttpServer {
    router: Router,
    listener: TcpListener,
}

impl HttpServer {
    pub async fn new(
        classifier: Arc<dyn ClassifierService>,
        labels: Arc<LabelTable>,
        fetcher: Arc<ImageFetcher>,
        config: &Config,
    ) -> anyhow::Result<Self> {
        let addr = config.server.get_address();

        let metrics = Arc::new(Metrics::new());
        let metrics_layer = HttpMetricsLayerBuilder::new().build();

        let app_state = SharedState {
            classifier,
            labels,
            fetcher,
            metrics,
            example_image: config.assets.example_image.clone(),
        };

        let router = Router::new()
            .merge(api_routes())
            .with_state(app_state)
            .layer(metrics_layer);

        let listener = TcpListener::bind(addr).await?;

        Ok(Self { router, listener })
    }

    pub async fn run(
        self,
        shutdown_rx: Receiver<()>,
    ) -> anyhow::Result<JoinHandle<anyhow::Result<()>>> {
        tracing::info!("Starting app on {}", &self.listener.local_addr()?);

        let listener = self.listener;
        let router = self.router;
        let server_handle = tokio::spawn({
            let mut shutdown_rx = shutdown_rx.resubscribe();
            async move {
                let server = axum::serve(listener, router);
                server
                    .with_graceful_shutdown(async move {
                        shutdown_rx.recv().await.ok();
                    })
                    .await?;
                Ok(())
            }
        });

        Ok(server_handle)
    }
}
