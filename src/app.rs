use crate::{
    config::Config, fetch::ImageFetcher, labels::LabelTable, ort_classifier::OrtClassifier,
    server::HttpServer,
};

use std::{error::Error, sync::Arc};
use tokio::{signal, sync::broadcast};

pub async fn start_app(config: Config) -> Result<(), Box<dyn Error>> {
    let classifier = match OrtClassifier::new(&config.model) {
        Ok(classifier) => Arc::new(classifier),
        Err(e) => {
            tracing::error!("Failed to initialize classifier: {:?}", e);
            return Err(e);
        }
    };

    let labels = match LabelTable::load(&config.model.get_labels_path()) {
        Ok(labels) => {
            tracing::info!("Loaded {} vegetable labels", labels.len());
            Arc::new(labels)
        }
        Err(e) => {
            tracing::error!("Failed to load label table: {:?}", e);
            return Err(Box::new(e));
        }
    };

    let fetcher = Arc::new(ImageFetcher::new(&config.fetcher)?);

    let server = HttpServer::new(classifier, labels, fetcher, &config).await?;

    let (shutdown_tx, _) = broadcast::channel(1);
    let server_shutdown_rx = shutdown_tx.subscribe();

    let server_handle = server.run(server_shutdown_rx).await?;

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown.");

    let _ = shutdown_tx.send(());
    let _ = server_handle.await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
