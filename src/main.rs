use pdf_vault::{AppConfig, AppState, router, storage, upload::UploadLimits};
use tracing_subscriber::EnvFilter;

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config =
        AppConfig::from_env().inspect_err(|e| tracing::error!(error = %e, "bad configuration"))?;

    let store = storage::connect(&config.database_url)
        .await
        .inspect_err(|e| {
            tracing::error!(error = %e, url = %config.database_url, "failed to open document store")
        })?;
    tracing::info!(url = %config.database_url, "document store ready");

    let app = router(AppState {
        store: store.clone(),
        limits: UploadLimits {
            max_bytes: config.max_upload_bytes,
        },
    });

    let listener = tokio::net::TcpListener::bind(config.bind_addr())
        .await
        .inspect_err(|e| {
            tracing::error!(error = %e, host = %config.host, port = config.port, "failed to bind")
        })?;
    tracing::info!("Server running on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close().await?;
    tracing::info!("server stopped");
    Ok(())
}
