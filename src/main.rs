//! `llm-server` — load a local GGUF model and serve chat over HTTP.
//!
//! Startup never fails on a missing or broken model: the server comes up
//! in degraded mode and `/chat` answers 503 until restarted with a model.

use local_llm_lib::config::ServerConfig;
use local_llm_lib::llm;
use local_llm_lib::server::{self, CorsPolicy};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match dotenvy::dotenv() {
        Ok(path) => log::info!("[CONFIG] Loaded {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => log::warn!("[CONFIG] Ignoring .env: {}", e),
    }

    let config = ServerConfig::from_env()?;
    let service = Arc::new(llm::startup(&config).await);

    let app = server::router(service.clone(), CorsPolicy::new(&config.cors_origins));
    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    log::info!(
        "[SERVER] Listening on http://{} (model loaded: {})",
        listener.local_addr()?,
        service.is_loaded()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("[SERVER] Stopped");
    drop(service);
    log::info!("[MODEL] Released");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("[SERVER] Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                log::error!("[SERVER] Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("[SERVER] Shutdown signal received, draining");
}
