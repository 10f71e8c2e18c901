//! OCR Extract API - extracts text from uploaded JPEG images via Google Cloud Vision.

mod config;
mod credentials;
mod error;
mod ocr;
mod routes;
mod schema;
mod validation;

use config::Config;
use ocr::vision::VisionClient;
use ocr::EngineStatus;
use routes::AppState;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::from_env();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.default_log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Construct the recognition engine once; requests only ever read its status.
    let engine = EngineStatus::from_init(VisionClient::from_config(&config.vision));
    match &engine {
        EngineStatus::Ready(detector) => {
            info!("Vision API client initialized successfully ({})", detector.name())
        }
        EngineStatus::Unavailable { reason } => {
            error!("Failed to initialize Vision API client: {}", reason)
        }
    }

    let app = routes::router(AppState::new(engine));

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Application shutting down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
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

    info!("Shutdown signal received");
}
