use gym_api::{create_app, error::AppResult, settings::Settings};

use axum::serve;
use tokio::{net::TcpListener, signal, time::Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> AppResult<()> {
    dotenv::dotenv().ok();
    dotenv::from_path("./api/.env").ok();

    let start = Instant::now();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let settings = Settings::load()?;
    let app = create_app(&settings).await?;

    let listener = TcpListener::bind((settings.server.host.as_str(), settings.server.port)).await?;
    info!("Listening on {}", listener.local_addr()?);

    let shutdown = async move {
        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(e) => {
                    tracing::warn!("Failed to install signal handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = signal::ctrl_c() => {},
            _ = terminate => {},
        }
        let duration = start.elapsed();
        info!("Shutting down gracefully... in {:?}", duration);
    };

    let server = serve(listener, app).with_graceful_shutdown(shutdown);

    if let Err(e) = server.await {
        tracing::error!("Server error: {}", e);
    }

    Ok(())
}
