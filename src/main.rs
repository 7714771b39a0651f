use exam_archive::{Config, app};
use log::{debug, error, info, warn};

#[tokio::main]
async fn main() {
    // Loaded before the logger so RUST_LOG from `.env` applies.
    let dotenv = dotenvy::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    match dotenv {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => warn!("Could not load .env: {}", e),
    }

    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), exam_archive::Error> {
    let config = Config::from_env()?;
    let app = app(&config).await?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(
        "listening on {}, storing uploads in {}",
        listener.local_addr()?,
        config.upload_dir.display()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
