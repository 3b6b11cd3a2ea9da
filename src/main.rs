use eletroon_dashboard::{api::ApiClient, load_session, router, AppState, Config};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = Config::from_env();
    let session = load_session(&config.data_path).await;
    if session.token().is_some() {
        info!("restored session from {}", config.data_path.display());
    }

    let api = ApiClient::new(config.api_url.clone())?;
    let state = AppState::new(config.data_path.clone(), session, api);
    let app = router(state);

    let addr = config.addr();
    info!("backend at {}", config.api_url);
    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutting down");
    }
}
