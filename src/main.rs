use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};
use wellness_app::advisory::GeminiClient;
use wellness_app::{load_data, router, AppState, Config, Store};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = Config::from_env();
    if let Some(parent) = config.data_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let data = load_data(&config.data_path).await;
    let store = Store::new(config.data_path.clone(), data);
    let advisory = Arc::new(GeminiClient::new(&config.advisory));
    let state = AppState::new(store, advisory);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}
