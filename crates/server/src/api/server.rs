use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;

use crate::config::Config;

use super::{AppState, create_router};

pub async fn start_server(config: Config, shutdown_rx: watch::Receiver<bool>) -> Result<()> {
    let state = Arc::new(AppState::new(&config));
    tokio::fs::create_dir_all(state.upload_dir()).await?;

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    println!(
        "🧒 Speak with Zubi is running at http://localhost:{}",
        config.port
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_rx))
        .await?;

    Ok(())
}

async fn shutdown_signal(mut shutdown_rx: watch::Receiver<bool>) {
    while !*shutdown_rx.borrow() {
        if shutdown_rx.changed().await.is_err() {
            break;
        }
    }
    println!("Shutting down API server...");
}
