use anyhow::Result;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use zubi_server::api;
use zubi_server::config::Config;
use zubi_server::model::GEMINI_MODEL;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();
    if config.gemini_api_key.is_some() {
        println!("✅ Gemini connected – {GEMINI_MODEL} vision mode active.\n");
    } else {
        println!("⚠️  No GEMINI_API_KEY found – using offline conversation mode.");
        println!("   Add your Gemini API key to .env for AI-powered chats.\n");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = api::start_server(config, shutdown_rx).await {
            eprintln!("API server crashed: {e}");
        }
    });

    tokio::signal::ctrl_c().await?;
    println!("\nReceived shutdown signal...");

    let _ = shutdown_tx.send(true);
    let _ = server_handle.await;

    println!("Zubi shutdown complete.");
    Ok(())
}
