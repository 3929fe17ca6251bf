pub mod handlers;
pub mod routes;
pub mod server;
pub mod types;

use std::path::PathBuf;

use crate::config::Config;
use crate::model::GeminiClient;

pub use routes::create_router;
pub use server::start_server;

/// Shared, immutable per-process state. The endpoint itself is
/// stateless per request: the full transcript arrives with every call,
/// so concurrent conversations never share mutable state.
pub struct AppState {
    pub model: Option<GeminiClient>,
    pub public_dir: PathBuf,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self {
            model: config
                .gemini_api_key
                .clone()
                .map(|key| GeminiClient::new(key, config.public_dir.clone())),
            public_dir: config.public_dir.clone(),
        }
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.public_dir.join("uploads")
    }
}
