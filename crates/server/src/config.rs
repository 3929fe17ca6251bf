use std::path::PathBuf;

/// Placeholder shipped in the example .env; treated the same as no key.
const PLACEHOLDER_KEY: &str = "your-gemini-key-here";

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub public_dir: PathBuf,
    pub gemini_api_key: Option<String>,
}

impl Config {
    /// Read configuration from the environment. A missing or placeholder
    /// GEMINI_API_KEY is not an error; it selects offline mode.
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let public_dir = std::env::var("ZUBI_PUBLIC_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("public"));

        Self {
            port,
            public_dir,
            gemini_api_key: valid_credential(std::env::var("GEMINI_API_KEY").ok()),
        }
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.public_dir.join("uploads")
    }
}

fn valid_credential(raw: Option<String>) -> Option<String> {
    raw.filter(|key| !key.is_empty() && key != PLACEHOLDER_KEY)
}
