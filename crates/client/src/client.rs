use std::path::Path;

use anyhow::Result;
use serde::Deserialize;
use serde_json::json;

use zubi_shared::{Message, TurnResponse};

#[derive(Deserialize, Debug)]
pub struct UploadResponse {
    pub url: String,
    pub filename: String,
}

#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    /// One conversation exchange: the full transcript goes up, one
    /// validated turn comes back.
    pub async fn chat(
        &self,
        messages: &[Message],
        image_url: Option<&str>,
    ) -> Result<TurnResponse> {
        let url = format!("{}/api/chat", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&json!({ "messages": messages, "imageUrl": image_url }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!("Server error: {}", response.status()));
        }

        Ok(response.json::<TurnResponse>().await?)
    }

    pub async fn upload(&self, path: &Path) -> Result<UploadResponse> {
        let url = format!("{}/api/upload", self.base_url);

        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image.jpg")
            .to_string();
        let bytes = tokio::fs::read(path).await?;
        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename);
        let form = reqwest::multipart::Form::new().part("image", part);

        let response = self.client.post(&url).multipart(form).send().await?;
        if !response.status().is_success() {
            return Err(anyhow::anyhow!("Upload failed: {}", response.status()));
        }

        Ok(response.json::<UploadResponse>().await?)
    }
}
