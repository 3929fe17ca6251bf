use serde::Deserialize;

use zubi_shared::Message;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    #[serde(default)]
    pub image_url: Option<String>,
}
