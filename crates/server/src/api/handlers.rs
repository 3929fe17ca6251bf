use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::Json;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use serde_json::{Value, json};
use tracing::{error, info, warn};

use zubi_shared::{Role, TurnResponse};

use crate::offline;

use super::AppState;
use super::routes::MAX_UPLOAD_BYTES;
use super::types::ChatRequest;

const ALLOWED_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png", "gif", "webp"];

/// One conversation exchange. Every handled outcome — including model
/// transport failures and unparseable model output — answers 200 with a
/// valid turn; even the 400/500 paths carry a turn-shaped apology so
/// the client never needs a separate error-rendering path.
pub async fn handle_chat(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<TurnResponse>) {
    if !body.get("messages").map(Value::is_array).unwrap_or(false) {
        warn!("invalid chat request: messages is not an array");
        return (StatusCode::BAD_REQUEST, Json(TurnResponse::garbled()));
    }

    let request: ChatRequest = match serde_json::from_value(body) {
        Ok(request) => request,
        Err(e) => {
            warn!("invalid chat request: {e}");
            return (StatusCode::BAD_REQUEST, Json(TurnResponse::garbled()));
        }
    };

    let turn = match &state.model {
        Some(model) => {
            match model
                .turn(&request.messages, request.image_url.as_deref())
                .await
            {
                Ok(turn) => turn,
                Err(e) => {
                    error!("chat turn failed: {e:#}");
                    return (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(TurnResponse::dizzy()),
                    );
                }
            }
        }
        None => {
            let user_turns = request
                .messages
                .iter()
                .filter(|m| m.role == Role::User)
                .count();
            offline::offline_turn(user_turns)
        }
    };

    (StatusCode::OK, Json(turn))
}

/// Stores one uploaded photo under the public uploads directory and
/// returns its server-relative URL. Not part of the conversation
/// protocol, so violations get a plain error object rather than a
/// turn-shaped body.
pub async fn handle_upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> (StatusCode, Json<Value>) {
    let field = loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some("image") => break field,
            Ok(Some(_)) => continue,
            Ok(None) => return bad_request("No image uploaded"),
            Err(e) => {
                warn!("unreadable upload body: {e}");
                return bad_request("No image uploaded");
            }
        }
    };

    let original_name = field.file_name().unwrap_or_default().to_string();
    let ext = Path::new(&original_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return bad_request("Only image files allowed");
    }

    let bytes = match field.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("upload body rejected: {e}");
            return bad_request("Image too large");
        }
    };
    if bytes.len() > MAX_UPLOAD_BYTES {
        return bad_request("Image too large");
    }

    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let filename = format!("image_{millis}.{ext}");

    let upload_dir = state.upload_dir();
    let stored = async {
        tokio::fs::create_dir_all(&upload_dir).await?;
        tokio::fs::write(upload_dir.join(&filename), &bytes).await
    }
    .await;

    if let Err(e) = stored {
        error!("could not store upload {filename}: {e}");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Could not store image" })),
        );
    }

    info!("stored upload {filename} ({} bytes)", bytes.len());
    (
        StatusCode::OK,
        Json(json!({ "url": format!("/uploads/{filename}"), "filename": filename })),
    )
}

fn bad_request(message: &str) -> (StatusCode, Json<Value>) {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}
