use std::sync::Arc;
use std::time::Duration;

use httpmock::prelude::*;
use serde_json::json;

use zubi_client::{ApiClient, Conversation};
use zubi_server::api::{AppState, create_router};
use zubi_server::config::Config;
use zubi_shared::{Role, TurnResponse};

/// Real server, offline mode (no model credential), ephemeral port.
async fn spawn_offline_server() -> String {
    let config = Config {
        port: 0,
        public_dir: std::env::temp_dir(),
        gemini_api_key: None,
    };
    let state = Arc::new(AppState::new(&config));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}

#[tokio::test]
async fn scripted_conversation_runs_to_its_goodbye() {
    let base = spawn_offline_server().await;
    let conversation = Conversation::new(ApiClient::new(base));

    let opening = conversation
        .begin("data:image/png;base64,AAA")
        .await
        .unwrap();
    assert!(opening.say.starts_with("Wow! Look at this picture!"));
    assert!(!opening.end_conversation);
    let tool = opening.tool.unwrap();
    assert_eq!(tool.name, "showEmojiReaction");
    assert_eq!(tool.arguments["emoji"], "😍");

    // Opening leaves one assistant message, no user messages, no turns.
    assert_eq!(conversation.turn_count(), 0);
    let transcript = conversation.transcript();
    assert_eq!(transcript.len(), 1);
    assert_eq!(transcript[0].role, Role::Assistant);

    let mut last = None;
    for i in 1..=5u32 {
        last = conversation.send_message(format!("answer {i}")).await;
        assert_eq!(conversation.turn_count(), i);
    }
    assert!(last.unwrap().end_conversation);
    assert!(conversation.is_ended());

    // A sixth message is rejected and changes nothing.
    assert!(conversation.send_message("hello?").await.is_none());
    assert_eq!(conversation.turn_count(), 5);
    assert_eq!(conversation.transcript().len(), 11);
}

#[tokio::test]
async fn reset_restores_a_fresh_session() {
    let base = spawn_offline_server().await;
    let conversation = Conversation::new(ApiClient::new(base));

    conversation.begin("data:image/png;base64,AAA").await;
    conversation.send_message("a cat!").await;
    assert_eq!(conversation.turn_count(), 1);

    conversation.reset();
    assert_eq!(conversation.turn_count(), 0);
    assert!(conversation.transcript().is_empty());
    assert!(!conversation.is_ended());
    assert!(conversation.image().is_none());

    // A reset session can begin again from scratch.
    let opening = conversation
        .begin("data:image/png;base64,BBB")
        .await
        .unwrap();
    assert!(opening.say.starts_with("Wow!"));
}

#[tokio::test]
async fn server_error_status_degrades_to_the_fixed_apology() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/chat");
            then.status(500).body("boom");
        })
        .await;

    let conversation = Conversation::new(ApiClient::new(server.base_url()));
    let turn = conversation
        .begin("data:image/png;base64,AAA")
        .await
        .unwrap();
    assert_eq!(turn, TurnResponse::say_again());

    mock.assert_async().await;
}

#[tokio::test]
async fn response_in_flight_during_reset_is_discarded() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/chat");
            then.status(200)
                .delay(Duration::from_millis(300))
                .json_body(json!({ "say": "slow reply", "tool": null, "endConversation": false }));
        })
        .await;

    let conversation = Conversation::new(ApiClient::new(server.base_url()));
    let in_flight = {
        let conversation = conversation.clone();
        tokio::spawn(async move { conversation.begin("data:image/png;base64,AAA").await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    conversation.reset();

    assert_eq!(in_flight.await.unwrap(), None);
    assert!(conversation.transcript().is_empty());
    assert_eq!(conversation.turn_count(), 0);
    assert!(conversation.image().is_none());
}
