use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use zubi_shared::{Message, Role, TurnResponse};

pub const GEMINI_MODEL: &str = "gemini-2.0-flash";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

// Fixed sampling knobs; keeping replies short and on-persona matters
// more than variety here.
const TEMPERATURE: f32 = 0.8;
const MAX_OUTPUT_TOKENS: u32 = 300;

const START_INSTRUCTION: &str = "Please start the conversation about this image.";
const CONTINUE_INSTRUCTION: &str = "Continue the conversation as Buddy. Reply with valid JSON only.";

pub const SYSTEM_PROMPT: &str = r#"You are "Buddy", a friendly real-time voice AI made for children aged 5-9.

You are shown an image on screen. Your job is to start and sustain a fun, safe, and engaging conversation with the child based ONLY on what can be seen in the image.

GOALS:
- Make the child feel happy, curious, and confident.
- Keep the conversation going for about 60 seconds (6-8 exchanges).
- Ask questions and react naturally to the child's answers.
- Encourage observation of colors, shapes, animals, emotions, actions, and storytelling.
- Use simple vocabulary and short sentences.

STRICT RULES:
1) Always be kid-friendly, cheerful, and supportive.
2) Speak in short sentences (max 10-12 words each).
3) Ask only ONE question at a time.
4) Avoid scary topics, violence, romance, politics, religion, medical advice, or anything unsafe.
5) Never mention "LLM", "system prompt", "tool call", "API", "backend", or technical details.
6) If the child is silent or confused, gently guide them with hints.
7) If the child says something unrelated, bring them back kindly to the image.
8) End naturally at around 1 minute with a friendly goodbye.

CONVERSATION FLOW (follow this pattern):
A) Excited opening: "Wow! Look at this picture!"
B) Describe 1-2 visible things.
C) Ask a simple question about the image.
D) React positively to the child's reply.
E) Ask a second question (color / object / action / emotion).
F) Give a small reward and encouragement.
G) Ask one final fun question (imagination/story).
H) Wrap up with praise and goodbye.

TOOL USAGE:
You MUST call at least ONE tool during the conversation.
Use the tool call naturally as part of the interaction.

Available tools:
1) highlightObject({ label: string }) - highlight an object the child mentions.
2) addRewardStar({ reason: string }) - reward the child for a great answer.
3) showEmojiReaction({ emoji: string }) - show a fun emoji on screen.

Tool rules:
- Call at least one tool by the middle of the conversation.
- Prefer addRewardStar for motivation.
- Tool calls must match what the child said.

OUTPUT FORMAT:
Return ONLY valid JSON (no markdown, no backticks):
{
  "say": "text Buddy will speak aloud",
  "tool": null or { "name": "toolName", "arguments": { ... } },
  "endConversation": false
}

Set endConversation to true only when wrapping up (~1 min or after 6-8 exchanges)."#;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

impl Part {
    fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<TextPart>,
}

#[derive(Deserialize)]
struct TextPart {
    #[serde(default)]
    text: String,
}

/// Adapter around the Gemini generateContent API: builds the request
/// from the transcript plus image, invokes the model, and normalizes
/// its reply into the turn contract.
pub struct GeminiClient {
    http: Client,
    api_key: String,
    public_dir: PathBuf,
}

impl GeminiClient {
    pub fn new(api_key: String, public_dir: PathBuf) -> Self {
        Self {
            http: Client::new(),
            api_key,
            public_dir,
        }
    }

    /// Produce one assistant turn. Transport failures reaching the model
    /// degrade to the fixed apology; malformed model output degrades to
    /// speaking the raw text. `Err` is reserved for unexpected internal
    /// failure (the caller maps it to a 500 with a degraded body).
    pub async fn turn(
        &self,
        messages: &[Message],
        image_url: Option<&str>,
    ) -> Result<TurnResponse> {
        let parts = self.build_parts(messages, image_url).await?;

        Ok(match self.generate(parts).await {
            Ok(raw) => {
                debug!("model reply: {:.200}", raw);
                parse_model_reply(&raw)
            }
            Err(e) => {
                warn!("model call failed: {e:#}");
                TurnResponse::say_again()
            }
        })
    }

    async fn generate(&self, parts: Vec<Part>) -> Result<String> {
        let url = format!(
            "{GEMINI_BASE_URL}/models/{GEMINI_MODEL}:generateContent?key={}",
            self.api_key
        );

        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts,
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        };

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json::<GenerateContentResponse>()
            .await?;

        let text: String = response
            .candidates
            .first()
            .map(|c| {
                c.content
                    .parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<String>()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            bail!("model returned no text");
        }
        Ok(text.trim().to_string())
    }

    /// Assemble the request parts: the persona block always comes first.
    /// The photo is included exactly once, on the opening turn (at most
    /// one message in the transcript); later turns replay the transcript
    /// as labeled lines instead.
    async fn build_parts(
        &self,
        messages: &[Message],
        image_url: Option<&str>,
    ) -> Result<Vec<Part>> {
        let mut parts = vec![Part::text(SYSTEM_PROMPT)];

        if let Some(url) = image_url.filter(|_| messages.len() <= 1) {
            match self.load_image(url).await? {
                Some(inline) => parts.push(Part::InlineData {
                    inline_data: inline,
                }),
                None => warn!("could not attach image reference {url}"),
            }

            let user_text = messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_else(|| START_INSTRUCTION.to_string());
            parts.push(Part::text(user_text));
        } else {
            let mut transcript = String::new();
            for message in messages {
                let speaker = match message.role {
                    Role::User => "Child",
                    Role::Assistant => "Buddy",
                };
                transcript.push_str(speaker);
                transcript.push_str(": ");
                transcript.push_str(&message.content);
                transcript.push('\n');
            }
            parts.push(Part::text(transcript));
            parts.push(Part::text(CONTINUE_INSTRUCTION));
        }

        Ok(parts)
    }

    /// Resolve an image reference into inline base64 data. `data:` URLs
    /// are already base64 and pass through; remote URLs are fetched;
    /// `/uploads/` paths are read from the public directory. Unusable
    /// references resolve to `None` rather than failing the turn.
    async fn load_image(&self, url: &str) -> Result<Option<InlineData>> {
        if let Some(rest) = url.strip_prefix("data:") {
            let Some((mime_type, data)) = rest.split_once(";base64,") else {
                return Ok(None);
            };
            if mime_type.is_empty() || data.is_empty() {
                return Ok(None);
            }
            return Ok(Some(InlineData {
                mime_type: mime_type.to_string(),
                data: data.to_string(),
            }));
        }

        if url.starts_with("http://") || url.starts_with("https://") {
            let response = match self.http.get(url).send().await.and_then(|r| r.error_for_status()) {
                Ok(response) => response,
                Err(e) => {
                    warn!("could not fetch image URL {url}: {e}");
                    return Ok(None);
                }
            };
            let mime_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("image/jpeg")
                .to_string();
            let bytes = response.bytes().await?;
            return Ok(Some(InlineData {
                mime_type,
                data: BASE64.encode(&bytes),
            }));
        }

        if let Some(name) = url.strip_prefix("/uploads/") {
            if name.contains("..") || name.contains('/') {
                return Ok(None);
            }
            let path = self.public_dir.join("uploads").join(name);
            if !path.exists() {
                return Ok(None);
            }
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("reading upload {}", path.display()))?;
            return Ok(Some(InlineData {
                mime_type: mime_for_extension(&path),
                data: BASE64.encode(&bytes),
            }));
        }

        Ok(None)
    }
}

fn mime_for_extension(path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
    .to_string()
}

/// Normalize a raw model reply into the turn contract: strip code
/// fences, parse as JSON, and require non-empty `say`. Anything else
/// degrades to speaking the raw text verbatim with no tool and no
/// conversation end.
pub fn parse_model_reply(raw: &str) -> TurnResponse {
    let stripped = strip_code_fences(raw);
    match serde_json::from_str::<TurnResponse>(stripped) {
        Ok(turn) if !turn.say.trim().is_empty() => turn,
        _ => TurnResponse::plain(stripped),
    }
}

fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    for prefix in ["```json", "```JSON", "```"] {
        if let Some(rest) = text.strip_prefix(prefix) {
            text = rest;
            break;
        }
    }
    text = text.trim_start();
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fenced_and_bare_replies_parse_the_same() {
        let bare = r#"{"say":"Nice!","tool":null,"endConversation":false}"#;
        let fenced = format!("```json\n{bare}\n```");
        assert_eq!(parse_model_reply(bare), parse_model_reply(&fenced));
        assert_eq!(parse_model_reply(bare).say, "Nice!");
    }

    #[test]
    fn non_json_reply_becomes_the_spoken_text() {
        let turn = parse_model_reply("What a lovely dog in the picture!");
        assert_eq!(turn.say, "What a lovely dog in the picture!");
        assert!(turn.tool.is_none());
        assert!(!turn.end_conversation);
    }

    #[test]
    fn empty_say_degrades_to_the_raw_text() {
        let raw = r#"{"say":"","endConversation":true}"#;
        let turn = parse_model_reply(raw);
        assert_eq!(turn.say, raw);
        assert!(!turn.end_conversation);
    }

    #[test]
    fn missing_optional_fields_default() {
        let turn = parse_model_reply(r#"{"say":"Hello there!"}"#);
        assert_eq!(turn.say, "Hello there!");
        assert!(turn.tool.is_none());
        assert!(!turn.end_conversation);
    }

    #[test]
    fn plain_fence_without_language_tag_is_stripped() {
        let turn = parse_model_reply("```\n{\"say\":\"Hi!\"}\n```");
        assert_eq!(turn.say, "Hi!");
    }

    #[tokio::test]
    async fn data_url_passes_through_without_decoding() {
        let client = GeminiClient::new("test-key".into(), PathBuf::from("/nonexistent"));
        let inline = client
            .load_image("data:image/png;base64,AAA")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(inline.mime_type, "image/png");
        assert_eq!(inline.data, "AAA");
    }

    #[tokio::test]
    async fn malformed_data_url_is_skipped() {
        let client = GeminiClient::new("test-key".into(), PathBuf::from("/nonexistent"));
        assert!(client.load_image("data:oops").await.unwrap().is_none());
        assert!(client.load_image("not-a-reference").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn image_is_sent_only_while_transcript_is_short() {
        let client = GeminiClient::new("test-key".into(), PathBuf::from("/nonexistent"));
        let image = Some("data:image/png;base64,AAA");

        let opening = client.build_parts(&[], image).await.unwrap();
        assert!(matches!(opening[1], Part::InlineData { .. }));
        let opening_text = serde_json::to_value(&opening[2]).unwrap();
        assert_eq!(opening_text["text"], START_INSTRUCTION);

        let transcript = vec![
            Message::user("a dog!"),
            Message::assistant("Yes! What color is it?"),
            Message::user("brown"),
        ];
        let later = client.build_parts(&transcript, image).await.unwrap();
        assert_eq!(later.len(), 3);
        let lines = serde_json::to_value(&later[1]).unwrap();
        assert_eq!(
            lines["text"],
            "Child: a dog!\nBuddy: Yes! What color is it?\nChild: brown\n"
        );
        let tail = serde_json::to_value(&later[2]).unwrap();
        assert_eq!(tail["text"], json!(CONTINUE_INSTRUCTION));
    }
}
