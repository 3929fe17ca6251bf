use serde_json::{Value, json};

use crate::turn::ToolCall;

pub const HIGHLIGHT_OBJECT: &str = "highlightObject";
pub const ADD_REWARD_STAR: &str = "addRewardStar";
pub const SHOW_EMOJI_REACTION: &str = "showEmojiReaction";

/// The closed set of visual effects the assistant may request. Dispatch
/// matches exhaustively on this enum, so a new effect is a compile-time
/// extension rather than a silently-ignored typo.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ToolDirective {
    HighlightObject { label: String },
    AddRewardStar { reason: String },
    ShowEmojiReaction { emoji: String },
}

impl ToolDirective {
    /// Interpret a wire-level tool call. Unknown names map to `None`;
    /// missing or non-string arguments fall back to friendly defaults.
    pub fn from_call(call: &ToolCall) -> Option<Self> {
        let arg = |key: &str| {
            call.arguments
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        match call.name.as_str() {
            HIGHLIGHT_OBJECT => Some(Self::HighlightObject {
                label: arg("label").unwrap_or_else(|| "that".to_string()),
            }),
            ADD_REWARD_STAR => Some(Self::AddRewardStar {
                reason: arg("reason").unwrap_or_else(|| "Great job!".to_string()),
            }),
            SHOW_EMOJI_REACTION => Some(Self::ShowEmojiReaction {
                emoji: arg("emoji").unwrap_or_else(|| "🎉".to_string()),
            }),
            _ => None,
        }
    }

    pub fn to_call(&self) -> ToolCall {
        match self {
            Self::HighlightObject { label } => ToolCall {
                name: HIGHLIGHT_OBJECT.to_string(),
                arguments: json!({ "label": label }),
            },
            Self::AddRewardStar { reason } => ToolCall {
                name: ADD_REWARD_STAR.to_string(),
                arguments: json!({ "reason": reason }),
            },
            Self::ShowEmojiReaction { emoji } => ToolCall {
                name: SHOW_EMOJI_REACTION.to_string(),
                arguments: json!({ "emoji": emoji }),
            },
        }
    }
}
