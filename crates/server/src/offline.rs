use zubi_shared::{ToolDirective, TurnResponse};

/// Number of scripted entries. Offline conversations always terminate
/// by this many user turns.
pub const SCRIPT_LEN: usize = 6;

/// Deterministic stand-in for the model: maps the number of user
/// messages so far to a fixed scripted turn covering the same
/// conversational arc as the model persona. Pure; once the script is
/// exhausted the terminal goodbye entry repeats.
pub fn offline_turn(user_message_count: usize) -> TurnResponse {
    match user_message_count.min(SCRIPT_LEN - 1) {
        0 => scripted(
            "Wow! Look at this picture! It's so colorful and fun! What is the first thing you see?",
            ToolDirective::ShowEmojiReaction { emoji: "😍".into() },
            false,
        ),
        1 => scripted(
            "Oh cool! Great eyes! I love that you noticed that! What color is it?",
            ToolDirective::AddRewardStar {
                reason: "Great observation!".into(),
            },
            false,
        ),
        2 => scripted(
            "Nice! That's a beautiful color! Can you find something round in the picture?",
            ToolDirective::ShowEmojiReaction { emoji: "🎨".into() },
            false,
        ),
        3 => scripted(
            "You're amazing at this! What do you think is happening in the picture?",
            ToolDirective::AddRewardStar {
                reason: "Super color spotter!".into(),
            },
            false,
        ),
        4 => scripted(
            "What a fun story! If you could jump into this picture, what would you do?",
            ToolDirective::ShowEmojiReaction { emoji: "✨".into() },
            false,
        ),
        _ => scripted(
            "Ha ha, that sounds like an adventure! You did an awesome job today! \
             You're a real picture detective! Bye bye, superstar!",
            ToolDirective::AddRewardStar {
                reason: "Amazing picture detective!".into(),
            },
            true,
        ),
    }
}

fn scripted(say: &str, tool: ToolDirective, end_conversation: bool) -> TurnResponse {
    TurnResponse {
        say: say.to_string(),
        tool: Some(tool.to_call()),
        end_conversation,
    }
}
