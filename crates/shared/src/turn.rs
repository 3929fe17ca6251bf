use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool request as it appears on the wire. The name is not checked
/// here; unknown names are dropped at dispatch time, never rejected.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

/// One assistant turn: the text to speak aloud, an optional visual
/// effect to trigger, and whether the conversation is over. This is the
/// single contract both the model adapter and the offline script must
/// satisfy.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TurnResponse {
    pub say: String,
    #[serde(default)]
    pub tool: Option<ToolCall>,
    #[serde(default)]
    pub end_conversation: bool,
}

impl TurnResponse {
    pub fn plain(say: impl Into<String>) -> Self {
        Self {
            say: say.into(),
            tool: None,
            end_conversation: false,
        }
    }

    /// Spoken when the model (or the server) could not be reached.
    pub fn say_again() -> Self {
        Self::plain("Oops! My brain got a little tangled. Can you say that again?")
    }

    /// Spoken when something unexpected broke server-side.
    pub fn dizzy() -> Self {
        Self::plain("Oops, I got a little dizzy! Let's try again!")
    }

    /// Spoken when the request itself was malformed.
    pub fn garbled() -> Self {
        Self::plain("Oops! Something went wrong. Let's try again!")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let turn: TurnResponse = serde_json::from_str(r#"{"say":"Wow!"}"#).unwrap();
        assert_eq!(turn.say, "Wow!");
        assert!(turn.tool.is_none());
        assert!(!turn.end_conversation);
    }

    #[test]
    fn end_conversation_is_camel_case_on_the_wire() {
        let turn = TurnResponse {
            say: "Bye bye, superstar!".into(),
            tool: None,
            end_conversation: true,
        };
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json["endConversation"], true);
    }

    #[test]
    fn tool_call_without_arguments_parses() {
        let turn: TurnResponse =
            serde_json::from_str(r#"{"say":"Look!","tool":{"name":"addRewardStar"}}"#).unwrap();
        let tool = turn.tool.unwrap();
        assert_eq!(tool.name, "addRewardStar");
        assert!(tool.arguments.is_null());
    }

    #[test]
    fn missing_say_is_an_error() {
        let res: Result<TurnResponse, _> = serde_json::from_str(r#"{"tool":null}"#);
        assert!(res.is_err());
    }
}
