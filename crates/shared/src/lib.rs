pub mod message;
pub mod tools;
pub mod turn;

pub use message::{Message, Role};
pub use tools::ToolDirective;
pub use turn::{ToolCall, TurnResponse};
