pub mod client;
pub mod conversation;
pub mod effects;
pub mod speech;

pub use client::{ApiClient, UploadResponse};
pub use conversation::Conversation;
pub use effects::{EffectSurface, TerminalSurface, ToolDispatcher};
