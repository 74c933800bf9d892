//! Conversation layer: the orchestrator, intent handlers and grounded reply
//! generation.

pub mod engine;
pub mod handlers;
pub mod reply;

pub use engine::{AssistantReply, AssistantRequest, Orchestrator};
pub use handlers::{HandlerReply, IntentHandlers, Turn};
pub use reply::{ReplyGenerator, ReplyRequest};
