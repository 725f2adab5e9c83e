//! Canonical runtime ports for the booking core's collaborators.
//!
//! These traits are the only allowed runtime boundary between the
//! orchestrator and external implementations (model providers, session
//! stores, profile sources). No wire format is owned here.
//!
//! Object-safety note: traits use `async-trait` for async dyn-dispatch.

use crate::error::EngineResult;
use crate::ids::UserId;
use crate::profile::MemberProfile;
use crate::session::{ChatMessage, ChatSession};
use crate::tool::{ToolCall, ToolSpec};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single model round-trip request: message, system prompt, contextual
/// fields, and the tools enabled for the session's current stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub prompt: String,
    /// Free-form context: user profile, stage, stage-data snapshot, whether
    /// an image was supplied, prior tool results within this exchange.
    pub context: Value,
    pub temperature: f32,
    pub max_tokens: u32,
    #[serde(default)]
    pub tools: Vec<ToolSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CompletionContent {
    Text { text: String },
    ToolUse { call: ToolCall },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    Other(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    #[serde(default)]
    pub content: Vec<CompletionContent>,
    pub stop_reason: StopReason,
}

impl Completion {
    /// Plain-text completion with no tool calls.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![CompletionContent::Text { text: text.into() }],
            stop_reason: StopReason::EndTurn,
        }
    }

    pub fn tool_calls(&self) -> impl Iterator<Item = &ToolCall> {
        self.content.iter().filter_map(|item| match item {
            CompletionContent::ToolUse { call } => Some(call),
            CompletionContent::Text { .. } => None,
        })
    }
}

#[async_trait]
pub trait ModelProviderPort: Send + Sync {
    async fn generate(&self, request: CompletionRequest) -> EngineResult<Completion>;
}

/// Persistence contract for sessions and message history.
///
/// The serialized form must round-trip the current stage (by name), all four
/// stage-data fields, and the full message history.
#[async_trait]
pub trait SessionStorePort: Send + Sync {
    async fn load_latest(&self, user_id: &UserId) -> EngineResult<Option<ChatSession>>;
    async fn save_session(&self, session: &ChatSession) -> EngineResult<()>;
    async fn save_messages(
        &self,
        session: &ChatSession,
        new_messages: &[ChatMessage],
    ) -> EngineResult<()>;
}

/// Profile lookup, consumed only for model-context enrichment.
#[async_trait]
pub trait ProfilePort: Send + Sync {
    async fn get_profile(&self, user_id: &UserId) -> EngineResult<Option<MemberProfile>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn completion_text_has_no_tool_calls() {
        let completion = Completion::text("hello");
        assert_eq!(completion.tool_calls().count(), 0);
        assert_eq!(completion.stop_reason, StopReason::EndTurn);
    }

    #[test]
    fn completion_content_serde_roundtrip() {
        let completion = Completion {
            content: vec![
                CompletionContent::Text {
                    text: "checking availability".into(),
                },
                CompletionContent::ToolUse {
                    call: ToolCall::new("get_available_lounges", json!({"airport_code": "SZX"})),
                },
            ],
            stop_reason: StopReason::ToolUse,
        };
        let json = serde_json::to_string(&completion).unwrap();
        assert!(json.contains("\"type\":\"tool_use\""));
        let back: Completion = serde_json::from_str(&json).unwrap();
        assert_eq!(back.tool_calls().count(), 1);
    }
}
