//! Chat session aggregate: message history, current stage, and the
//! stage-scoped data bag that gates forward progress.

use crate::ids::{SessionId, UserId};
use crate::stage::BookingStage;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// One message in the conversation. Immutable once appended; history is only
/// dropped on explicit session clear.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Flight details extracted from a ticket or boarding pass.
///
/// Known fields are optional; anything else the extractor reports survives in
/// `extra` so the record round-trips whatever mapping a tool produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlightInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flight_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seat: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passenger_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The lounge the user selected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoungeInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub airport_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The executed booking.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lounge_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flight_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Per-session data gating stage advancement.
///
/// Invariant: advancing past a stage requires the corresponding field to be
/// populated; the transition engine treats a later stage's field going
/// missing as cause to regress to information collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flight_info: Option<FlightInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lounge_info: Option<LoungeInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_info: Option<OrderInfo>,
    #[serde(default)]
    pub confirmation_status: bool,
}

impl StageData {
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// The conversation aggregate. Sole owner of its stage data and message
/// list; collaborators read and write through its accessors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub session_id: SessionId,
    pub user_id: UserId,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub current_stage: BookingStage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_data: Option<StageData>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub is_completed: bool,
}

impl ChatSession {
    pub fn new(user_id: UserId) -> Self {
        Self {
            session_id: SessionId::new_uuid(),
            user_id,
            messages: Vec::new(),
            current_stage: BookingStage::InitialEngagement,
            stage_data: None,
            metadata: Map::new(),
            is_completed: false,
        }
    }

    /// Stage data, lazily initialized on first write.
    pub fn stage_data_mut(&mut self) -> &mut StageData {
        self.stage_data.get_or_insert_with(StageData::default)
    }

    pub fn flight_info(&self) -> Option<&FlightInfo> {
        self.stage_data.as_ref()?.flight_info.as_ref()
    }

    pub fn lounge_info(&self) -> Option<&LoungeInfo> {
        self.stage_data.as_ref()?.lounge_info.as_ref()
    }

    pub fn order_info(&self) -> Option<&OrderInfo> {
        self.stage_data.as_ref()?.order_info.as_ref()
    }

    /// Record a stage change and return its label and ordinal.
    pub fn update_stage(&mut self, new_stage: BookingStage) -> (&'static str, u8) {
        self.current_stage = new_stage;
        (new_stage.label(), new_stage.ordinal())
    }

    /// Drop all stage-scoped data, e.g. when a completed cycle resets.
    pub fn reset_stage_data(&mut self) {
        self.stage_data = None;
    }

    pub fn mark_completed(&mut self) {
        self.is_completed = true;
    }

    pub fn push_message(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_session_starts_at_initial_engagement() {
        let session = ChatSession::new(UserId::from_string("demo1"));
        assert_eq!(session.current_stage, BookingStage::InitialEngagement);
        assert!(session.stage_data.is_none());
        assert!(!session.is_completed);
        assert!(session.messages.is_empty());
    }

    #[test]
    fn stage_data_lazily_initialized() {
        let mut session = ChatSession::new(UserId::from_string("demo1"));
        assert!(session.flight_info().is_none());
        session.stage_data_mut().confirmation_status = true;
        assert!(session.stage_data.is_some());
        assert!(session.stage_data.as_ref().unwrap().confirmation_status);
    }

    #[test]
    fn reset_stage_data_drops_all_fields() {
        let mut session = ChatSession::new(UserId::from_string("demo1"));
        session.stage_data_mut().flight_info = Some(FlightInfo {
            flight_number: Some("CZ3456".into()),
            ..Default::default()
        });
        session.reset_stage_data();
        assert!(session.flight_info().is_none());
        assert!(session.lounge_info().is_none());
        assert!(session.order_info().is_none());
    }

    #[test]
    fn update_stage_returns_label_and_ordinal() {
        let mut session = ChatSession::new(UserId::from_string("demo1"));
        let (label, number) = session.update_stage(BookingStage::Confirmation);
        assert_eq!(label, "Booking Confirmation");
        assert_eq!(number, 4);
        assert_eq!(session.current_stage, BookingStage::Confirmation);
    }

    #[test]
    fn flight_info_preserves_unknown_fields() {
        let value = json!({
            "flight_number": "CZ3456",
            "gate": "B12"
        });
        let info: FlightInfo = serde_json::from_value(value).unwrap();
        assert_eq!(info.flight_number.as_deref(), Some("CZ3456"));
        assert_eq!(info.extra.get("gate"), Some(&json!("B12")));
        let back = serde_json::to_value(&info).unwrap();
        assert_eq!(back.get("gate"), Some(&json!("B12")));
    }

    #[test]
    fn session_serde_roundtrip_keeps_stage_and_data() {
        let mut session = ChatSession::new(UserId::from_string("demo1"));
        session.push_message(ChatMessage::user("hello"));
        session.push_message(ChatMessage::assistant("hi there"));
        session.update_stage(BookingStage::LoungeRecommendation);
        let data = session.stage_data_mut();
        data.flight_info = Some(FlightInfo {
            flight_number: Some("CZ3456".into()),
            ..Default::default()
        });
        data.confirmation_status = false;

        let json = serde_json::to_string(&session).unwrap();
        assert!(json.contains("\"lounge_recommendation\""));
        let back: ChatSession = serde_json::from_str(&json).unwrap();
        assert_eq!(back.current_stage, BookingStage::LoungeRecommendation);
        assert_eq!(back.messages.len(), 2);
        assert_eq!(
            back.flight_info().and_then(|f| f.flight_number.as_deref()),
            Some("CZ3456")
        );
    }
}
