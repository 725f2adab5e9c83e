//! Tool types: specs, calls, results, and the typed state-update view.

use crate::session::{FlightInfo, LoungeInfo, OrderInfo, StageData};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool the model may request, described by name and input schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    #[serde(default)]
    pub required: Vec<String>,
}

/// A tool invocation requested by the model. The call id is stable so the
/// eventual result can be correlated back into the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub call_id: String,
    pub tool_name: String,
    pub input: Value,
}

impl ToolCall {
    pub fn new(tool_name: impl Into<String>, input: Value) -> Self {
        Self {
            call_id: uuid::Uuid::new_v4().to_string(),
            tool_name: tool_name.into(),
            input,
        }
    }
}

/// Structured outcome of a tool execution.
///
/// A failed result carries an error string and contributes no state update;
/// it is surfaced to the user, never silently dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }

    /// The recognized subset of this result's data, as typed state updates.
    ///
    /// Only the three recognized keys participate; unrecognized keys are
    /// ignored here (they may still surface as plain response content).
    /// Failed results yield nothing. Confirmation status is never set by a
    /// tool result; only the transition engine's keyword match does that.
    pub fn state_updates(&self) -> Vec<StateUpdate> {
        let mut updates = Vec::new();
        if !self.success {
            return updates;
        }
        let Some(data) = self.data.as_ref().and_then(Value::as_object) else {
            return updates;
        };
        if let Some(value) = data.get("flight_info")
            && let Ok(info) = serde_json::from_value::<FlightInfo>(value.clone())
        {
            updates.push(StateUpdate::Flight(info));
        }
        if let Some(value) = data.get("lounge_info")
            && let Ok(info) = serde_json::from_value::<LoungeInfo>(value.clone())
        {
            updates.push(StateUpdate::Lounge(info));
        }
        if let Some(value) = data.get("order_info")
            && let Ok(info) = serde_json::from_value::<OrderInfo>(value.clone())
        {
            updates.push(StateUpdate::Order(info));
        }
        updates
    }
}

/// One recognized tool-result field, ready to fold into session stage data.
#[derive(Debug, Clone, PartialEq)]
pub enum StateUpdate {
    Flight(FlightInfo),
    Lounge(LoungeInfo),
    Order(OrderInfo),
}

impl StateUpdate {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Flight(_) => "flight_info",
            Self::Lounge(_) => "lounge_info",
            Self::Order(_) => "order_info",
        }
    }

    /// Overwrite the corresponding stage-data field. Updates replace, not
    /// merge: the latest tool result for a key wins wholesale.
    pub fn apply(self, data: &mut StageData) {
        match self {
            Self::Flight(info) => data.flight_info = Some(info),
            Self::Lounge(info) => data.lounge_info = Some(info),
            Self::Order(info) => data.order_info = Some(info),
        }
    }
}
