//! Tool registry, dispatcher, and the built-in booking tools.
//!
//! Tools are the only way the model mutates session state: a successful
//! result's recognized keys are folded into stage data by the orchestrator.
//! The built-ins here are mock collaborators (regex ticket extraction, a
//! static lounge catalog, an in-memory membership ledger) behind the same
//! handler trait a production integration would implement.

use std::sync::Arc;

use async_trait::async_trait;
use concierge_protocol::{BookingStage, ToolCall, ToolResult, ToolSpec, UserId};
use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, instrument, warn};

pub mod flight;
pub mod lounge;
pub mod membership;

pub use flight::ExtractFlightInfo;
pub use lounge::{BookLounge, GetAvailableLounges, LoungeCatalog, StoreLoungeInfo};
pub use membership::{CheckMembershipPoints, MembershipLedger};

/// Per-dispatch context injected by the orchestrator, not the model.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub user_id: UserId,
    /// Text of a document the user attached to the message (e.g. a ticket
    /// scan), made available to the extraction tool.
    pub attachment: Option<String>,
}

impl ToolContext {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            attachment: None,
        }
    }

    pub fn with_attachment(mut self, attachment: impl Into<String>) -> Self {
        self.attachment = Some(attachment.into());
        self
    }
}

/// One callable tool: a spec the model sees and an async implementation.
///
/// Implementations return a failed [`ToolResult`] for domain errors; they do
/// not propagate `Err` upward, so a misbehaving tool can never abort the
/// exchange.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn spec(&self) -> ToolSpec;
    async fn invoke(&self, context: &ToolContext, input: &Value) -> ToolResult;
}

/// Name-keyed tool collection with stable iteration order.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: IndexMap<String, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) {
        self.tools.insert(handler.spec().name, handler);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn ToolHandler>> {
        self.tools.get(name)
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.values().map(|handler| handler.spec()).collect()
    }

    /// Specs for the tools enabled in `stage`, in the stage directory's
    /// order. Names the registry does not know are skipped.
    pub fn specs_for_stage(&self, stage: BookingStage) -> Vec<ToolSpec> {
        stage
            .tool_names()
            .iter()
            .filter_map(|name| self.get(name))
            .map(|handler| handler.spec())
            .collect()
    }

    /// Registry pre-loaded with the five booking tools.
    pub fn with_booking_tools(
        catalog: Arc<LoungeCatalog>,
        ledger: Arc<MembershipLedger>,
    ) -> Self {
        let mut registry = Self::default();
        registry.register(Arc::new(ExtractFlightInfo::new()));
        registry.register(Arc::new(GetAvailableLounges::new(catalog.clone())));
        registry.register(Arc::new(StoreLoungeInfo::new(catalog.clone())));
        registry.register(Arc::new(BookLounge::new(catalog, ledger.clone())));
        registry.register(Arc::new(CheckMembershipPoints::new(ledger)));
        registry
    }
}

/// Resolves model-requested tool calls against the registry and runs them.
#[derive(Clone)]
pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
}

impl ToolDispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> Arc<ToolRegistry> {
        self.registry.clone()
    }

    /// Run one tool call. An unknown tool name yields a failed result, never
    /// a panic or an aborted exchange.
    #[instrument(
        skip(self, context, call),
        fields(tool = %call.tool_name, user_id = %context.user_id)
    )]
    pub async fn dispatch(&self, context: &ToolContext, call: &ToolCall) -> ToolResult {
        let Some(handler) = self.registry.get(&call.tool_name) else {
            warn!("unknown tool requested");
            return ToolResult::fail(format!("unknown tool: {}", call.tool_name));
        };
        let result = handler.invoke(context, &call.input).await;
        if result.success {
            debug!("tool execution succeeded");
        } else {
            warn!(
                error = result.error.as_deref().unwrap_or("unspecified"),
                "tool execution failed"
            );
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn booking_registry() -> ToolRegistry {
        ToolRegistry::with_booking_tools(
            Arc::new(LoungeCatalog::builtin()),
            Arc::new(MembershipLedger::with_demo_members()),
        )
    }

    #[test]
    fn booking_registry_exposes_all_five_tools() {
        let registry = booking_registry();
        let names: Vec<String> = registry
            .specs()
            .into_iter()
            .map(|spec| spec.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "extract_flight_info",
                "get_available_lounges",
                "store_lounge_info",
                "book_lounge",
                "check_membership_points",
            ]
        );
    }

    #[test]
    fn specs_for_stage_follow_the_stage_directory() {
        let registry = booking_registry();
        assert!(
            registry
                .specs_for_stage(BookingStage::InitialEngagement)
                .is_empty()
        );
        let recommendation: Vec<String> = registry
            .specs_for_stage(BookingStage::LoungeRecommendation)
            .into_iter()
            .map(|spec| spec.name)
            .collect();
        assert_eq!(
            recommendation,
            vec!["get_available_lounges", "store_lounge_info"]
        );
        let execution: Vec<String> = registry
            .specs_for_stage(BookingStage::BookingExecution)
            .into_iter()
            .map(|spec| spec.name)
            .collect();
        assert_eq!(execution, vec!["book_lounge"]);
    }

    #[tokio::test]
    async fn dispatch_of_unknown_tool_is_a_failed_result() {
        let dispatcher = ToolDispatcher::new(Arc::new(booking_registry()));
        let context = ToolContext::new(UserId::from_string("demo1"));
        let call = ToolCall::new("summon_dragon", json!({}));
        let result = dispatcher.dispatch(&context, &call).await;
        assert!(!result.success);
        assert!(result.error.as_deref().unwrap_or("").contains("summon_dragon"));
    }
}
