//! Message-processing orchestrator.
//!
//! `ConciergeRuntime` owns the conversation lifecycle: it resolves the
//! per-user session, applies the stage-transition engine around model
//! dispatch, runs the bounded tool-use loop, folds successful tool results
//! into stage data, and fires persistence without blocking the reply.
//!
//! `process` is infallible by contract: every internal failure becomes a
//! user-facing outcome and the session stays usable for the next message.
//! Calls for the same user are serialized by a per-user async lock; distinct
//! users proceed fully in parallel.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use concierge_engine as engine;
use concierge_protocol::{
    BookingStage, ChatMessage, ChatSession, Completion, CompletionContent, CompletionRequest,
    EngineError, ModelProviderPort, ProfilePort, SessionStorePort, ToolResult, UserId,
};
use concierge_store::MemorySessionStore;
use concierge_tools::{LoungeCatalog, MembershipLedger, ToolContext, ToolDispatcher, ToolRegistry};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tracing::{debug, info, instrument, warn};

const DEFAULT_SYSTEM_PROMPT: &str = "You are a courteous airport concierge helping premium \
    members book VIP lounge access. Guide the conversation through collecting flight details, \
    recommending lounges, confirming the member's choice, executing the booking, and \
    post-booking service. Use the provided tools when they are available, keep replies short, \
    and address the member by name in their preferred language.";

const PROCESSING_ERROR_RESPONSE: &str = "I apologize, but I encountered an error processing \
    your request. Please try again or contact your account manager for assistance.";

const GREETING_ERROR_RESPONSE: &str = "An error occurred. Please try again.";

fn unavailable_service_response(service: &str) -> String {
    format!(
        "I apologize, but the {service} service is not yet available. Currently, I can only \
         assist with Lounge bookings. Please select the Lounge service if you'd like to book \
         an airport lounge."
    )
}

fn completion_text(completion: &Completion) -> String {
    completion
        .content
        .iter()
        .filter_map(|item| match item {
            CompletionContent::Text { text } => Some(text.as_str()),
            CompletionContent::ToolUse { .. } => None,
        })
        .collect()
}

/// Orchestrator tuning knobs.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// The only service the runtime handles; anything else hits the guard.
    pub service: String,
    /// Upper bound on model rounds within one exchange.
    pub max_tool_rounds: u32,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Greetings are capped shorter than regular replies.
    pub greeting_max_tokens: u32,
    pub system_prompt: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            service: "Lounge".to_owned(),
            max_tool_rounds: 5,
            temperature: 0.7,
            max_tokens: 1024,
            greeting_max_tokens: 200,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_owned(),
        }
    }
}

/// The result of one processed message.
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub response: String,
    pub tool_results: Vec<ToolResult>,
    pub stage: BookingStage,
    pub stage_number: u8,
}

impl ProcessOutcome {
    fn at_stage(response: String, tool_results: Vec<ToolResult>, stage: BookingStage) -> Self {
        Self {
            response,
            tool_results,
            stage,
            stage_number: stage.ordinal(),
        }
    }
}

/// Builder facade wiring the runtime's collaborators. Only the model
/// provider is required; everything else defaults to the in-memory mocks.
pub struct ConciergeBuilder {
    config: RuntimeConfig,
    model: Arc<dyn ModelProviderPort>,
    store: Option<Arc<dyn SessionStorePort>>,
    profiles: Option<Arc<dyn ProfilePort>>,
    registry: Option<Arc<ToolRegistry>>,
    catalog: Option<Arc<LoungeCatalog>>,
    ledger: Option<Arc<MembershipLedger>>,
}

impl ConciergeBuilder {
    pub fn new(model: Arc<dyn ModelProviderPort>) -> Self {
        Self {
            config: RuntimeConfig::default(),
            model,
            store: None,
            profiles: None,
            registry: None,
            catalog: None,
            ledger: None,
        }
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(mut self, store: Arc<dyn SessionStorePort>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn profiles(mut self, profiles: Arc<dyn ProfilePort>) -> Self {
        self.profiles = Some(profiles);
        self
    }

    pub fn registry(mut self, registry: Arc<ToolRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn catalog(mut self, catalog: Arc<LoungeCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn ledger(mut self, ledger: Arc<MembershipLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn build(self) -> ConciergeRuntime {
        let ledger = self
            .ledger
            .unwrap_or_else(|| Arc::new(MembershipLedger::with_demo_members()));
        let catalog = self
            .catalog
            .unwrap_or_else(|| Arc::new(LoungeCatalog::builtin()));
        let registry = self.registry.unwrap_or_else(|| {
            Arc::new(ToolRegistry::with_booking_tools(catalog, ledger.clone()))
        });
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemorySessionStore::new()));
        let profiles = self
            .profiles
            .unwrap_or_else(|| ledger.clone() as Arc<dyn ProfilePort>);

        ConciergeRuntime {
            config: self.config,
            model: self.model,
            dispatcher: ToolDispatcher::new(registry),
            store,
            profiles,
            ledger,
            sessions: Mutex::new(HashMap::new()),
        }
    }
}

/// How one exchange's model/tool loop ended.
enum ExchangeEnd {
    /// A round produced no tool calls; the accumulated text is the reply.
    Completed,
    /// A tool returned a failed result; the exchange degrades immediately.
    ToolFailed(String),
    /// The round bound was exhausted while tools kept being requested.
    Exhausted,
    /// The model provider itself failed.
    ModelFailed(EngineError),
}

pub struct ConciergeRuntime {
    config: RuntimeConfig,
    model: Arc<dyn ModelProviderPort>,
    dispatcher: ToolDispatcher,
    store: Arc<dyn SessionStorePort>,
    profiles: Arc<dyn ProfilePort>,
    ledger: Arc<MembershipLedger>,
    /// Active session handles by user id. The outer lock is held only to
    /// resolve a handle; the inner async lock serializes a user's exchanges.
    sessions: Mutex<HashMap<String, Arc<tokio::sync::Mutex<ChatSession>>>>,
}

impl ConciergeRuntime {
    pub fn builder(model: Arc<dyn ModelProviderPort>) -> ConciergeBuilder {
        ConciergeBuilder::new(model)
    }

    /// The membership ledger backing the built-in tools, for point and
    /// profile display.
    pub fn membership(&self) -> Arc<MembershipLedger> {
        self.ledger.clone()
    }

    /// Snapshot of the user's current session, creating one if needed.
    pub async fn get_or_create_session(&self, user_id: &UserId) -> ChatSession {
        let handle = self.session_handle(user_id).await;
        let session = handle.lock().await;
        session.clone()
    }

    /// Drop the in-memory handle only; persisted history is untouched.
    pub fn clear_session(&self, user_id: &UserId) {
        self.sessions.lock().remove(user_id.as_str());
    }

    /// Generate the opening assistant message for a fresh conversation.
    /// Runs without tools and with the shorter greeting token cap.
    #[instrument(skip(self), fields(user_id = %user_id, service))]
    pub async fn start_chat(&self, user_id: &UserId, service: &str) -> ProcessOutcome {
        if service != self.config.service {
            let stage = self.active_stage(user_id).await;
            return ProcessOutcome::at_stage(
                unavailable_service_response(service),
                Vec::new(),
                stage,
            );
        }

        let handle = self.session_handle(user_id).await;
        let mut session = handle.lock().await;

        let context = json!({
            "user_profile": self.profile_context(user_id).await,
            "service": format!("{service} booking"),
            "current_stage": session.current_stage.label(),
            "session_state": {
                "stage_data": session.stage_data,
                "is_new_session": session.messages.is_empty(),
            },
        });
        let request = CompletionRequest {
            system_prompt: self.config.system_prompt.clone(),
            prompt: format!(
                "It is {} at this moment, let's begin our conversation.",
                Utc::now()
            ),
            context,
            temperature: self.config.temperature,
            max_tokens: self.config.greeting_max_tokens,
            tools: Vec::new(),
        };

        match self.model.generate(request).await {
            Ok(completion) => {
                let greeting = completion_text(&completion);
                let message = ChatMessage::assistant(greeting.clone());
                session.push_message(message.clone());
                self.spawn_persist(session.clone(), vec![message]);
                info!(session_id = %session.session_id, "chat started");
                ProcessOutcome::at_stage(greeting, Vec::new(), session.current_stage)
            }
            Err(error) => {
                warn!(%error, "greeting generation failed");
                ProcessOutcome::at_stage(
                    GREETING_ERROR_RESPONSE.to_owned(),
                    Vec::new(),
                    session.current_stage,
                )
            }
        }
    }

    /// Process one user message end to end.
    ///
    /// Never returns an error: guard rejections, tool failures, round
    /// exhaustion, and model failures all surface as a reply. On a model
    /// failure the session's stage is restored to its pre-message value.
    #[instrument(
        skip(self, message, attachment),
        fields(
            user_id = %user_id,
            service,
            message_len = message.len(),
            has_attachment = attachment.is_some()
        )
    )]
    pub async fn process(
        &self,
        user_id: &UserId,
        message: &str,
        service: &str,
        attachment: Option<String>,
    ) -> ProcessOutcome {
        if service != self.config.service {
            let stage = self.active_stage(user_id).await;
            return ProcessOutcome::at_stage(
                unavailable_service_response(service),
                Vec::new(),
                stage,
            );
        }

        let handle = self.session_handle(user_id).await;
        let mut session = handle.lock().await;
        let entry_stage = session.current_stage;
        debug!(session_id = %session.session_id, stage = %entry_stage, "processing message");

        // Tool selection for the first round uses the stage the message
        // itself produces, before any tool runs.
        engine::apply(&mut session, message);

        let tool_context = ToolContext {
            user_id: user_id.clone(),
            attachment,
        };
        let mut context = json!({
            "user_message": message,
            "service_type": service,
            "user_profile": self.profile_context(user_id).await,
            "has_image": tool_context.attachment.is_some(),
            "session_state": {
                "current_stage": session.current_stage.label(),
                "stage_data": session.stage_data,
            },
        });

        let mut response_text = String::new();
        let mut tool_results: Vec<ToolResult> = Vec::new();
        let mut last_tool: Option<ToolResult> = None;
        let mut rounds = 0_u32;

        let end = loop {
            if rounds >= self.config.max_tool_rounds {
                break ExchangeEnd::Exhausted;
            }
            rounds += 1;

            if let Some(result) = last_tool.as_ref()
                && let Some(object) = context.as_object_mut()
            {
                object.insert(
                    "tool_result".to_owned(),
                    serde_json::to_value(result).unwrap_or(Value::Null),
                );
            }

            let request = CompletionRequest {
                system_prompt: self.config.system_prompt.clone(),
                prompt: format!("Current stage: {}", session.current_stage.label()),
                context: context.clone(),
                temperature: self.config.temperature,
                max_tokens: self.config.max_tokens,
                tools: self
                    .dispatcher
                    .registry()
                    .specs_for_stage(session.current_stage),
            };

            let completion = match self.model.generate(request).await {
                Ok(completion) => completion,
                Err(error) => break ExchangeEnd::ModelFailed(error),
            };

            let mut ran_tool = false;
            let mut failure: Option<String> = None;
            for item in completion.content {
                match item {
                    CompletionContent::Text { text } => response_text.push_str(&text),
                    CompletionContent::ToolUse { call } => {
                        ran_tool = true;
                        let result = self.dispatcher.dispatch(&tool_context, &call).await;
                        if result.success {
                            let updates = result.state_updates();
                            if !updates.is_empty() {
                                let data = session.stage_data_mut();
                                for update in updates {
                                    update.apply(data);
                                }
                                // Later rounds select tools for the stage
                                // the new data produces.
                                engine::apply(&mut session, message);
                            }
                            last_tool = Some(result.clone());
                        } else if failure.is_none() {
                            failure = Some(
                                result
                                    .error
                                    .clone()
                                    .unwrap_or_else(|| "tool execution failed".to_owned()),
                            );
                        }
                        tool_results.push(result);
                    }
                }
            }

            if let Some(error) = failure {
                break ExchangeEnd::ToolFailed(error);
            }
            if !ran_tool {
                break ExchangeEnd::Completed;
            }
        };

        let response = match end {
            ExchangeEnd::Completed => response_text,
            ExchangeEnd::ToolFailed(error) => {
                format!("I apologize, but I encountered an error: {error}")
            }
            ExchangeEnd::Exhausted => {
                warn!(
                    session_id = %session.session_id,
                    limit = self.config.max_tool_rounds,
                    "tool-use round bound exhausted"
                );
                PROCESSING_ERROR_RESPONSE.to_owned()
            }
            ExchangeEnd::ModelFailed(error) => {
                warn!(session_id = %session.session_id, %error, "model generation failed");
                session.update_stage(entry_stage);
                PROCESSING_ERROR_RESPONSE.to_owned()
            }
        };

        let user_message = ChatMessage::user(message);
        let assistant_message = ChatMessage::assistant(response.clone());
        session.push_message(user_message.clone());
        session.push_message(assistant_message.clone());
        self.spawn_persist(session.clone(), vec![user_message, assistant_message]);

        let stage = session.current_stage;
        info!(
            session_id = %session.session_id,
            stage = %stage,
            tool_count = tool_results.len(),
            "message processed"
        );
        ProcessOutcome::at_stage(response, tool_results, stage)
    }

    /// Resolve the user's session handle: the active map first, then the
    /// store. A persisted completed session starts a fresh cycle instead of
    /// being resumed.
    async fn session_handle(&self, user_id: &UserId) -> Arc<tokio::sync::Mutex<ChatSession>> {
        if let Some(handle) = self.sessions.lock().get(user_id.as_str()) {
            return handle.clone();
        }

        let persisted = match self.store.load_latest(user_id).await {
            Ok(Some(session)) if !session.is_completed => Some(session),
            Ok(_) => None,
            Err(error) => {
                warn!(user_id = %user_id, %error, "failed loading persisted session");
                None
            }
        };
        let session = match persisted {
            Some(session) => {
                debug!(session_id = %session.session_id, "resuming persisted session");
                session
            }
            None => {
                let session = ChatSession::new(user_id.clone());
                info!(session_id = %session.session_id, "created new session");
                self.spawn_persist(session.clone(), Vec::new());
                session
            }
        };

        self.sessions
            .lock()
            .entry(user_id.as_str().to_owned())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(session)))
            .clone()
    }

    /// Current stage of the user's active session, without creating one.
    async fn active_stage(&self, user_id: &UserId) -> BookingStage {
        let handle = self.sessions.lock().get(user_id.as_str()).cloned();
        match handle {
            Some(handle) => handle.lock().await.current_stage,
            None => BookingStage::InitialEngagement,
        }
    }

    async fn profile_context(&self, user_id: &UserId) -> Value {
        match self.profiles.get_profile(user_id).await {
            Ok(Some(profile)) => serde_json::to_value(&profile).unwrap_or(Value::Null),
            Ok(None) => Value::Null,
            Err(error) => {
                warn!(user_id = %user_id, %error, "profile lookup failed");
                Value::Null
            }
        }
    }

    /// Fire-and-forget persistence. The reply never waits on the store;
    /// failures are logged and swallowed.
    fn spawn_persist(&self, session: ChatSession, new_messages: Vec<ChatMessage>) {
        let store = self.store.clone();
        let _ = tokio::spawn(async move {
            if let Err(error) = store.save_session(&session).await {
                warn!(
                    session_id = %session.session_id,
                    %error,
                    "failed persisting session snapshot"
                );
            }
            if !new_messages.is_empty()
                && let Err(error) = store.save_messages(&session, &new_messages).await
            {
                warn!(
                    session_id = %session.session_id,
                    %error,
                    "failed persisting messages"
                );
            }
        });
    }
}
