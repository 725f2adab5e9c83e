//! # concierge-protocol — Booking Core Contract
//!
//! Shared types, the stage directory, and the trait interfaces that every
//! concierge crate depends on.
//!
//! It is intentionally dependency-light (no runtime deps like tokio or a
//! database driver) so it can be used as a pure contract crate.
//!
//! ## Module Overview
//!
//! - [`ids`] — Typed ID wrappers (SessionId, UserId, BookingId, ToolRunId)
//! - [`stage`] — BookingStage and the static stage directory
//! - [`session`] — ChatSession, ChatMessage, StageData and typed info records
//! - [`tool`] — ToolSpec, ToolCall, ToolResult, StateUpdate
//! - [`lounge`] — Lounge catalog and booking records
//! - [`profile`] — MemberProfile
//! - [`ports`] — Runtime boundary ports (model provider, session store, profiles)
//! - [`error`] — EngineError, EngineResult

pub mod error;
pub mod ids;
pub mod lounge;
pub mod ports;
pub mod profile;
pub mod session;
pub mod stage;
pub mod tool;

// Re-export the most commonly used types at the crate root.
pub use error::{EngineError, EngineResult};
pub use ids::{BookingId, SessionId, ToolRunId, UserId};
pub use lounge::{BookingStatus, Lounge, LoungeBooking};
pub use ports::{
    Completion, CompletionContent, CompletionRequest, ModelProviderPort, ProfilePort,
    SessionStorePort, StopReason,
};
pub use profile::MemberProfile;
pub use session::{ChatMessage, ChatSession, FlightInfo, LoungeInfo, MessageRole, OrderInfo, StageData};
pub use stage::BookingStage;
pub use tool::{StateUpdate, ToolCall, ToolResult, ToolSpec};
