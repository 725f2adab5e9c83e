//! Stage-transition engine for the booking conversation.
//!
//! Given the current stage, the session's stage data, and the latest message
//! text, the engine computes the next stage. Rules are evaluated only for the
//! current stage, so a single call can never skip forward more than one step.
//! When data required by an earlier stage is found missing, the engine
//! regresses to information collection; that is consistency repair, not an
//! error, and is logged as a warning.
//!
//! The engine is pure in-memory computation with no suspension points. It is
//! invoked twice per message cycle: once before model dispatch (to pick
//! tools) and once after tool-result folding. Both calls are idempotent
//! given the same inputs.

use concierge_protocol::{BookingStage, ChatSession};
use tracing::{debug, info, warn};

/// Keywords that, from the confirmation stage, advance to booking execution.
/// Matched case-insensitively as substrings of the message.
pub const CONFIRMATION_KEYWORDS: [&str; 6] = ["ok", "confirm", "yes", "book", "proceed", "go ahead"];

/// Keywords that, from post-booking, complete the cycle and reset to the
/// initial stage.
pub const FAREWELL_KEYWORDS: [&str; 5] = ["thank", "bye", "goodbye", "done", "finished"];

fn contains_any(message: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| message.contains(keyword))
}

/// Compute the next stage for `session` given the latest message text.
///
/// Side effects are limited to what the rules demand: the confirmation
/// keyword match records `confirmation_status`, and the farewell path clears
/// stage data and marks the session completed. The session's `current_stage`
/// itself is not touched here; use [`apply`] to record the transition.
pub fn evaluate(session: &mut ChatSession, message: &str) -> BookingStage {
    let message = message.to_lowercase();
    let current = session.current_stage;

    match current {
        BookingStage::InitialEngagement => {
            // An empty message never advances the initial stage.
            if message.trim().is_empty() {
                current
            } else {
                BookingStage::InfoCollection
            }
        }
        BookingStage::InfoCollection => {
            if session.flight_info().is_some() {
                BookingStage::LoungeRecommendation
            } else {
                current
            }
        }
        BookingStage::LoungeRecommendation => {
            if session.flight_info().is_none() {
                BookingStage::InfoCollection
            } else if session.lounge_info().is_some() {
                BookingStage::Confirmation
            } else {
                current
            }
        }
        BookingStage::Confirmation => {
            if session.flight_info().is_none() || session.lounge_info().is_none() {
                BookingStage::InfoCollection
            } else if contains_any(&message, &CONFIRMATION_KEYWORDS) {
                session.stage_data_mut().confirmation_status = true;
                BookingStage::BookingExecution
            } else {
                current
            }
        }
        BookingStage::BookingExecution => {
            if session.flight_info().is_none() || session.lounge_info().is_none() {
                BookingStage::InfoCollection
            } else if session.order_info().is_some() {
                BookingStage::PostBooking
            } else {
                current
            }
        }
        BookingStage::PostBooking => {
            if contains_any(&message, &FAREWELL_KEYWORDS) {
                session.reset_stage_data();
                session.mark_completed();
                BookingStage::InitialEngagement
            } else if session.flight_info().is_none()
                || session.lounge_info().is_none()
                || session.order_info().is_none()
            {
                BookingStage::InfoCollection
            } else {
                current
            }
        }
    }
}

/// Evaluate and record the transition on the session. Returns whether the
/// stage changed.
pub fn apply(session: &mut ChatSession, message: &str) -> bool {
    let previous = session.current_stage;
    let next = evaluate(session, message);
    if next == previous {
        debug!(stage = %previous, "stage unchanged");
        return false;
    }

    let regressed =
        next == BookingStage::InfoCollection && next.ordinal() < previous.ordinal();
    if regressed {
        warn!(
            session_id = %session.session_id,
            from = %previous,
            to = %next,
            "required stage data missing; regressing to information collection"
        );
    } else {
        info!(
            session_id = %session.session_id,
            from = %previous,
            to = %next,
            "stage transition"
        );
    }
    session.update_stage(next);
    true
}
