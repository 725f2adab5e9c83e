//! The six booking stages and the static stage directory.
//!
//! Stages are strictly ordered; forward progress is one step at a time and
//! is driven by the transition engine, never by this directory. Everything
//! here is pure and safe to share across tasks without locking.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One phase of the booking conversation.
///
/// Ordinal position (1-based) derives from declaration order and is used for
/// display and "has this stage been reached" comparisons.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStage {
    #[default]
    InitialEngagement,
    InfoCollection,
    LoungeRecommendation,
    Confirmation,
    BookingExecution,
    PostBooking,
}

/// All stages in declaration order.
pub const ALL_STAGES: [BookingStage; 6] = [
    BookingStage::InitialEngagement,
    BookingStage::InfoCollection,
    BookingStage::LoungeRecommendation,
    BookingStage::Confirmation,
    BookingStage::BookingExecution,
    BookingStage::PostBooking,
];

impl BookingStage {
    /// Human-readable label used in UI and model context.
    pub fn label(&self) -> &'static str {
        match self {
            Self::InitialEngagement => "Initial Engagement",
            Self::InfoCollection => "Information Collection",
            Self::LoungeRecommendation => "Lounge Recommendation",
            Self::Confirmation => "Booking Confirmation",
            Self::BookingExecution => "Booking Execution",
            Self::PostBooking => "Post-Booking Service",
        }
    }

    /// 1-based ordinal derived from declaration order.
    pub fn ordinal(&self) -> u8 {
        match self {
            Self::InitialEngagement => 1,
            Self::InfoCollection => 2,
            Self::LoungeRecommendation => 3,
            Self::Confirmation => 4,
            Self::BookingExecution => 5,
            Self::PostBooking => 6,
        }
    }

    /// Look a stage up by ordinal. Out-of-range input clamps to
    /// `InitialEngagement`; this accessor never fails.
    pub fn from_ordinal(number: u8) -> Self {
        match number {
            2 => Self::InfoCollection,
            3 => Self::LoungeRecommendation,
            4 => Self::Confirmation,
            5 => Self::BookingExecution,
            6 => Self::PostBooking,
            _ => Self::InitialEngagement,
        }
    }

    /// Natural-language requirement for completing this stage. A prompt aid
    /// for the model, not machine-enforced.
    pub fn requirement(&self) -> &'static str {
        match self {
            Self::InitialEngagement => {
                "Respond to user's first message to move to information collection."
            }
            Self::InfoCollection => "Extract and store flight information to proceed.",
            Self::LoungeRecommendation => {
                "Search available lounges and store selected lounge information."
            }
            Self::Confirmation => "Get user's confirmation to proceed with booking.",
            Self::BookingExecution => "Complete the booking process and store order information.",
            Self::PostBooking => "Check membership points and provide post-booking service.",
        }
    }

    /// Names of the tools enabled while the conversation sits in this stage.
    /// The initial greeting runs without tools.
    pub fn tool_names(&self) -> &'static [&'static str] {
        match self {
            Self::InitialEngagement => &[],
            Self::InfoCollection => &["extract_flight_info"],
            Self::LoungeRecommendation => &["get_available_lounges", "store_lounge_info"],
            Self::Confirmation => &["store_lounge_info"],
            Self::BookingExecution => &["book_lounge"],
            Self::PostBooking => &["check_membership_points"],
        }
    }

    /// The immediately-next stage, if any.
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::PostBooking => None,
            other => Some(Self::from_ordinal(other.ordinal() + 1)),
        }
    }
}

impl fmt::Display for BookingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
