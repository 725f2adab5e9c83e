//! Lounge catalog and booking records.

use crate::ids::{BookingId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

/// A catalog entry for an airport VIP lounge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lounge {
    pub id: String,
    pub name: String,
    pub airport_code: String,
    pub terminal: String,
    pub location_description: String,
    #[serde(default)]
    pub amenities: Vec<String>,
    pub opening_hours: String,
    /// Points deducted from the member ledger on booking.
    #[serde(default = "default_points")]
    pub points_required: u32,
    /// Catalog entries marked unavailable are excluded from search results.
    #[serde(default)]
    pub temporarily_unavailable: bool,
}

fn default_points() -> u32 {
    1
}

/// A confirmed lounge access booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoungeBooking {
    pub booking_id: BookingId,
    pub user_id: UserId,
    pub lounge_id: String,
    pub flight_number: String,
    pub booking_date: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub status: BookingStatus,
    pub points_used: u32,
}
