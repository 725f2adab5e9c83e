//! Lounge catalog search, selection, and booking execution.
//!
//! The catalog is static mock data standing in for the airline's lounge
//! inventory. Booking deducts points from the membership ledger and yields
//! the order record the orchestrator folds into session state.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use concierge_protocol::{
    BookingId, BookingStatus, Lounge, LoungeBooking, ToolResult, ToolSpec, UserId,
};
use serde_json::{Value, json};
use tracing::info;

use crate::{ToolContext, ToolHandler};

/// Static lounge inventory keyed by case-insensitive lounge id.
#[derive(Debug, Clone)]
pub struct LoungeCatalog {
    lounges: Vec<Lounge>,
}

impl LoungeCatalog {
    pub fn with_lounges(lounges: Vec<Lounge>) -> Self {
        Self { lounges }
    }

    /// The built-in Shenzhen/Shanghai demo inventory.
    pub fn builtin() -> Self {
        Self::with_lounges(vec![
            Lounge {
                id: "szx_t3_joyee".to_owned(),
                name: "JOYEE VIP Lounge".to_owned(),
                airport_code: "SZX".to_owned(),
                terminal: "T3".to_owned(),
                location_description: "Departure hall, near gate 18".to_owned(),
                amenities: vec![
                    "WiFi".to_owned(),
                    "Buffet".to_owned(),
                    "Shower".to_owned(),
                    "Quiet Zone".to_owned(),
                ],
                opening_hours: "06:00-23:00".to_owned(),
                points_required: 1,
                temporarily_unavailable: false,
            },
            Lounge {
                id: "szx_t3_al".to_owned(),
                name: "Sky Pearl Lounge".to_owned(),
                airport_code: "SZX".to_owned(),
                terminal: "T3".to_owned(),
                location_description: "Satellite hall, third floor".to_owned(),
                amenities: vec!["WiFi".to_owned(), "Buffet".to_owned(), "Bar".to_owned()],
                opening_hours: "07:00-22:00".to_owned(),
                points_required: 1,
                temporarily_unavailable: false,
            },
            Lounge {
                id: "szx_t4_sc".to_owned(),
                name: "Star Club Lounge".to_owned(),
                airport_code: "SZX".to_owned(),
                terminal: "T4".to_owned(),
                location_description: "Airside, opposite gate 41".to_owned(),
                amenities: vec!["WiFi".to_owned(), "Shower".to_owned()],
                opening_hours: "06:30-22:30".to_owned(),
                points_required: 2,
                temporarily_unavailable: false,
            },
            Lounge {
                id: "pvg_t1_fl09".to_owned(),
                name: "First Class Lounge 09".to_owned(),
                airport_code: "PVG".to_owned(),
                terminal: "T1".to_owned(),
                location_description: "After security, mezzanine level".to_owned(),
                amenities: vec![
                    "WiFi".to_owned(),
                    "Buffet".to_owned(),
                    "Shower".to_owned(),
                    "Nap Room".to_owned(),
                ],
                opening_hours: "05:30-23:30".to_owned(),
                points_required: 2,
                temporarily_unavailable: false,
            },
            Lounge {
                id: "pvg_t2_vip".to_owned(),
                name: "Pudong International VIP Lounge".to_owned(),
                airport_code: "PVG".to_owned(),
                terminal: "T2".to_owned(),
                location_description: "Central concourse, second floor".to_owned(),
                amenities: vec!["WiFi".to_owned(), "Buffet".to_owned()],
                opening_hours: "06:00-22:00".to_owned(),
                points_required: 1,
                temporarily_unavailable: true,
            },
        ])
    }

    pub fn get(&self, lounge_id: &str) -> Option<&Lounge> {
        self.lounges
            .iter()
            .find(|lounge| lounge.id.eq_ignore_ascii_case(lounge_id))
    }

    /// Search by airport code (exact, case-insensitive) with optional
    /// terminal and amenity filters. Each requested amenity must match some
    /// catalog amenity as a case-insensitive substring. Temporarily
    /// unavailable lounges never appear in results.
    pub fn search(
        &self,
        airport_code: &str,
        terminal: Option<&str>,
        amenities: &[String],
    ) -> Vec<&Lounge> {
        self.lounges
            .iter()
            .filter(|lounge| !lounge.temporarily_unavailable)
            .filter(|lounge| lounge.airport_code.eq_ignore_ascii_case(airport_code))
            .filter(|lounge| match terminal {
                Some(terminal) => lounge
                    .terminal
                    .to_lowercase()
                    .contains(&terminal.to_lowercase()),
                None => true,
            })
            .filter(|lounge| {
                amenities.iter().all(|requested| {
                    let requested = requested.to_lowercase();
                    lounge
                        .amenities
                        .iter()
                        .any(|amenity| amenity.to_lowercase().contains(&requested))
                })
            })
            .collect()
    }
}

/// The `get_available_lounges` tool.
#[derive(Clone)]
pub struct GetAvailableLounges {
    catalog: Arc<LoungeCatalog>,
}

impl GetAvailableLounges {
    pub fn new(catalog: Arc<LoungeCatalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl ToolHandler for GetAvailableLounges {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "get_available_lounges".to_owned(),
            description:
                "Search for available airport VIP lounges by airport code, with optional \
                 filtering by terminal and amenities"
                    .to_owned(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "airport_code": {
                        "type": "string",
                        "description": "Three-letter IATA airport code (e.g. SZX, PVG)"
                    },
                    "terminal": {
                        "type": "string",
                        "description": "Optional terminal filter (e.g. T1, T3)"
                    },
                    "amenities": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Optional list of required amenities"
                    }
                }
            }),
            required: vec!["airport_code".to_owned()],
        }
    }

    async fn invoke(&self, _context: &ToolContext, input: &Value) -> ToolResult {
        let Some(airport_code) = input.get("airport_code").and_then(Value::as_str) else {
            return ToolResult::fail("get_available_lounges requires airport_code");
        };
        let terminal = input.get("terminal").and_then(Value::as_str);
        let amenities: Vec<String> = input
            .get("amenities")
            .and_then(Value::as_array)
            .map(|values| {
                values
                    .iter()
                    .filter_map(|value| value.as_str().map(ToOwned::to_owned))
                    .collect()
            })
            .unwrap_or_default();

        let lounges = self.catalog.search(airport_code, terminal, &amenities);
        ToolResult::ok(json!({ "lounges": lounges }))
    }
}

/// The `store_lounge_info` tool: records the user's lounge selection.
#[derive(Clone)]
pub struct StoreLoungeInfo {
    catalog: Arc<LoungeCatalog>,
}

impl StoreLoungeInfo {
    pub fn new(catalog: Arc<LoungeCatalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl ToolHandler for StoreLoungeInfo {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "store_lounge_info".to_owned(),
            description: "Record the lounge the user selected for booking".to_owned(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "lounge_id": {
                        "type": "string",
                        "description": "Catalog id of the selected lounge (e.g. szx_t3_al)"
                    }
                }
            }),
            required: vec!["lounge_id".to_owned()],
        }
    }

    async fn invoke(&self, _context: &ToolContext, input: &Value) -> ToolResult {
        let Some(lounge_id) = input.get("lounge_id").and_then(Value::as_str) else {
            return ToolResult::fail("store_lounge_info requires lounge_id");
        };
        let Some(lounge) = self.catalog.get(lounge_id) else {
            return ToolResult::fail(format!("lounge not found: {lounge_id}"));
        };

        ToolResult::ok(json!({
            "lounge_info": {
                "id": lounge.id,
                "name": lounge.name,
                "airport_code": lounge.airport_code,
                "terminal": lounge.terminal,
                "points_required": lounge.points_required,
            }
        }))
    }
}

/// The `book_lounge` tool: point check, deduction, and order creation.
#[derive(Clone)]
pub struct BookLounge {
    catalog: Arc<LoungeCatalog>,
    ledger: Arc<crate::MembershipLedger>,
}

impl BookLounge {
    pub fn new(catalog: Arc<LoungeCatalog>, ledger: Arc<crate::MembershipLedger>) -> Self {
        Self { catalog, ledger }
    }
}

#[async_trait]
impl ToolHandler for BookLounge {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "book_lounge".to_owned(),
            description: "Book VIP lounge access for the user's upcoming flight".to_owned(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "lounge_id": {
                        "type": "string",
                        "description": "Catalog id of the lounge to book"
                    },
                    "flight_number": {
                        "type": "string",
                        "description": "Flight number for the upcoming flight (e.g. CZ3456)"
                    },
                    "arrival_time": {
                        "type": "string",
                        "format": "date-time",
                        "description": "Expected arrival time at the lounge, ISO 8601"
                    }
                }
            }),
            required: vec!["lounge_id".to_owned(), "flight_number".to_owned()],
        }
    }

    async fn invoke(&self, context: &ToolContext, input: &Value) -> ToolResult {
        let Some(lounge_id) = input.get("lounge_id").and_then(Value::as_str) else {
            return ToolResult::fail("book_lounge requires lounge_id");
        };
        let Some(flight_number) = input.get("flight_number").and_then(Value::as_str) else {
            return ToolResult::fail("book_lounge requires flight_number");
        };
        let arrival_time = match input.get("arrival_time").and_then(Value::as_str) {
            Some(raw) => match DateTime::parse_from_rfc3339(raw) {
                Ok(parsed) => parsed.with_timezone(&Utc),
                Err(error) => {
                    return ToolResult::fail(format!("invalid arrival_time: {error}"));
                }
            },
            None => Utc::now(),
        };

        let Some(lounge) = self.catalog.get(lounge_id) else {
            return ToolResult::fail(format!("lounge not found: {lounge_id}"));
        };

        let points_required = lounge.points_required;
        let available = self.ledger.points(&context.user_id).unwrap_or(0);
        if available < points_required {
            return ToolResult::fail(format!(
                "insufficient points: has {available}, needs {points_required}"
            ));
        }
        if self
            .ledger
            .update_points(&context.user_id, -(points_required as i64))
            .is_none()
        {
            return ToolResult::fail("member profile not found");
        }

        let booking = LoungeBooking {
            booking_id: BookingId::generate(),
            user_id: UserId::from_string(context.user_id.as_str()),
            lounge_id: lounge.id.clone(),
            flight_number: flight_number.to_owned(),
            booking_date: Utc::now(),
            arrival_time,
            status: BookingStatus::Confirmed,
            points_used: points_required,
        };
        info!(
            booking_id = %booking.booking_id,
            lounge_id = %booking.lounge_id,
            points_used = booking.points_used,
            "lounge booking confirmed"
        );

        ToolResult::ok(json!({
            "order_info": {
                "booking_id": booking.booking_id,
                "lounge_id": booking.lounge_id,
                "flight_number": booking.flight_number,
                "status": "confirmed",
            },
            "booking": booking,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MembershipLedger;
    use concierge_protocol::UserId;
    use serde_json::json;

    #[test]
    fn search_filters_by_airport_terminal_and_amenities() {
        let catalog = LoungeCatalog::builtin();

        let szx = catalog.search("szx", None, &[]);
        assert_eq!(szx.len(), 3);

        let t3 = catalog.search("SZX", Some("t3"), &[]);
        assert_eq!(t3.len(), 2);

        let showers = catalog.search("SZX", None, &["shower".to_owned()]);
        let ids: Vec<&str> = showers.iter().map(|lounge| lounge.id.as_str()).collect();
        assert_eq!(ids, vec!["szx_t3_joyee", "szx_t4_sc"]);
    }

    #[test]
    fn search_excludes_temporarily_unavailable_lounges() {
        let catalog = LoungeCatalog::builtin();
        let pvg = catalog.search("PVG", None, &[]);
        let ids: Vec<&str> = pvg.iter().map(|lounge| lounge.id.as_str()).collect();
        assert_eq!(ids, vec!["pvg_t1_fl09"]);
    }

    #[test]
    fn get_is_case_insensitive() {
        let catalog = LoungeCatalog::builtin();
        assert!(catalog.get("SZX_T3_AL").is_some());
        assert!(catalog.get("nowhere").is_none());
    }

    #[tokio::test]
    async fn store_lounge_info_yields_lounge_info_key() {
        let tool = StoreLoungeInfo::new(Arc::new(LoungeCatalog::builtin()));
        let context = ToolContext::new(UserId::from_string("demo1"));
        let result = tool
            .invoke(&context, &json!({"lounge_id": "szx_t3_al"}))
            .await;
        assert!(result.success);
        let updates = result.state_updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].key(), "lounge_info");
    }

    #[tokio::test]
    async fn booking_deducts_points_and_yields_order_info() {
        let ledger = Arc::new(MembershipLedger::with_demo_members());
        let tool = BookLounge::new(Arc::new(LoungeCatalog::builtin()), ledger.clone());
        let user = UserId::from_string("demo1");
        let context = ToolContext::new(UserId::from_string("demo1"));

        let result = tool
            .invoke(
                &context,
                &json!({
                    "lounge_id": "SZX_T4_SC",
                    "flight_number": "CZ3456",
                    "arrival_time": "2026-03-25T10:30:00Z"
                }),
            )
            .await;
        assert!(result.success, "{:?}", result.error);
        assert_eq!(ledger.points(&user), Some(3));
        let updates = result.state_updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].key(), "order_info");
    }

    #[tokio::test]
    async fn booking_fails_without_enough_points() {
        let ledger = Arc::new(MembershipLedger::with_demo_members());
        let user = UserId::from_string("demo1");
        // Drain the account first.
        ledger.update_points(&user, -5);

        let tool = BookLounge::new(Arc::new(LoungeCatalog::builtin()), ledger.clone());
        let context = ToolContext::new(UserId::from_string("demo1"));
        let result = tool
            .invoke(
                &context,
                &json!({"lounge_id": "szx_t3_al", "flight_number": "CZ3456"}),
            )
            .await;
        assert!(!result.success);
        assert!(
            result
                .error
                .as_deref()
                .unwrap_or("")
                .contains("insufficient points")
        );
        assert_eq!(ledger.points(&user), Some(0));
    }

    #[tokio::test]
    async fn booking_unknown_lounge_fails_without_deduction() {
        let ledger = Arc::new(MembershipLedger::with_demo_members());
        let tool = BookLounge::new(Arc::new(LoungeCatalog::builtin()), ledger.clone());
        let context = ToolContext::new(UserId::from_string("demo1"));
        let result = tool
            .invoke(
                &context,
                &json!({"lounge_id": "invalid_id", "flight_number": "MU789"}),
            )
            .await;
        assert!(!result.success);
        assert_eq!(ledger.points(&UserId::from_string("demo1")), Some(5));
    }
}
