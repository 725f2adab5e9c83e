//! Ticket-document field extraction.
//!
//! Scans the text lines of an attached ticket or boarding pass for flight
//! number, travel date, seat, and passenger name. Line scanning is
//! case-normalized to uppercase; later lines overwrite earlier matches for
//! the same field.

use std::sync::LazyLock;

use async_trait::async_trait;
use concierge_protocol::{FlightInfo, ToolResult, ToolSpec};
use regex::Regex;
use serde_json::{Value, json};

use crate::{ToolContext, ToolHandler};

static FLIGHT_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Z]{2}\d{3,4})").expect("flight pattern compiles"));

static TRAVEL_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(\d{1,2}(?:JAN|FEB|MAR|APR|MAY|JUN|JUL|AUG|SEP|OCT|NOV|DEC)|\d{4}-\d{2}-\d{2}|\d{2}/\d{2}/\d{4})",
    )
    .expect("date pattern compiles")
});

static SEAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:SEAT\s*)?(\d{1,2}[A-Z])").expect("seat pattern compiles"));

/// Identify flight-related fields in uppercased document lines.
pub fn identify_fields(lines: &[String]) -> FlightInfo {
    let mut info = FlightInfo::default();

    for raw in lines {
        let line = raw.to_uppercase();

        if let Some(captures) = FLIGHT_NUMBER.captures(&line) {
            info.flight_number = Some(captures[1].to_owned());
        }

        if let Some(captures) = TRAVEL_DATE.captures(&line) {
            info.date = Some(captures[1].to_owned());
        }

        if line.contains("SEAT")
            && let Some(captures) = SEAT.captures(&line)
        {
            info.seat = Some(captures[1].to_owned());
        }

        if line.contains("PASSENGER") || line.contains("NAME") {
            let name = line
                .replace("PASSENGER", "")
                .replace("NAME", "")
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            if !name.is_empty() {
                info.passenger_name = Some(name);
            }
        }
    }

    info
}

/// The `extract_flight_info` tool. Takes the ticket text from the call input
/// or, failing that, from the message attachment the orchestrator injected.
#[derive(Debug, Default, Clone)]
pub struct ExtractFlightInfo;

impl ExtractFlightInfo {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ToolHandler for ExtractFlightInfo {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "extract_flight_info".to_owned(),
            description:
                "Extract flight details (flight number, date, seat, passenger name) from the \
                 text of an uploaded flight ticket or boarding pass"
                    .to_owned(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "ticket_text": {
                        "type": "string",
                        "description": "Raw text content of the ticket document"
                    }
                }
            }),
            required: vec![],
        }
    }

    async fn invoke(&self, context: &ToolContext, input: &Value) -> ToolResult {
        let text = input
            .get("ticket_text")
            .and_then(Value::as_str)
            .map(ToOwned::to_owned)
            .or_else(|| context.attachment.clone());
        let Some(text) = text else {
            return ToolResult::fail("no ticket document provided");
        };

        let lines: Vec<String> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(ToOwned::to_owned)
            .collect();
        let info = identify_fields(&lines);

        if info.flight_number.is_none()
            && info.date.is_none()
            && info.seat.is_none()
            && info.passenger_name.is_none()
        {
            return ToolResult::fail("could not identify flight details in the document");
        }

        ToolResult::ok(json!({
            "flight_info": info,
            "raw_text": lines,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concierge_protocol::UserId;

    const TICKET: &str = "CHINA SOUTHERN AIRLINES\n\
                          PASSENGER CHEN WEI\n\
                          CZ3456 25MAR\n\
                          SEAT 12A\n\
                          GATE B12";

    #[test]
    fn identifies_all_four_fields() {
        let lines: Vec<String> = TICKET.lines().map(ToOwned::to_owned).collect();
        let info = identify_fields(&lines);
        assert_eq!(info.flight_number.as_deref(), Some("CZ3456"));
        assert_eq!(info.date.as_deref(), Some("25MAR"));
        assert_eq!(info.seat.as_deref(), Some("12A"));
        assert_eq!(info.passenger_name.as_deref(), Some("CHEN WEI"));
    }

    #[test]
    fn accepts_iso_and_slash_dates() {
        let info = identify_fields(&["DEPARTURE 2026-03-25".to_owned()]);
        assert_eq!(info.date.as_deref(), Some("2026-03-25"));
        let info = identify_fields(&["DATE 25/03/2026".to_owned()]);
        assert_eq!(info.date.as_deref(), Some("25/03/2026"));
    }

    #[test]
    fn seat_requires_seat_keyword_on_the_line() {
        let info = identify_fields(&["ROW 12A".to_owned()]);
        assert!(info.seat.is_none());
        let info = identify_fields(&["SEAT: 3C".to_owned()]);
        assert_eq!(info.seat.as_deref(), Some("3C"));
    }

    #[tokio::test]
    async fn successful_extraction_yields_flight_info_key() {
        let tool = ExtractFlightInfo::new();
        let context =
            ToolContext::new(UserId::from_string("demo1")).with_attachment(TICKET);
        let result = tool.invoke(&context, &serde_json::json!({})).await;
        assert!(result.success);
        let updates = result.state_updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].key(), "flight_info");
    }

    #[tokio::test]
    async fn unreadable_document_is_a_failed_result() {
        let tool = ExtractFlightInfo::new();
        let context = ToolContext::new(UserId::from_string("demo1"));
        let result = tool
            .invoke(&context, &serde_json::json!({"ticket_text": "lorem ipsum"}))
            .await;
        assert!(!result.success);

        let result = tool.invoke(&context, &serde_json::json!({})).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("no ticket document provided"));
    }
}
