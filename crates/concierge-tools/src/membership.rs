//! In-memory membership ledger and the point-lookup tool.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use concierge_protocol::{
    EngineResult, MemberProfile, ProfilePort, ToolResult, ToolSpec, UserId,
};
use parking_lot::Mutex;
use serde_json::{Value, json};

use crate::{ToolContext, ToolHandler};

/// Member profiles keyed by member id. Point balances never go negative;
/// deductions clamp at zero.
#[derive(Debug, Default)]
pub struct MembershipLedger {
    profiles: Mutex<HashMap<String, MemberProfile>>,
}

impl MembershipLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger seeded with the demo accounts, each holding five points.
    pub fn with_demo_members() -> Self {
        let ledger = Self::new();
        ledger.insert(MemberProfile::new(
            UserId::from_string("demo1"),
            "Wei",
            "Chen",
            "F",
            "zh",
            5,
        ));
        ledger.insert(MemberProfile::new(
            UserId::from_string("test_user"),
            "Alex",
            "Morgan",
            "M",
            "en",
            5,
        ));
        ledger
    }

    pub fn insert(&self, profile: MemberProfile) {
        self.profiles
            .lock()
            .insert(profile.member_id.as_str().to_owned(), profile);
    }

    pub fn profile(&self, user_id: &UserId) -> Option<MemberProfile> {
        self.profiles.lock().get(user_id.as_str()).cloned()
    }

    pub fn points(&self, user_id: &UserId) -> Option<u32> {
        self.profile(user_id).map(|profile| profile.points)
    }

    /// Apply a point delta, clamping the balance at zero. Returns the
    /// updated profile, or `None` for an unknown member.
    pub fn update_points(&self, user_id: &UserId, delta: i64) -> Option<MemberProfile> {
        let mut profiles = self.profiles.lock();
        let profile = profiles.get_mut(user_id.as_str())?;
        profile.points = (i64::from(profile.points) + delta).max(0) as u32;
        profile.last_updated = Utc::now();
        Some(profile.clone())
    }
}

#[async_trait]
impl ProfilePort for MembershipLedger {
    async fn get_profile(&self, user_id: &UserId) -> EngineResult<Option<MemberProfile>> {
        Ok(self.profile(user_id))
    }
}

/// The `check_membership_points` tool.
#[derive(Clone)]
pub struct CheckMembershipPoints {
    ledger: Arc<MembershipLedger>,
}

impl CheckMembershipPoints {
    pub fn new(ledger: Arc<MembershipLedger>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl ToolHandler for CheckMembershipPoints {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "check_membership_points".to_owned(),
            description:
                "Retrieve the user's membership profile: available lounge access points, name, \
                 and preferred language"
                    .to_owned(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "user_id": {
                        "type": "string",
                        "description": "Member id to look up; defaults to the current user"
                    }
                }
            }),
            required: vec![],
        }
    }

    async fn invoke(&self, context: &ToolContext, input: &Value) -> ToolResult {
        let user_id = input
            .get("user_id")
            .and_then(Value::as_str)
            .map(UserId::from_string)
            .unwrap_or_else(|| UserId::from_string(context.user_id.as_str()));

        let Some(profile) = self.ledger.profile(&user_id) else {
            return ToolResult::fail("member profile not found");
        };

        ToolResult::ok(json!({
            "points": profile.points,
            "first_name": profile.first_name,
            "last_name": profile.last_name,
            "gender": profile.gender,
            "preferred_language": profile.preferred_language,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deductions_clamp_at_zero() {
        let ledger = MembershipLedger::with_demo_members();
        let user = UserId::from_string("demo1");
        let updated = ledger.update_points(&user, -100).expect("member exists");
        assert_eq!(updated.points, 0);
        let restored = ledger.update_points(&user, 3).expect("member exists");
        assert_eq!(restored.points, 3);
    }

    #[test]
    fn unknown_member_yields_none() {
        let ledger = MembershipLedger::with_demo_members();
        let user = UserId::from_string("stranger");
        assert!(ledger.points(&user).is_none());
        assert!(ledger.update_points(&user, 1).is_none());
    }

    #[tokio::test]
    async fn ledger_serves_the_profile_port() {
        let ledger = MembershipLedger::with_demo_members();
        let profile = ledger
            .get_profile(&UserId::from_string("demo1"))
            .await
            .expect("port never errors")
            .expect("seeded member");
        assert_eq!(profile.first_name, "Wei");
        assert_eq!(profile.points, 5);
    }

    #[tokio::test]
    async fn check_points_reports_profile_fields() {
        let tool = CheckMembershipPoints::new(Arc::new(MembershipLedger::with_demo_members()));
        let context = ToolContext::new(UserId::from_string("demo1"));
        let result = tool.invoke(&context, &json!({})).await;
        assert!(result.success);
        let data = result.data.clone().expect("success carries data");
        assert_eq!(data["points"], 5);
        assert_eq!(data["preferred_language"], "zh");
        // Point lookups carry no recognized state key.
        assert!(result.state_updates().is_empty());
    }

    #[tokio::test]
    async fn check_points_for_unknown_member_fails() {
        let tool = CheckMembershipPoints::new(Arc::new(MembershipLedger::new()));
        let context = ToolContext::new(UserId::from_string("demo1"));
        let result = tool.invoke(&context, &json!({"user_id": "ghost"})).await;
        assert!(!result.success);
    }
}
