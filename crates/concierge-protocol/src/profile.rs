//! Membership profile consumed for model-context enrichment.

use crate::ids::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberProfile {
    pub member_id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub preferred_language: String,
    pub points: u32,
    pub last_updated: DateTime<Utc>,
}

impl MemberProfile {
    pub fn new(
        member_id: UserId,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        gender: impl Into<String>,
        preferred_language: impl Into<String>,
        points: u32,
    ) -> Self {
        Self {
            member_id,
            first_name: first_name.into(),
            last_name: last_name.into(),
            gender: gender.into(),
            preferred_language: preferred_language.into(),
            points,
            last_updated: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_serde_roundtrip() {
        let profile = MemberProfile::new(
            UserId::from_string("demo1"),
            "Wei",
            "Chen",
            "F",
            "zh",
            5,
        );
        let json = serde_json::to_string(&profile).unwrap();
        let back: MemberProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(back.member_id.as_str(), "demo1");
        assert_eq!(back.points, 5);
    }
}
