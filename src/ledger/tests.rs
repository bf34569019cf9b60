//! Serialization tests against the persisted record shape

use serde_json::{json, Value};

/// Fixture: a user document as the store persists it
fn user_record_fixture() -> Value {
    json!({
        "id": "6a1f0c7e-2d1b-4c3e-9a57-0b8f1e2d3c4b",
        "user_id": "29410",
        "name": "Sam",
        "created_at": "2026-03-02T18:00:00Z",
        "points": -2,
        "requests": [
            {
                "reference": "11",
                "reason": "for fixing the sink",
                "requested_at": "2026-03-02T18:01:00Z",
                "approvals": [
                    { "voter_id": "31337", "cast_at": "2026-03-02T18:05:00Z" }
                ],
                "rejections": []
            }
        ],
        "version": 4
    })
}

#[cfg(test)]
mod serialization_tests {
    use super::*;
    use crate::ledger::{RecordId, Request, User};

    #[test]
    fn test_record_id_serializes_as_string() {
        let id = RecordId::from_string("abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
    }

    #[test]
    fn test_user_deserializes_from_record() {
        let user: User = serde_json::from_value(user_record_fixture()).unwrap();
        assert_eq!(user.user_id, "29410");
        assert_eq!(user.points, -2);
        assert_eq!(user.version, 4);
        assert_eq!(user.requests.len(), 1);

        let request = &user.requests[0];
        assert_eq!(request.reference, "11");
        assert!(request.approved_by("31337"));
        assert!(!request.rejected_by("31337"));
    }

    #[test]
    fn test_missing_collections_default_to_empty() {
        let user: User = serde_json::from_value(json!({
            "id": "r1",
            "user_id": "u1",
            "name": "Alex",
            "created_at": "2026-03-02T18:00:00Z",
            "points": 0
        }))
        .unwrap();
        assert!(user.requests.is_empty());
        assert_eq!(user.version, 0);
    }

    #[test]
    fn test_user_round_trips_through_json() {
        let mut user = User::new("u1", "Alex");
        user.requests.push(Request::new("11", "for paying taxes"));
        let json = serde_json::to_string(&user).unwrap();
        let back: User = serde_json::from_str(&json).unwrap();
        assert_eq!(back, user);
    }

    #[test]
    fn test_revoke_removes_only_the_target() {
        let mut user = User::new("u1", "Alex");
        user.requests.push(Request::new("11", "a"));
        user.requests.push(Request::new("12", "b"));
        user.requests.push(Request::new("13", "c"));

        let idx = user.request_index("12").unwrap();
        let revoked = user.revoke_request(idx);

        assert_eq!(revoked.reason, "b");
        let refs: Vec<&str> = user.requests.iter().map(|r| r.reference.as_str()).collect();
        assert_eq!(refs, vec!["11", "13"]);
    }
}
