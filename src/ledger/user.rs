//! User records and the point requests they own

use crate::scoring::Tally;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Store identifier for a user record
///
/// Serializes as a plain string. Distinct from the chat platform's user id,
/// which is the lookup key commands use.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Create a new random RecordId (UUID-based)
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create a RecordId from an existing string
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single approval or rejection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    /// Chat user id of the voter
    pub voter_id: String,
    /// When the vote was cast
    pub cast_at: DateTime<Utc>,
}

impl Vote {
    pub fn new(voter_id: impl Into<String>) -> Self {
        Self {
            voter_id: voter_id.into(),
            cast_at: Utc::now(),
        }
    }
}

/// A point claim awaiting peer votes
///
/// A request is outstanding for as long as it sits in its owner's list.
/// The only way out is the self-approval penalty, which removes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Short code used by `award` and `reject`
    pub reference: String,
    /// Justification given by the owner
    pub reason: String,
    pub requested_at: DateTime<Utc>,
    #[serde(default)]
    pub approvals: Vec<Vote>,
    #[serde(default)]
    pub rejections: Vec<Vote>,
}

impl Request {
    pub fn new(reference: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            reason: reason.into(),
            requested_at: Utc::now(),
            approvals: Vec::new(),
            rejections: Vec::new(),
        }
    }

    /// Current (approvals, rejections) counts
    pub fn tally(&self) -> Tally {
        Tally::new(self.approvals.len(), self.rejections.len())
    }

    pub fn approved_by(&self, voter_id: &str) -> bool {
        self.approvals.iter().any(|v| v.voter_id == voter_id)
    }

    pub fn rejected_by(&self, voter_id: &str) -> bool {
        self.rejections.iter().any(|v| v.voter_id == voter_id)
    }
}

/// A chat user and their point ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Store record identifier
    pub id: RecordId,
    /// Chat platform user id
    pub user_id: String,
    /// Display name at the time of the first request
    pub name: String,
    pub created_at: DateTime<Utc>,
    /// Running total; negative totals are allowed
    pub points: i64,
    /// Outstanding requests in the order they were made
    #[serde(default)]
    pub requests: Vec<Request>,
    /// Optimistic concurrency counter, bumped by the store on every replace
    #[serde(default)]
    pub version: u64,
}

impl User {
    /// Create a user with zero points and no requests
    pub fn new(user_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: RecordId::new(),
            user_id: user_id.into(),
            name: name.into(),
            created_at: Utc::now(),
            points: 0,
            requests: Vec::new(),
            version: 0,
        }
    }

    /// Position of the request with this reference code
    pub fn request_index(&self, reference: &str) -> Option<usize> {
        self.requests.iter().position(|r| r.reference == reference)
    }

    pub fn request(&self, reference: &str) -> Option<&Request> {
        self.requests.iter().find(|r| r.reference == reference)
    }

    /// Remove a request from the ledger
    pub fn revoke_request(&mut self, index: usize) -> Request {
        self.requests.remove(index)
    }
}
