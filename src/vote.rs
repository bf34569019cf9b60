//! Vote engine
//!
//! Applies one approve/reject action to a request held in memory. A voter has
//! at most one active vote per request: repeating the same vote is refused,
//! casting the opposite vote switches it. The caller persists the record.

use crate::ledger::{Request, User, Vote};
use crate::scoring::{self, Transition};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const SELF_APPROVAL_PENALTY: &str = "Stop trying to be slick! You can't approve your own requests! Just for that, I'm revoking the request!";
const SELF_REJECTION_ACK: &str =
    "Uhhh, okay. If you really want to reject your own request, whatever. Wish granted.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteKind {
    Approve,
    Reject,
}

impl VoteKind {
    fn past_tense(self) -> &'static str {
        match self {
            VoteKind::Approve => "approved",
            VoteKind::Reject => "rejected",
        }
    }
}

impl std::fmt::Display for VoteKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.past_tense())
    }
}

/// Who is casting a vote
#[derive(Debug, Clone)]
pub struct Ballot {
    pub voter_id: String,
    pub voter_name: String,
    /// Sent by another bot rather than a person
    pub automated: bool,
}

impl Ballot {
    pub fn new(voter_id: impl Into<String>, voter_name: impl Into<String>) -> Self {
        Self {
            voter_id: voter_id.into(),
            voter_name: voter_name.into(),
            automated: false,
        }
    }

    pub fn automated(mut self, automated: bool) -> Self {
        self.automated = automated;
        self
    }

    fn casts_for_owner(&self, owner: &User) -> bool {
        self.automated || self.voter_id == owner.user_id
    }
}

/// Votes the engine refuses without touching the record
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VoteError {
    #[error("no outstanding request with reference {0}")]
    UnknownReference(String),

    #[error("voter already {0} this request")]
    Duplicate(VoteKind),
}

impl VoteError {
    /// Reply for the chat group
    pub fn message(&self) -> String {
        match self {
            VoteError::UnknownReference(reference) => {
                format!("Couldn't find a request with reference \"{reference}\".")
            }
            VoteError::Duplicate(kind) => {
                format!("You've already {kind} that request (dumbass).")
            }
        }
    }
}

/// What a vote did to the record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteOutcome {
    /// The owner tried to approve their own request; it was removed.
    Revoked { request: Request },
    /// The vote was recorded and scored.
    Counted {
        kind: VoteKind,
        reason: String,
        /// An opposite vote from the same voter was replaced
        switched: bool,
        /// The owner rejected their own request
        by_owner: bool,
        transition: Transition,
    },
}

impl VoteOutcome {
    /// Point change applied to the owner
    pub fn delta(&self) -> i64 {
        match self {
            VoteOutcome::Revoked { .. } => 0,
            VoteOutcome::Counted { transition, .. } => transition.delta(),
        }
    }

    /// Replies for the chat group, in delivery order.
    pub fn messages(&self, owner_name: &str, voter_name: &str) -> Vec<String> {
        match self {
            VoteOutcome::Revoked { .. } => vec![SELF_APPROVAL_PENALTY.to_string()],
            VoteOutcome::Counted {
                kind,
                reason,
                switched,
                by_owner,
                transition,
            } => {
                let mut out = Vec::with_capacity(2);
                if *by_owner {
                    out.push(SELF_REJECTION_ACK.to_string());
                }
                if *switched {
                    out.push(match kind {
                        VoteKind::Approve => "Your previous rejection has been switched to an approval (make up your damn mind).".to_string(),
                        VoteKind::Reject => "Your previous approval has been switched to a rejection (make up your damn mind).".to_string(),
                    });
                }
                out.push(transition.outcome.message(owner_name, voter_name, reason));
                out
            }
        }
    }
}

/// Apply a vote to the request `reference` owned by `user`.
///
/// On success the record has been mutated (votes and point total) and must
/// be persisted. On error nothing changed.
pub fn cast(
    user: &mut User,
    reference: &str,
    kind: VoteKind,
    ballot: &Ballot,
) -> Result<VoteOutcome, VoteError> {
    let index = user
        .request_index(reference)
        .ok_or_else(|| VoteError::UnknownReference(reference.to_string()))?;
    let by_owner = ballot.casts_for_owner(user);

    if by_owner && kind == VoteKind::Approve {
        let request = user.revoke_request(index);
        return Ok(VoteOutcome::Revoked { request });
    }

    let request = &mut user.requests[index];
    let previous = request.tally();

    let Request {
        approvals,
        rejections,
        ..
    } = &mut *request;
    let (same, opposite) = match kind {
        VoteKind::Approve => (approvals, rejections),
        VoteKind::Reject => (rejections, approvals),
    };

    if same.iter().any(|v| v.voter_id == ballot.voter_id) {
        return Err(VoteError::Duplicate(kind));
    }

    let switched = match opposite.iter().position(|v| v.voter_id == ballot.voter_id) {
        Some(pos) => {
            opposite.remove(pos);
            true
        }
        None => false,
    };
    same.push(Vote::new(ballot.voter_id.clone()));

    let transition = scoring::decide(previous, request.tally());
    let reason = request.reason.clone();
    user.points += transition.delta();

    Ok(VoteOutcome::Counted {
        kind,
        reason,
        switched,
        by_owner,
        transition,
    })
}
