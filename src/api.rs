//! Command entry points.
//!
//! `PointsApi` is the single entry point for chat commands. Each operation
//! loads the records it needs, runs the vote/scoring engines on an in-memory
//! copy and writes the whole record back. A write that loses a version race
//! re-runs the operation from a fresh load.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::chat::{DeliveryError, IncomingMessage, OutgoingMessage, Outbox};
use crate::command::Command;
use crate::config::Config;
use crate::leaderboard::Leaderboard;
use crate::ledger::{allocate_reference, Request, User};
use crate::storage::{StorageError, UserOrder, UserStore};
use crate::vote::{self, Ballot, VoteError, VoteKind};

/// Why a command produced no ledger change
#[derive(Debug, Error)]
pub enum PointsError {
    #[error("no outstanding request with reference {0:?}")]
    NotFound(String),

    #[error("voter already {0} this request")]
    DuplicateVote(VoteKind),

    #[error("store unavailable: {0}")]
    StoreUnavailable(#[source] StorageError),

    #[error("gave up after {attempts} conflicting writes")]
    Contention { attempts: u32 },

    #[error("storage error: {0}")]
    Storage(#[source] StorageError),
}

impl From<StorageError> for PointsError {
    fn from(e: StorageError) -> Self {
        if e.is_unavailable() {
            PointsError::StoreUnavailable(e)
        } else {
            PointsError::Storage(e)
        }
    }
}

impl From<VoteError> for PointsError {
    fn from(e: VoteError) -> Self {
        match e {
            VoteError::UnknownReference(reference) => PointsError::NotFound(reference),
            VoteError::Duplicate(kind) => PointsError::DuplicateVote(kind),
        }
    }
}

impl PointsError {
    /// Reply for the chat group
    pub fn message(&self) -> String {
        match self {
            PointsError::NotFound(reference) => {
                VoteError::UnknownReference(reference.clone()).message()
            }
            PointsError::DuplicateVote(kind) => VoteError::Duplicate(*kind).message(),
            PointsError::StoreUnavailable(_) => {
                "I can't reach the points ledger right now. Try again in a bit.".to_string()
            }
            PointsError::Contention { .. } => {
                "Too many people voting at once! Try that again.".to_string()
            }
            PointsError::Storage(_) => "Something went wrong updating the points ledger.".to_string(),
        }
    }

    fn is_conflict(&self) -> bool {
        matches!(self, PointsError::Storage(StorageError::Conflict { .. }))
    }
}

/// Result type for command operations
pub type PointsResult<T> = Result<T, PointsError>;

/// Confirmation of a new point request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestReceipt {
    pub reference: String,
    pub message: OutgoingMessage,
}

/// Single entry point for all chat commands.
#[derive(Clone)]
pub struct PointsApi {
    store: Arc<dyn UserStore>,
    config: Config,
}

impl PointsApi {
    pub fn new(store: Arc<dyn UserStore>, config: Config) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // --- Dispatch ---

    /// Handle one chat message. Messages that aren't commands produce no
    /// replies; failures become a single reply.
    pub fn handle(&self, message: &IncomingMessage) -> Vec<OutgoingMessage> {
        let Some(command) = Command::parse(&message.text) else {
            return Vec::new();
        };
        debug!(user_id = %message.user_id, ?command, "dispatching command");

        match self.execute(&command, message) {
            Ok(replies) => replies,
            Err(e) => {
                match &e {
                    PointsError::StoreUnavailable(_) | PointsError::Storage(_) => {
                        error!(error = %e, ?command, "command failed")
                    }
                    _ => debug!(error = %e, ?command, "command refused"),
                }
                vec![OutgoingMessage::new(e.message())]
            }
        }
    }

    /// Run a parsed command on behalf of the sender of `message`.
    pub fn execute(
        &self,
        command: &Command,
        message: &IncomingMessage,
    ) -> PointsResult<Vec<OutgoingMessage>> {
        let ballot = || Ballot::new(&message.user_id, &message.name).automated(message.is_automated());

        match command {
            Command::RequestPoint { reason } => {
                let receipt = self.request_point(&message.user_id, &message.name, reason)?;
                Ok(vec![receipt.message])
            }
            Command::Award { reference } => self.award(reference, &ballot()),
            Command::Reject { reference } => self.reject(reference, &ballot()),
            Command::Leaderboard => Ok(vec![OutgoingMessage::new(self.leaderboard().render()?)]),
        }
    }

    /// Handle a message off the async executor and hand the replies to
    /// `outbox`. Returns how many replies were delivered.
    pub async fn respond(
        &self,
        message: IncomingMessage,
        outbox: &dyn Outbox,
    ) -> Result<usize, DeliveryError> {
        let api = self.clone();
        let replies = match tokio::task::spawn_blocking(move || api.handle(&message)).await {
            Ok(replies) => replies,
            Err(e) => {
                error!(error = %e, "command task failed");
                return Ok(0);
            }
        };

        if replies.is_empty() {
            return Ok(0);
        }
        let count = replies.len();
        outbox.deliver(replies).await?;
        Ok(count)
    }

    // --- Requests ---

    /// Record a new point request, registering the user on first use.
    pub fn request_point(
        &self,
        user_id: &str,
        display_name: &str,
        reason: &str,
    ) -> PointsResult<RequestReceipt> {
        self.with_retries(|| {
            let mut user = self.register(user_id, display_name)?;
            let users = self.store.list_users(UserOrder::Created)?;
            let reference = allocate_reference(&user, &users);

            user.requests.push(Request::new(reference.clone(), reason));
            self.store.replace_user(&user)?;
            info!(user_id, %reference, "point requested");

            let text = format!(
                "{display_name} has requested an adult point \"{reason}\". To approve the point, just type \"!award {reference}\", or to reject it, use \"!reject {reference}\"."
            );
            Ok(RequestReceipt {
                reference,
                message: OutgoingMessage::new(text),
            })
        })
    }

    /// Load the user's record, creating an empty one if they are new.
    fn register(&self, user_id: &str, display_name: &str) -> PointsResult<User> {
        if let Some(user) = self.store.load_user(user_id)? {
            return Ok(user);
        }

        match self.store.insert_user(&User::new(user_id, display_name)) {
            Ok(()) => info!(user_id, "registered user"),
            // Registered concurrently by another command; use theirs.
            Err(StorageError::DuplicateUser(_)) => {}
            Err(e) => return Err(e.into()),
        }

        self.store
            .load_user(user_id)?
            .ok_or_else(|| PointsError::Storage(StorageError::DuplicateUser(user_id.to_string())))
    }

    /// Locate the owner of an outstanding request.
    ///
    /// Lookup failures other than an unreachable store are reported as an
    /// unknown reference.
    pub fn find_by_reference(&self, reference: &str) -> PointsResult<(User, usize)> {
        let found = match self.store.find_by_reference(reference) {
            Ok(found) => found,
            Err(e) if e.is_unavailable() => return Err(PointsError::StoreUnavailable(e)),
            Err(e) => {
                warn!(error = %e, reference, "reference lookup failed, treating as not found");
                None
            }
        };

        found
            .and_then(|user| user.request_index(reference).map(|i| (user, i)))
            .ok_or_else(|| PointsError::NotFound(reference.to_string()))
    }

    // --- Votes ---

    pub fn award(&self, reference: &str, ballot: &Ballot) -> PointsResult<Vec<OutgoingMessage>> {
        self.vote(reference, VoteKind::Approve, ballot)
    }

    pub fn reject(&self, reference: &str, ballot: &Ballot) -> PointsResult<Vec<OutgoingMessage>> {
        self.vote(reference, VoteKind::Reject, ballot)
    }

    /// Apply a vote and persist the owner's record.
    pub fn vote(
        &self,
        reference: &str,
        kind: VoteKind,
        ballot: &Ballot,
    ) -> PointsResult<Vec<OutgoingMessage>> {
        self.with_retries(|| {
            let (mut owner, _) = self.find_by_reference(reference)?;
            let outcome = vote::cast(&mut owner, reference, kind, ballot)?;
            self.store.replace_user(&owner)?;

            info!(
                reference,
                voter = %ballot.voter_id,
                %kind,
                delta = outcome.delta(),
                points = owner.points,
                "vote applied"
            );

            Ok(outcome
                .messages(&owner.name, &ballot.voter_name)
                .into_iter()
                .map(OutgoingMessage::from)
                .collect())
        })
    }

    // --- Reads ---

    pub fn leaderboard(&self) -> Leaderboard {
        Leaderboard::new(self.store.clone())
    }

    /// Re-run `op` while its write loses version races, up to the configured
    /// retry limit.
    fn with_retries<T>(&self, mut op: impl FnMut() -> PointsResult<T>) -> PointsResult<T> {
        let attempts = self.config.max_write_retries.saturating_add(1);
        for attempt in 1..=attempts {
            match op() {
                Err(e) if e.is_conflict() => {
                    debug!(attempt, error = %e, "write conflict, retrying");
                }
                other => return other,
            }
        }
        warn!(attempts, "giving up after repeated write conflicts");
        Err(PointsError::Contention { attempts })
    }
}
