//! adultpoints: a peer-moderated point ledger for group chat bots
//!
//! Someone does something responsible and asks the group for a point with
//! `!adultme <reason>`. Everyone else votes with `!award <ref>` or
//! `!reject <ref>`, and `!adults` shows the leaderboard.
//!
//! # Core Concepts
//!
//! - **Requests**: point claims owned by a user, addressed by a short reference code
//! - **Votes**: at most one active approval or rejection per voter per request
//! - **Transitions**: an ordered rule table turning each vote into a point delta and a reply
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use adultpoints::{Config, IncomingMessage, MemoryStore, PointsApi};
//!
//! let api = PointsApi::new(Arc::new(MemoryStore::new()), Config::default());
//! let replies = api.handle(&IncomingMessage::new("1", "Sam", "!adults"));
//! assert_eq!(replies[0].text, "\nTOTAL: 0");
//! ```

pub mod api;
pub mod chat;
pub mod command;
pub mod config;
pub mod leaderboard;
pub mod ledger;
pub mod scoring;
pub mod storage;
pub mod vote;

pub use api::{PointsApi, PointsError, PointsResult, RequestReceipt};
pub use chat::{ChannelOutbox, DeliveryError, IncomingMessage, OutgoingMessage, Outbox, SenderType, StdoutOutbox};
pub use command::Command;
pub use config::{Config, ConfigError};
pub use leaderboard::{Leaderboard, Standing};
pub use ledger::{RecordId, Request, User, Vote};
pub use scoring::{decide, Outcome, Tally, Transition};
pub use storage::{MemoryStore, OpenStore, SqliteStore, StorageError, StorageResult, UserOrder, UserStore};
pub use vote::{Ballot, VoteError, VoteKind, VoteOutcome};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
