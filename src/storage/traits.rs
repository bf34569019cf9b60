//! Storage trait definitions

use crate::ledger::{RecordId, User};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Date parsing error: {0}")]
    DateParse(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("User already registered: {0}")]
    DuplicateUser(String),

    #[error("User record not found: {0}")]
    RecordNotFound(RecordId),

    #[error("Version conflict on {id}: expected {expected}")]
    Conflict { id: RecordId, expected: u64 },
}

impl StorageError {
    /// The store cannot be reached at all, as opposed to a failed query.
    pub fn is_unavailable(&self) -> bool {
        use rusqlite::ErrorCode;

        match self {
            StorageError::Unavailable(_) | StorageError::Io(_) => true,
            StorageError::Database(rusqlite::Error::SqliteFailure(e, _)) => matches!(
                e.code,
                ErrorCode::CannotOpen
                    | ErrorCode::DatabaseBusy
                    | ErrorCode::DatabaseLocked
                    | ErrorCode::NotADatabase
                    | ErrorCode::SystemIoFailure
            ),
            _ => false,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Sort order for listing users
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserOrder {
    /// Oldest first
    Created,
    /// Highest point total first, ties broken by age
    PointsDesc,
}

/// Document store for user records
///
/// Every write replaces a whole record. `replace_user` is guarded by the
/// record's version: it only succeeds when the stored version equals
/// `user.version`, and bumps it. Implementations must be Send + Sync so
/// command tasks can share one store.
pub trait UserStore: Send + Sync {
    /// Insert a new record. Fails with `DuplicateUser` if the chat user id
    /// is already registered.
    fn insert_user(&self, user: &User) -> StorageResult<()>;

    /// Load a record by chat user id
    fn load_user(&self, user_id: &str) -> StorageResult<Option<User>>;

    /// Find the oldest user owning a request with this reference code
    fn find_by_reference(&self, reference: &str) -> StorageResult<Option<User>>;

    /// All records in the requested order
    fn list_users(&self, order: UserOrder) -> StorageResult<Vec<User>>;

    /// Replace a record, returning its new version.
    fn replace_user(&self, user: &User) -> StorageResult<u64>;
}

/// Extension trait for opening stores from paths
pub trait OpenStore: UserStore + Sized {
    /// Open or create a store at the given path
    fn open(path: impl AsRef<Path>) -> StorageResult<Self>;

    /// Create an in-memory store (useful for testing)
    fn open_in_memory() -> StorageResult<Self>;
}
