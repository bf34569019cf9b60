//! Storage backends for user records
//!
//! Backends implement the `UserStore` trait. `SqliteStore` is the persistent
//! implementation; `MemoryStore` keeps records in process.

mod memory;
mod sqlite;
mod traits;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{OpenStore, StorageError, StorageResult, UserOrder, UserStore};
