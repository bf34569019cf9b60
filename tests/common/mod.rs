//! Shared helpers for ledger integration tests

use adultpoints::{Config, IncomingMessage, OpenStore, PointsApi, SenderType, SqliteStore};
use std::sync::Arc;
use tempfile::TempDir;

/// An API over a fresh on-disk database. Keep the `TempDir` alive for the
/// duration of the test.
pub fn sqlite_api(max_write_retries: u32) -> (PointsApi, Arc<SqliteStore>, TempDir) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let config = Config::default()
        .with_db_path(dir.path().join("points.db"))
        .with_max_write_retries(max_write_retries);
    let store = Arc::new(SqliteStore::open(&config.db_path).expect("open store"));
    (PointsApi::new(store.clone(), config), store, dir)
}

/// A chat message from a person
pub fn say(user_id: &str, name: &str, text: &str) -> IncomingMessage {
    IncomingMessage::new(user_id, name, text)
}

/// A chat message from another bot
pub fn bot_says(user_id: &str, text: &str) -> IncomingMessage {
    IncomingMessage::new(user_id, "Helper Bot", text).with_sender_type(SenderType::Bot)
}

/// Reply texts for one message
pub fn texts(api: &PointsApi, message: &IncomingMessage) -> Vec<String> {
    api.handle(message).into_iter().map(|m| m.text).collect()
}
