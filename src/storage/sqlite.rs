//! SQLite storage backend

use super::traits::{OpenStore, StorageError, StorageResult, UserOrder, UserStore};
use crate::ledger::{RecordId, User};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

const USER_COLUMNS: &str = "id, user_id, name, created_at, points, requests_json, version";

/// Raw column values of one `users` row
type UserRow = (String, String, String, String, i64, String, i64);

/// SQLite-backed user store
///
/// One row per user; the request list is a JSON document column so a write
/// always replaces the whole record. Thread-safe via internal mutex on the
/// connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    fn init_schema(conn: &Connection) -> StorageResult<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                created_at TEXT NOT NULL,
                points INTEGER NOT NULL DEFAULT 0,
                requests_json TEXT NOT NULL DEFAULT '[]',
                version INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_users_created
                ON users(created_at);
            CREATE INDEX IF NOT EXISTS idx_users_points
                ON users(points);

            -- Readers (leaderboard) never wait on in-flight votes
            PRAGMA journal_mode = WAL;
            "#,
        )?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(())
    }

    fn from_connection(conn: Connection) -> StorageResult<Self> {
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Timestamps are stored with fixed precision so text order is time order.
    fn format_time(t: &DateTime<Utc>) -> String {
        t.to_rfc3339_opts(SecondsFormat::Nanos, true)
    }

    fn user_to_row(user: &User) -> StorageResult<UserRow> {
        Ok((
            user.id.as_str().to_string(),
            user.user_id.clone(),
            user.name.clone(),
            Self::format_time(&user.created_at),
            user.points,
            serde_json::to_string(&user.requests)?,
            user.version as i64,
        ))
    }

    fn row_to_user(row: UserRow) -> StorageResult<User> {
        let (id, user_id, name, created_at, points, requests_json, version) = row;
        Ok(User {
            id: RecordId::from_string(id),
            user_id,
            name,
            created_at: DateTime::parse_from_rfc3339(&created_at)
                .map_err(|e| StorageError::DateParse(e.to_string()))?
                .with_timezone(&Utc),
            points,
            requests: serde_json::from_str(&requests_json)?,
            version: version as u64,
        })
    }

    fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
            row.get(6)?,
        ))
    }
}

impl OpenStore for SqliteStore {
    fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path.as_ref()).map_err(|e| {
            StorageError::Unavailable(format!("{}: {}", path.as_ref().display(), e))
        })?;
        Self::from_connection(conn)
    }

    fn open_in_memory() -> StorageResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }
}

impl UserStore for SqliteStore {
    fn insert_user(&self, user: &User) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        let (id, user_id, name, created_at, points, requests, version) = Self::user_to_row(user)?;

        let rows = conn.execute(
            r#"
            INSERT INTO users (id, user_id, name, created_at, points, requests_json, version)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(user_id) DO NOTHING
            "#,
            params![id, user_id, name, created_at, points, requests, version],
        )?;

        if rows == 0 {
            return Err(StorageError::DuplicateUser(user.user_id.clone()));
        }
        Ok(())
    }

    fn load_user(&self, user_id: &str) -> StorageResult<Option<User>> {
        let conn = self.conn.lock().unwrap();

        let row = conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
                params![user_id],
                Self::read_row,
            )
            .optional()?;

        row.map(Self::row_to_user).transpose()
    }

    fn find_by_reference(&self, reference: &str) -> StorageResult<Option<User>> {
        let conn = self.conn.lock().unwrap();

        let row = conn
            .query_row(
                &format!(
                    "SELECT {USER_COLUMNS} FROM users
                     WHERE EXISTS (
                         SELECT 1 FROM json_each(users.requests_json) AS r
                         WHERE json_extract(r.value, '$.reference') = ?1
                     )
                     ORDER BY created_at, rowid
                     LIMIT 1"
                ),
                params![reference],
                Self::read_row,
            )
            .optional()?;

        row.map(Self::row_to_user).transpose()
    }

    fn list_users(&self, order: UserOrder) -> StorageResult<Vec<User>> {
        let conn = self.conn.lock().unwrap();

        let order_by = match order {
            UserOrder::Created => "created_at, rowid",
            UserOrder::PointsDesc => "points DESC, created_at, rowid",
        };
        let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY {order_by}"))?;
        let rows = stmt.query_map([], Self::read_row)?;

        let mut users = Vec::new();
        for row in rows {
            users.push(Self::row_to_user(row?)?);
        }
        Ok(users)
    }

    fn replace_user(&self, user: &User) -> StorageResult<u64> {
        let conn = self.conn.lock().unwrap();
        let (id, user_id, name, created_at, points, requests, version) = Self::user_to_row(user)?;

        let rows = conn.execute(
            r#"
            UPDATE users SET
                user_id = ?2,
                name = ?3,
                created_at = ?4,
                points = ?5,
                requests_json = ?6,
                version = version + 1
            WHERE id = ?1 AND version = ?7
            "#,
            params![id, user_id, name, created_at, points, requests, version],
        )?;

        if rows == 1 {
            return Ok(user.version + 1);
        }

        let exists: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM users WHERE id = ?1",
            params![user.id.as_str()],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(StorageError::RecordNotFound(user.id.clone()));
        }

        debug!(id = %user.id, expected = user.version, "stale user record");
        Err(StorageError::Conflict {
            id: user.id.clone(),
            expected: user.version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{Request, Vote};
    use chrono::Duration as ChronoDuration;

    fn create_test_store() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    fn create_test_user(user_id: &str, offset_secs: i64) -> User {
        let mut user = User::new(user_id, user_id.to_uppercase());
        user.created_at = Utc::now() + ChronoDuration::seconds(offset_secs);
        user
    }

    #[test]
    fn test_insert_and_load_user() {
        let store = create_test_store();
        let mut user = create_test_user("sam", 0);
        let mut request = Request::new("11", "for fixing the sink");
        request.approvals.push(Vote::new("alex"));
        user.requests.push(request);

        store.insert_user(&user).unwrap();

        let loaded = store.load_user("sam").unwrap().unwrap();
        assert_eq!(loaded, user);
    }

    #[test]
    fn test_load_missing_user() {
        let store = create_test_store();
        assert!(store.load_user("nobody").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let store = create_test_store();
        store.insert_user(&create_test_user("sam", 0)).unwrap();

        let err = store.insert_user(&create_test_user("sam", 1)).unwrap_err();
        assert!(matches!(err, StorageError::DuplicateUser(ref id) if id == "sam"));
        assert_eq!(store.list_users(UserOrder::Created).unwrap().len(), 1);
    }

    #[test]
    fn test_find_by_reference() {
        let store = create_test_store();
        let mut sam = create_test_user("sam", 0);
        sam.requests.push(Request::new("11", "a"));
        sam.requests.push(Request::new("12", "b"));
        let mut alex = create_test_user("alex", 1);
        alex.requests.push(Request::new("21", "c"));
        store.insert_user(&sam).unwrap();
        store.insert_user(&alex).unwrap();

        assert_eq!(store.find_by_reference("12").unwrap().unwrap().user_id, "sam");
        assert_eq!(store.find_by_reference("21").unwrap().unwrap().user_id, "alex");
        assert!(store.find_by_reference("1").unwrap().is_none());
        assert!(store.find_by_reference("31").unwrap().is_none());
    }

    #[test]
    fn test_find_by_reference_prefers_oldest_owner() {
        let store = create_test_store();
        let mut newer = create_test_user("newer", 10);
        newer.requests.push(Request::new("111", "x"));
        let mut older = create_test_user("older", 0);
        older.requests.push(Request::new("111", "y"));
        store.insert_user(&newer).unwrap();
        store.insert_user(&older).unwrap();

        assert_eq!(store.find_by_reference("111").unwrap().unwrap().user_id, "older");
    }

    #[test]
    fn test_list_users_orders() {
        let store = create_test_store();
        let mut a = create_test_user("a", 0);
        let mut b = create_test_user("b", 1);
        let mut c = create_test_user("c", 2);
        a.points = 1;
        b.points = 5;
        c.points = 5;
        for u in [&c, &a, &b] {
            store.insert_user(u).unwrap();
        }

        let by_created: Vec<String> = store
            .list_users(UserOrder::Created)
            .unwrap()
            .into_iter()
            .map(|u| u.user_id)
            .collect();
        assert_eq!(by_created, vec!["a", "b", "c"]);

        let by_points: Vec<String> = store
            .list_users(UserOrder::PointsDesc)
            .unwrap()
            .into_iter()
            .map(|u| u.user_id)
            .collect();
        assert_eq!(by_points, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_replace_bumps_version() {
        let store = create_test_store();
        let mut user = create_test_user("sam", 0);
        store.insert_user(&user).unwrap();

        user.points = 3;
        user.requests.push(Request::new("11", "r"));
        let version = store.replace_user(&user).unwrap();
        assert_eq!(version, 1);

        let loaded = store.load_user("sam").unwrap().unwrap();
        assert_eq!(loaded.points, 3);
        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.requests.len(), 1);
    }

    #[test]
    fn test_stale_replace_conflicts() {
        let store = create_test_store();
        let user = create_test_user("sam", 0);
        store.insert_user(&user).unwrap();

        let mut first = store.load_user("sam").unwrap().unwrap();
        let mut second = first.clone();

        first.points = 1;
        store.replace_user(&first).unwrap();

        second.points = -1;
        let err = store.replace_user(&second).unwrap_err();
        assert!(matches!(err, StorageError::Conflict { expected: 0, .. }));

        // The first write survives.
        assert_eq!(store.load_user("sam").unwrap().unwrap().points, 1);
    }

    #[test]
    fn test_replace_missing_record() {
        let store = create_test_store();
        let user = create_test_user("ghost", 0);
        let err = store.replace_user(&user).unwrap_err();
        assert!(matches!(err, StorageError::RecordNotFound(_)));
    }

    #[test]
    fn test_wal_mode_enabled_at_connection() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("points.db")).unwrap();

        let journal_mode: String = store
            .conn
            .lock()
            .unwrap()
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();

        assert_eq!(journal_mode, "wal");
    }

    #[test]
    fn test_records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("points.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            let mut user = create_test_user("sam", 0);
            user.points = -4;
            store.insert_user(&user).unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.load_user("sam").unwrap().unwrap().points, -4);
    }

    #[test]
    fn test_unavailable_classification() {
        let err = StorageError::Unavailable("down".into());
        assert!(err.is_unavailable());
        let err = StorageError::DateParse("bad".into());
        assert!(!err.is_unavailable());
    }
}
