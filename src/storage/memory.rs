//! In-memory storage backend

use super::traits::{OpenStore, StorageError, StorageResult, UserOrder, UserStore};
use crate::ledger::User;
use dashmap::DashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-local user store backed by a concurrent map
///
/// Honors the same version check as the SQLite backend. Nothing is written
/// to disk; `open` ignores its path.
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Records keyed by chat user id, with their insertion sequence
    users: DashMap<String, (u64, User)>,
    next_seq: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    fn snapshot(&self, order: UserOrder) -> Vec<User> {
        let mut entries: Vec<(u64, User)> = self.users.iter().map(|r| r.value().clone()).collect();
        match order {
            UserOrder::Created => {
                entries.sort_by(|(sa, a), (sb, b)| a.created_at.cmp(&b.created_at).then(sa.cmp(sb)))
            }
            UserOrder::PointsDesc => entries.sort_by(|(sa, a), (sb, b)| {
                b.points
                    .cmp(&a.points)
                    .then(a.created_at.cmp(&b.created_at))
                    .then(sa.cmp(sb))
            }),
        }
        entries.into_iter().map(|(_, u)| u).collect()
    }
}

impl OpenStore for MemoryStore {
    fn open(_path: impl AsRef<Path>) -> StorageResult<Self> {
        Ok(Self::new())
    }

    fn open_in_memory() -> StorageResult<Self> {
        Ok(Self::new())
    }
}

impl UserStore for MemoryStore {
    fn insert_user(&self, user: &User) -> StorageResult<()> {
        use dashmap::mapref::entry::Entry;

        match self.users.entry(user.user_id.clone()) {
            Entry::Occupied(_) => Err(StorageError::DuplicateUser(user.user_id.clone())),
            Entry::Vacant(slot) => {
                let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
                slot.insert((seq, user.clone()));
                Ok(())
            }
        }
    }

    fn load_user(&self, user_id: &str) -> StorageResult<Option<User>> {
        Ok(self.users.get(user_id).map(|r| r.value().1.clone()))
    }

    fn find_by_reference(&self, reference: &str) -> StorageResult<Option<User>> {
        Ok(self
            .snapshot(UserOrder::Created)
            .into_iter()
            .find(|u| u.request_index(reference).is_some()))
    }

    fn list_users(&self, order: UserOrder) -> StorageResult<Vec<User>> {
        Ok(self.snapshot(order))
    }

    fn replace_user(&self, user: &User) -> StorageResult<u64> {
        let mut entry = self
            .users
            .iter_mut()
            .find(|r| r.value().1.id == user.id)
            .ok_or_else(|| StorageError::RecordNotFound(user.id.clone()))?;

        let stored = &mut entry.value_mut().1;
        if stored.version != user.version {
            return Err(StorageError::Conflict {
                id: user.id.clone(),
                expected: user.version,
            });
        }

        *stored = user.clone();
        stored.version = user.version + 1;
        Ok(stored.version)
    }
}
