//! Leaderboard aggregation

use crate::ledger::User;
use crate::storage::{StorageResult, UserOrder, UserStore};
use std::fmt::Write;
use std::sync::Arc;

/// One line of the leaderboard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Standing {
    pub name: String,
    pub points: i64,
}

impl From<User> for Standing {
    fn from(user: User) -> Self {
        Self {
            name: user.name,
            points: user.points,
        }
    }
}

/// Ranked standings from one store snapshot, highest total first
#[derive(Debug)]
pub struct Standings {
    users: std::vec::IntoIter<User>,
}

impl Iterator for Standings {
    type Item = Standing;

    fn next(&mut self) -> Option<Standing> {
        self.users.next().map(Standing::from)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.users.size_hint()
    }
}

impl ExactSizeIterator for Standings {}

/// Read-only view over every user's point total
///
/// Each call re-reads the store, so in-flight votes may or may not be
/// reflected.
#[derive(Clone)]
pub struct Leaderboard {
    store: Arc<dyn UserStore>,
}

impl Leaderboard {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    pub fn standings(&self) -> StorageResult<Standings> {
        let users = self.store.list_users(UserOrder::PointsDesc)?;
        Ok(Standings {
            users: users.into_iter(),
        })
    }

    /// Chat rendering of the current standings
    pub fn render(&self) -> StorageResult<String> {
        Ok(render(self.standings()?))
    }
}

/// `Name: points` lines, a blank line, then `TOTAL: <sum>`.
pub fn render(standings: impl IntoIterator<Item = Standing>) -> String {
    let mut board = String::new();
    let mut total = 0i64;
    for s in standings {
        let _ = writeln!(board, "{}: {}", s.name, s.points);
        total += s.points;
    }
    let _ = write!(board, "\nTOTAL: {}", total);
    board
}
