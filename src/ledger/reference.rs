//! Reference code allocation
//!
//! A reference is the owner's 1-based ordinal among all users (oldest first)
//! followed by the number the new request will have in the owner's list.
//! The first request of the first user is `"11"`.
//!
//! The scheme is not collision free: ordinal 1 with request 11 and ordinal 11
//! with request 1 both produce `"111"`. Lookups resolve to the oldest owner.
//!
//! A single owner can also end up holding the same code twice. Revoking a
//! request shrinks the list, so the next request reuses the count of the last
//! outstanding one: after `11`, `12`, revoking `11`, the next code is `12`
//! again. Votes on that code reach the older request; the newer one can only
//! be reached once the older one is gone.

use super::user::User;

/// Derive the reference code for the next request of `user`.
///
/// `users_by_creation` must be ordered by creation time, oldest first. A user
/// missing from the snapshot (registered concurrently) gets ordinal 0.
pub fn allocate_reference(user: &User, users_by_creation: &[User]) -> String {
    let ordinal = ordinal_of(user, users_by_creation);
    format!("{}{}", ordinal, user.requests.len() + 1)
}

fn ordinal_of(user: &User, users_by_creation: &[User]) -> usize {
    users_by_creation
        .iter()
        .position(|u| u.user_id == user.user_id)
        .map(|i| i + 1)
        .unwrap_or(0)
}
