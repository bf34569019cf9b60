//! Point ledger data model

mod reference;
mod user;

#[cfg(test)]
mod tests;

pub use reference::allocate_reference;
pub use user::{RecordId, Request, User, Vote};
