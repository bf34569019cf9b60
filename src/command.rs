//! Trigger parsing
//!
//! Commands start with `!`, optionally followed by a space (mobile keyboards
//! like to insert one). The keyword is case-insensitive; arguments are split
//! on single spaces.

use serde::{Deserialize, Serialize};

pub const TRIGGER_PREFIX: char = '!';

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// `adultme <reason>`
    RequestPoint { reason: String },
    /// `award <reference>`
    Award { reference: String },
    /// `reject <reference>`
    Reject { reference: String },
    /// `adults`
    Leaderboard,
}

impl Command {
    /// Parse a chat message. Returns `None` for anything that isn't one of
    /// our triggers.
    pub fn parse(text: &str) -> Option<Self> {
        let body = text.strip_prefix(TRIGGER_PREFIX)?;
        let body = body.strip_prefix(' ').unwrap_or(body);

        let mut words = body.split(' ');
        let keyword = words.next()?.to_lowercase();
        let args: Vec<&str> = words.collect();
        // award/reject only look at the first argument
        let first_arg = || args.first().copied().unwrap_or_default().to_string();

        match keyword.as_str() {
            "adultme" => Some(Command::RequestPoint {
                reason: args.join(" "),
            }),
            "award" => Some(Command::Award {
                reference: first_arg(),
            }),
            "reject" => Some(Command::Reject {
                reference: first_arg(),
            }),
            "adults" => Some(Command::Leaderboard),
            _ => None,
        }
    }
}
