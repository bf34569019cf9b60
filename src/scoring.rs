//! Scoring transitions
//!
//! After every counted vote the request's vote counts move from a previous
//! tally to a current one. The transition table below maps that move to a
//! point delta and the feedback message for the group. Rules overlap; the
//! first match wins, so the order of [`RULES`] is part of the behavior.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Approval and rejection counts of a request at one point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Tally {
    pub approvals: usize,
    pub rejections: usize,
}

impl Tally {
    pub fn new(approvals: usize, rejections: usize) -> Self {
        Self {
            approvals,
            rejections,
        }
    }
}

/// Which rule of the transition table fired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    FirstPoint,
    Denied,
    LeadGained,
    LeadLost,
    OneMoreApproval,
    StackingApprovals,
    StillWorkToDo,
    MoreDisapprove,
    Unknown,
}

impl Outcome {
    /// Change to the owner's point total
    pub fn delta(self) -> i64 {
        match self {
            Outcome::FirstPoint | Outcome::LeadGained => 1,
            Outcome::LeadLost => -1,
            _ => 0,
        }
    }

    /// Feedback text. `owner` is the request owner's display name, `voter`
    /// the display name of whoever cast the vote.
    pub fn message(self, owner: &str, voter: &str, reason: &str) -> String {
        match self {
            Outcome::FirstPoint => {
                format!("{owner}, you just got your first point \"{reason}\" (for now)!")
            }
            Outcome::Denied => format!(
                "DENIED, {owner} :( -- {voter} doesn't seem to believe you deserve your point \"{reason}\"."
            ),
            Outcome::LeadGained => {
                format!("{voter} believes in you, {owner}! You just got your point \"{reason}\"!")
            }
            Outcome::LeadLost => format!(
                "{voter} thinks you should try harder, {owner}! Your point just got revoked \"{reason}\". :("
            ),
            Outcome::OneMoreApproval => format!(
                "So close to gettin' that point, {owner}! You just need one more approval \"{reason}\"."
            ),
            Outcome::StackingApprovals => format!("{owner} is stackin' up approvals \"{reason}\"!"),
            Outcome::StillWorkToDo => {
                format!("Still have some work to do to get that point, {owner}, \"{reason}\".")
            }
            Outcome::MoreDisapprove => format!(
                "Maybe you should rethink the meaning of \"adult\", {owner}. More people disapprove of your point than agree \"{reason}\"."
            ),
            Outcome::Unknown => "I have no idea what's going on here.".to_string(),
        }
    }
}

/// A guarded row of the transition table
pub struct Rule {
    pub outcome: Outcome,
    pub applies: fn(previous: Tally, current: Tally) -> bool,
}

/// The transition table, highest priority first.
pub const RULES: &[Rule] = &[
    Rule {
        outcome: Outcome::FirstPoint,
        applies: |p, c| p.approvals == 0 && p.rejections == 0 && c.approvals == 1,
    },
    Rule {
        outcome: Outcome::Denied,
        applies: |p, c| p.approvals == 0 && p.rejections == 0 && c.rejections == 1,
    },
    Rule {
        outcome: Outcome::LeadGained,
        applies: |p, c| p.approvals <= p.rejections && c.approvals > c.rejections,
    },
    Rule {
        outcome: Outcome::LeadLost,
        applies: |p, c| p.approvals > p.rejections && c.rejections >= c.approvals,
    },
    Rule {
        outcome: Outcome::OneMoreApproval,
        applies: |p, c| p.rejections > p.approvals && c.rejections == c.approvals,
    },
    Rule {
        outcome: Outcome::StackingApprovals,
        applies: |_, c| c.approvals > c.rejections,
    },
    Rule {
        outcome: Outcome::StillWorkToDo,
        applies: |p, c| c.rejections > c.approvals && c.approvals > p.approvals,
    },
    Rule {
        outcome: Outcome::MoreDisapprove,
        applies: |_, c| c.rejections > c.approvals,
    },
];

/// Result of scoring one vote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub previous: Tally,
    pub current: Tally,
    pub outcome: Outcome,
}

impl Transition {
    pub fn delta(&self) -> i64 {
        self.outcome.delta()
    }
}

/// Run the transition table for a vote that moved `previous` to `current`.
pub fn decide(previous: Tally, current: Tally) -> Transition {
    let outcome = RULES
        .iter()
        .find(|rule| (rule.applies)(previous, current))
        .map(|rule| rule.outcome)
        .unwrap_or_else(|| {
            warn!(?previous, ?current, "no scoring rule matched vote transition");
            Outcome::Unknown
        });

    Transition {
        previous,
        current,
        outcome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(a: usize, r: usize) -> Tally {
        Tally::new(a, r)
    }

    #[test]
    fn test_first_approval_earns_a_point() {
        let tr = decide(t(0, 0), t(1, 0));
        assert_eq!(tr.outcome, Outcome::FirstPoint);
        assert_eq!(tr.delta(), 1);
    }

    #[test]
    fn test_first_rejection_earns_nothing() {
        let tr = decide(t(0, 0), t(0, 1));
        assert_eq!(tr.outcome, Outcome::Denied);
        assert_eq!(tr.delta(), 0);
    }

    #[test]
    fn test_first_point_shadows_lead_gained() {
        // Rule 3 also matches (0 <= 0, 1 > 0) but rule 1 comes first.
        assert!((RULES[2].applies)(t(0, 0), t(1, 0)));
        assert_eq!(decide(t(0, 0), t(1, 0)).outcome, Outcome::FirstPoint);
    }

    #[test]
    fn test_rejection_after_single_approval_revokes() {
        let tr = decide(t(1, 0), t(1, 1));
        assert_eq!(tr.outcome, Outcome::LeadLost);
        assert_eq!(tr.delta(), -1);
    }

    #[test]
    fn test_overtaking_rejections_regains_point() {
        let tr = decide(t(1, 1), t(2, 1));
        assert_eq!(tr.outcome, Outcome::LeadGained);
        assert_eq!(tr.delta(), 1);
    }

    #[test]
    fn test_switch_from_rejection_to_approval_regains_point() {
        // Voter switches: one rejection removed, one approval added.
        let tr = decide(t(1, 1), t(2, 0));
        assert_eq!(tr.outcome, Outcome::LeadGained);
    }

    #[test]
    fn test_catching_up_to_a_tie() {
        let tr = decide(t(0, 2), t(1, 1));
        assert_eq!(tr.outcome, Outcome::OneMoreApproval);
        assert_eq!(tr.delta(), 0);
    }

    #[test]
    fn test_additional_approvals_stack() {
        let tr = decide(t(2, 0), t(3, 0));
        assert_eq!(tr.outcome, Outcome::StackingApprovals);
        assert_eq!(tr.delta(), 0);
    }

    #[test]
    fn test_approval_while_still_behind() {
        let tr = decide(t(0, 3), t(1, 3));
        assert_eq!(tr.outcome, Outcome::StillWorkToDo);
    }

    #[test]
    fn test_piling_on_rejections() {
        let tr = decide(t(0, 1), t(0, 2));
        assert_eq!(tr.outcome, Outcome::MoreDisapprove);
        assert_eq!(tr.delta(), 0);
    }

    #[test]
    fn test_unmatched_transition_falls_back() {
        // A tie reached from a tie without an approval gain matches nothing.
        let tr = decide(t(1, 1), t(1, 1));
        assert_eq!(tr.outcome, Outcome::Unknown);
        assert_eq!(tr.delta(), 0);
        assert_eq!(
            tr.outcome.message("Sam", "Alex", "x"),
            "I have no idea what's going on here."
        );
    }

    #[test]
    fn test_messages_name_owner_and_voter() {
        assert_eq!(
            Outcome::FirstPoint.message("Sam", "Alex", "for fixing the sink"),
            "Sam, you just got your first point \"for fixing the sink\" (for now)!"
        );
        assert_eq!(
            Outcome::LeadGained.message("Sam", "Alex", "for fixing the sink"),
            "Alex believes in you, Sam! You just got your point \"for fixing the sink\"!"
        );
        assert_eq!(
            Outcome::Denied.message("Sam", "Alex", "r"),
            "DENIED, Sam :( -- Alex doesn't seem to believe you deserve your point \"r\"."
        );
    }

    #[test]
    fn test_table_order_is_stable() {
        let order: Vec<Outcome> = RULES.iter().map(|r| r.outcome).collect();
        assert_eq!(
            order,
            vec![
                Outcome::FirstPoint,
                Outcome::Denied,
                Outcome::LeadGained,
                Outcome::LeadLost,
                Outcome::OneMoreApproval,
                Outcome::StackingApprovals,
                Outcome::StillWorkToDo,
                Outcome::MoreDisapprove,
            ]
        );
    }
}
