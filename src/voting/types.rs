//! Voting data model

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ledger::types::Side;

/// Proposals stay open for a day from creation.
pub const VOTING_WINDOW_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Choice {
    Agree,
    Disagree,
    Abstain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalStatus {
    Ongoing,
    Passed,
    Rejected,
    /// No sweep assigns this yet; `expires_at` is recorded so one can.
    Expired,
}

/// One member's standing choice on a proposal. Re-voting replaces the row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantChoice {
    pub member_id: u64,
    pub member_name: String,
    pub choice: Choice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VoteTally {
    pub agree: u32,
    pub disagree: u32,
    pub abstain: u32,
}

/// What a member asks their room to trade.
#[derive(Debug, Clone)]
pub struct ProposalDraft {
    pub side: Side,
    pub name: String,
    pub code: Option<String>,
    pub quantity: u32,
    pub price: Option<Decimal>,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    pub id: u64,
    pub room_id: u64,
    pub proposer_id: u64,
    pub proposer_name: String,
    pub side: Side,
    pub name: String,
    pub code: Option<String>,
    pub quantity: u32,
    /// Zero when the proposer left the price open.
    pub proposed_price: Decimal,
    pub reason: String,
    pub status: ProposalStatus,
    /// Room headcount snapshotted at creation; later joins and leaves do
    /// not move the bar for this proposal.
    pub total_members: u32,
    pub choices: Vec<ParticipantChoice>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Proposal {
    pub fn tally(&self) -> VoteTally {
        let mut tally = VoteTally::default();
        for row in &self.choices {
            match row.choice {
                Choice::Agree => tally.agree += 1,
                Choice::Disagree => tally.disagree += 1,
                Choice::Abstain => tally.abstain += 1,
            }
        }
        tally
    }

    pub fn choice_of(&self, member_id: u64) -> Option<Choice> {
        self.choices
            .iter()
            .find(|row| row.member_id == member_id)
            .map(|row| row.choice)
    }

    pub fn window_from(created_at: DateTime<Utc>) -> DateTime<Utc> {
        created_at + Duration::hours(VOTING_WINDOW_HOURS)
    }
}

/// Listing shape: the proposal plus the price its order actually filled at,
/// when one exists.
#[derive(Debug, Clone, Serialize)]
pub struct ProposalView {
    #[serde(flatten)]
    pub proposal: Proposal,
    pub execution_price: Option<Decimal>,
}

/// Result of submitting a choice, with the status the proposal landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChoiceOutcome {
    pub proposal_id: u64,
    pub choice: Choice,
    pub status: ProposalStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proposal_with(choices: Vec<ParticipantChoice>) -> Proposal {
        let now = Utc::now();
        Proposal {
            id: 1,
            room_id: 1,
            proposer_id: 10,
            proposer_name: "mina".to_string(),
            side: Side::Buy,
            name: "Samsung Electronics".to_string(),
            code: Some("005930".to_string()),
            quantity: 1,
            proposed_price: Decimal::ZERO,
            reason: String::new(),
            status: ProposalStatus::Ongoing,
            total_members: 3,
            choices,
            created_at: now,
            expires_at: Proposal::window_from(now),
        }
    }

    #[test]
    fn tally_counts_each_choice_kind() {
        let proposal = proposal_with(vec![
            ParticipantChoice { member_id: 10, member_name: "mina".into(), choice: Choice::Agree },
            ParticipantChoice { member_id: 11, member_name: "juno".into(), choice: Choice::Disagree },
            ParticipantChoice { member_id: 12, member_name: "hana".into(), choice: Choice::Abstain },
            ParticipantChoice { member_id: 13, member_name: "sol".into(), choice: Choice::Agree },
        ]);
        let tally = proposal.tally();
        assert_eq!(tally.agree, 2);
        assert_eq!(tally.disagree, 1);
        assert_eq!(tally.abstain, 1);
    }

    #[test]
    fn voting_window_is_a_day() {
        let now = Utc::now();
        assert_eq!(Proposal::window_from(now) - now, Duration::hours(24));
    }
}
