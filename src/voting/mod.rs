//! Proposal voting that turns collective decisions into orders

pub mod engine;
pub mod types;

pub use engine::{VoteError, VotingEngine};
pub use types::{
    Choice, ChoiceOutcome, ParticipantChoice, Proposal, ProposalDraft, ProposalStatus,
    ProposalView, VoteTally,
};
