//! Proposal lifecycle and resolution rules

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rust_decimal::Decimal;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::ledger::engine::ExecutionEngine;
use crate::ledger::store::LedgerStore;
use crate::ledger::types::{OrderRequest, Side};
use crate::rooms::RoomDirectory;
use crate::voting::types::{
    Choice, ChoiceOutcome, ParticipantChoice, Proposal, ProposalDraft, ProposalStatus,
    ProposalView,
};

/// Rooms that report an empty roster still need a quorum bar to vote
/// against; assume a typical small team.
const FALLBACK_MEMBER_COUNT: u32 = 3;

/// Agreements needed to pass, regardless of room size (single-member rooms
/// pass on one).
const PASS_AGREE_COUNT: u32 = 2;

#[derive(Debug, Error)]
pub enum VoteError {
    #[error("proposal not found")]
    NotFound,
    #[error("not a member of this room")]
    Forbidden,
    #[error("proposal is already resolved")]
    AlreadyResolved,
    #[error("an ongoing proposal for this instrument already exists")]
    DuplicateProposal,
    #[error("invalid proposal: {0}")]
    InvalidProposal(&'static str),
}

/// One live proposal per room, side and instrument code.
type ProposalKey = (u64, Side, String);

/// Runs the voting lifecycle and hands passed proposals to the execution
/// engine. Each proposal sits behind its own mutex so the whole
/// vote-tally-resolve-execute sequence is serialized per proposal.
pub struct VotingEngine {
    proposals: DashMap<u64, Arc<Mutex<Proposal>>>,
    ongoing: DashMap<ProposalKey, u64>,
    directory: Arc<dyn RoomDirectory>,
    execution: Arc<ExecutionEngine>,
    store: Arc<LedgerStore>,
    next_id: AtomicU64,
}

impl VotingEngine {
    pub fn new(
        directory: Arc<dyn RoomDirectory>,
        execution: Arc<ExecutionEngine>,
        store: Arc<LedgerStore>,
    ) -> Self {
        Self {
            proposals: DashMap::new(),
            ongoing: DashMap::new(),
            directory,
            execution,
            store,
            next_id: AtomicU64::new(1),
        }
    }

    /// Open a proposal. The proposer's agreement is recorded immediately,
    /// but resolution only ever happens on later choice submissions.
    pub async fn create_proposal(
        &self,
        room_id: u64,
        proposer_id: u64,
        proposer_name: &str,
        draft: ProposalDraft,
    ) -> Result<Proposal, VoteError> {
        let name = draft.name.trim().to_string();
        if name.is_empty() {
            return Err(VoteError::InvalidProposal("instrument name must not be blank"));
        }
        if draft.quantity == 0 {
            return Err(VoteError::InvalidProposal("quantity must be positive"));
        }
        if !self.directory.is_member(room_id, proposer_id).await {
            return Err(VoteError::Forbidden);
        }

        let mut total_members = self.directory.member_count(room_id).await as u32;
        if total_members == 0 {
            warn!(room_id, "room reports an empty roster; assuming a default headcount");
            total_members = FALLBACK_MEMBER_COUNT;
        }

        let code = draft
            .code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(str::to_string);

        let key: ProposalKey = (room_id, draft.side, code.clone().unwrap_or_default());
        let id = match self.ongoing.entry(key) {
            Entry::Occupied(_) => return Err(VoteError::DuplicateProposal),
            Entry::Vacant(slot) => {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                slot.insert(id);
                id
            }
        };

        let created_at = Utc::now();
        let proposal = Proposal {
            id,
            room_id,
            proposer_id,
            proposer_name: proposer_name.to_string(),
            side: draft.side,
            name,
            code,
            quantity: draft.quantity,
            proposed_price: draft.price.unwrap_or(Decimal::ZERO),
            reason: draft.reason,
            status: ProposalStatus::Ongoing,
            total_members,
            choices: vec![ParticipantChoice {
                member_id: proposer_id,
                member_name: proposer_name.to_string(),
                choice: Choice::Agree,
            }],
            created_at,
            expires_at: Proposal::window_from(created_at),
        };
        self.proposals.insert(id, Arc::new(Mutex::new(proposal.clone())));

        info!(
            proposal_id = id,
            room_id,
            side = %proposal.side,
            name = %proposal.name,
            total_members,
            "proposal opened"
        );
        Ok(proposal)
    }

    /// Record a member's choice and resolve the proposal if it is decided.
    pub async fn submit_choice(
        &self,
        room_id: u64,
        proposal_id: u64,
        member_id: u64,
        member_name: &str,
        choice: Choice,
    ) -> Result<ChoiceOutcome, VoteError> {
        let handle = self
            .proposals
            .get(&proposal_id)
            .map(|entry| entry.value().clone())
            .ok_or(VoteError::NotFound)?;
        let mut proposal = handle.lock().await;

        // Lookups are room-scoped; a proposal in another room does not exist
        // as far as this caller can tell.
        if proposal.room_id != room_id {
            return Err(VoteError::NotFound);
        }
        if !self.directory.is_member(room_id, member_id).await {
            return Err(VoteError::Forbidden);
        }
        if proposal.status != ProposalStatus::Ongoing {
            return Err(VoteError::AlreadyResolved);
        }

        match proposal.choices.iter_mut().find(|row| row.member_id == member_id) {
            Some(row) => {
                row.member_name = member_name.to_string();
                row.choice = choice;
            }
            None => proposal.choices.push(ParticipantChoice {
                member_id,
                member_name: member_name.to_string(),
                choice,
            }),
        }

        if let Some(status) = decide(&proposal) {
            proposal.status = status;
            let key: ProposalKey =
                (proposal.room_id, proposal.side, proposal.code.clone().unwrap_or_default());
            self.ongoing.remove_if(&key, |_, id| *id == proposal.id);
            info!(proposal_id, status = ?status, "proposal resolved");
            if status == ProposalStatus::Passed {
                self.trigger_execution(&proposal).await;
            }
        }

        Ok(ChoiceOutcome {
            proposal_id,
            choice,
            status: proposal.status,
        })
    }

    /// A room's proposals, newest first, each with the price its order
    /// actually filled at when one matches.
    pub async fn list_proposals(&self, room_id: u64) -> Vec<ProposalView> {
        let handles: Vec<Arc<Mutex<Proposal>>> = self
            .proposals
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        let mut rows = Vec::new();
        for handle in handles {
            let proposal = handle.lock().await;
            if proposal.room_id == room_id {
                rows.push(proposal.clone());
            }
        }
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let mut views = Vec::with_capacity(rows.len());
        for proposal in rows {
            let execution_price = match (proposal.status, proposal.code.as_deref()) {
                (ProposalStatus::Passed, Some(code)) => {
                    self.store
                        .latest_execution_price(room_id, code, proposal.side, proposal.created_at)
                        .await
                }
                _ => None,
            };
            views.push(ProposalView {
                proposal,
                execution_price,
            });
        }
        views
    }

    /// Fire the order for a passed proposal. Failure here never rolls the
    /// vote back; the pass stands and the miss is logged.
    async fn trigger_execution(&self, proposal: &Proposal) {
        let Some(code) = proposal.code.as_deref() else {
            warn!(
                proposal_id = proposal.id,
                name = %proposal.name,
                "proposal passed without an instrument code; no order placed"
            );
            return;
        };
        let price = if proposal.proposed_price > Decimal::ZERO {
            proposal.proposed_price
        } else {
            Decimal::ONE
        };
        let request = OrderRequest {
            code: code.to_string(),
            name: Some(proposal.name.clone()),
            quantity: proposal.quantity,
            price,
            side: proposal.side,
        };
        match self
            .execution
            .execute(proposal.room_id, proposal.proposer_id, request)
            .await
        {
            Ok(record) => {
                info!(
                    proposal_id = proposal.id,
                    order_id = record.id,
                    price = %record.price,
                    "passed proposal executed"
                );
            }
            Err(err) => {
                warn!(
                    proposal_id = proposal.id,
                    error = %err,
                    "passed proposal could not be executed"
                );
            }
        }
    }
}

/// Resolution rule. Pass takes priority; rejection needs the full roster
/// heard from and an absolute majority against.
fn decide(proposal: &Proposal) -> Option<ProposalStatus> {
    let tally = proposal.tally();
    let passed =
        tally.agree >= PASS_AGREE_COUNT || (proposal.total_members == 1 && tally.agree >= 1);
    if passed {
        return Some(ProposalStatus::Passed);
    }

    let total = proposal.total_members.max(1);
    let everyone_voted = proposal.choices.len() as u32 >= proposal.total_members;
    if everyone_voted && tally.disagree >= total / 2 + 1 {
        return Some(ProposalStatus::Rejected);
    }
    None
}
