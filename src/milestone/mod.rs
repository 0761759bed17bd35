//! Proposal milestones and their payout sub-lifecycle.
//!
//! ```text
//! IDLE ──request──▶ REQUESTED ──accept──▶ ACCEPTED ──paid──▶ PAID
//!   ▲                 │   └──────────────paid───────────────▶
//!   │              reject
//!   └─ REJECTED ◀─────┘      (REJECTED may be requested again)
//! ```
//!
//! An index-0 milestone flagged `immediate_payout` skips straight from IDLE to
//! ACCEPTED when its proposal is published.

mod history;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::effects::TransitionEffects;
use crate::errors::{GrantError, Result};
use crate::ids::{EntityKind, Id, IdGenerator};
use crate::notifications::{NotificationContext, NotificationEvent, Recipient, SiteLink};
use crate::status::MilestoneStage;

pub use history::{clean_amount, FinalMilestoneRule, PayoutContext};

const FIELD_LIMIT: usize = 255;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: Id,
    pub proposal_id: Id,
    pub index: usize,
    pub date_created: DateTime<Utc>,
    pub title: String,
    pub content: String,
    /// Decimal amount kept as entered
    pub payout_amount: String,
    pub immediate_payout: bool,
    pub date_estimated: DateTime<Utc>,
    pub stage: MilestoneStage,
    pub date_requested: Option<DateTime<Utc>>,
    pub requested_user_id: Option<Id>,
    pub date_rejected: Option<DateTime<Utc>>,
    pub reject_reason: Option<String>,
    pub date_accepted: Option<DateTime<Utc>>,
    pub date_paid: Option<DateTime<Utc>>,
    pub paid_tx_id: Option<String>,
}

/// Caller-supplied milestone fields used when replacing a proposal's milestones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MilestoneDraft {
    pub title: String,
    pub content: String,
    pub date_estimated: DateTime<Utc>,
    pub payout_amount: String,
    #[serde(default)]
    pub immediate_payout: bool,
}

impl Milestone {
    /// Build a full replacement milestone list, indexed by input position.
    pub fn make(drafts: &[MilestoneDraft], proposal_id: Id, ids: &mut dyn IdGenerator) -> Vec<Milestone> {
        let now = Utc::now();
        drafts
            .iter()
            .enumerate()
            .map(|(index, draft)| Milestone {
                id: ids.next_id(EntityKind::Milestone),
                proposal_id,
                index,
                date_created: now,
                title: truncate(&draft.title),
                content: truncate(&draft.content),
                payout_amount: truncate(&draft.payout_amount),
                immediate_payout: draft.immediate_payout,
                date_estimated: draft.date_estimated,
                stage: MilestoneStage::Idle,
                date_requested: None,
                requested_user_id: None,
                date_rejected: None,
                reject_reason: None,
                date_accepted: None,
                date_paid: None,
                paid_tx_id: None,
            })
            .collect()
    }

    fn label(&self) -> String {
        format!("Milestone {}", self.id)
    }

    /// Whether this milestone pays out as soon as its proposal goes live.
    pub fn is_immediate(&self) -> bool {
        self.immediate_payout && self.index == 0
    }

    pub fn request_payout(
        &mut self,
        requester_id: Id,
        ctx: &PayoutContext<'_>,
        effects: &mut TransitionEffects,
    ) -> Result<()> {
        match self.stage {
            MilestoneStage::Idle | MilestoneStage::Rejected => {}
            MilestoneStage::Requested | MilestoneStage::Accepted | MilestoneStage::Paid => {
                return Err(GrantError::invalid_state(self.label(), self.stage, "IDLE or REJECTED"));
            }
        }

        effects.notify(
            NotificationEvent::AdminPayout,
            Recipient::Admins,
            NotificationContext::proposal(ctx.proposal_id, ctx.proposal_title)
                .with_milestone(self.id, self.title.clone())
                .with_link(SiteLink::Admin(format!("/proposals/{}", ctx.proposal_id))),
        );
        self.stage = MilestoneStage::Requested;
        self.date_requested = Some(Utc::now());
        self.requested_user_id = Some(requester_id);
        info!(milestone.id = self.id, requester_id, "Milestone payout requested");
        Ok(())
    }

    pub fn reject_request(&mut self, reason: &str) -> Result<()> {
        if self.stage != MilestoneStage::Requested {
            return Err(GrantError::invalid_state(self.label(), self.stage, "REQUESTED"));
        }
        self.stage = MilestoneStage::Rejected;
        self.date_rejected = Some(Utc::now());
        self.reject_reason = Some(truncate(reason));
        info!(milestone.id = self.id, "Milestone payout request rejected");
        Ok(())
    }

    pub fn accept_request(&mut self, ctx: &PayoutContext<'_>, effects: &mut TransitionEffects) -> Result<()> {
        if self.stage != MilestoneStage::Requested {
            return Err(GrantError::invalid_state(self.label(), self.stage, "REQUESTED"));
        }
        let draft = self.history_event(ctx)?;
        self.stage = MilestoneStage::Accepted;
        self.date_accepted = Some(Utc::now());
        if let Some(draft) = draft {
            effects.record(draft);
        }
        info!(milestone.id = self.id, "Milestone payout request accepted");
        Ok(())
    }

    /// Accept an index-0 immediate-payout milestone without a prior request.
    pub fn accept_immediate(&mut self, ctx: &PayoutContext<'_>, effects: &mut TransitionEffects) -> Result<()> {
        if !self.is_immediate() {
            return Err(GrantError::invalid_state(
                self.label(),
                format!("index {} without immediate payout", self.index),
                "index 0 with immediate payout",
            ));
        }
        let draft = self.history_event(ctx)?;
        let now = Utc::now();
        self.date_requested = Some(now);
        self.stage = MilestoneStage::Accepted;
        self.date_accepted = Some(now);
        if let Some(draft) = draft {
            effects.record(draft);
        }
        info!(milestone.id = self.id, "Immediate milestone payout accepted");
        Ok(())
    }

    /// Also allowed straight from REQUESTED for admin reconciliation.
    pub fn mark_paid(&mut self, tx_id: Option<&str>) -> Result<()> {
        match self.stage {
            MilestoneStage::Accepted | MilestoneStage::Requested => {}
            MilestoneStage::Idle | MilestoneStage::Rejected | MilestoneStage::Paid => {
                return Err(GrantError::invalid_state(self.label(), self.stage, "ACCEPTED or REQUESTED"));
            }
        }
        self.stage = MilestoneStage::Paid;
        self.date_paid = Some(Utc::now());
        if let Some(tx_id) = tx_id {
            self.paid_tx_id = Some(truncate(tx_id));
        }
        info!(milestone.id = self.id, "Milestone marked paid");
        Ok(())
    }
}

fn truncate(text: &str) -> String {
    text.chars().take(FIELD_LIMIT).collect()
}
