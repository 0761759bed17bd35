//! Proposal aggregate.
//!
//! Status moves DRAFT → PENDING → APPROVED | REJECTED → LIVE. Once LIVE the
//! stage carries progress: WIP → COMPLETED when every milestone is paid, or
//! CANCELED. Milestones, invites and updates are owned children; team members
//! and followers are user links.

mod payouts;
mod team;
mod validation;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::effects::TransitionEffects;
use crate::errors::{GrantError, Result};
use crate::ids::{EntityKind, Id, IdGenerator};
use crate::milestone::{FinalMilestoneRule, Milestone, MilestoneDraft, PayoutContext};
use crate::notifications::{NotificationContext, NotificationEvent, Recipient, SiteLink};
use crate::status::{Category, MilestoneStage, ProposalStage, ProposalStatus};
use crate::user::User;

pub use team::{ProposalUpdate, TeamInvite};
pub use validation::{validate_milestone_dates_at, validate_publishable_milestones};

const PLAIN_TEXT_LIMIT: usize = 255;
const PLAIN_CONTENT_LIMIT: usize = 300_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: Id,
    /// Optimistic concurrency token, bumped on every commit
    #[serde(default)]
    pub version: u64,
    pub date_created: DateTime<Utc>,
    pub status: ProposalStatus,
    pub stage: ProposalStage,
    pub title: String,
    pub brief: String,
    pub content: String,
    pub category: Option<Category>,
    /// Decimal amount kept as entered
    pub target: String,
    pub date_approved: Option<DateTime<Utc>>,
    pub date_published: Option<DateTime<Utc>>,
    pub reject_reason: Option<String>,
    #[serde(default)]
    pub private: bool,
    pub team: Vec<User>,
    pub milestones: Vec<Milestone>,
    #[serde(default)]
    pub followers: Vec<User>,
    #[serde(default)]
    pub invites: Vec<TeamInvite>,
    #[serde(default)]
    pub updates: Vec<ProposalUpdate>,
}

/// Fields accepted when creating a draft. Category is checked against the registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewProposal {
    pub title: String,
    pub brief: String,
    pub content: String,
    pub category: Option<String>,
    pub stage: Option<String>,
    pub target: String,
    pub milestones: Vec<MilestoneDraft>,
}

/// Full edit of a draft. A non-empty milestone list replaces every milestone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProposalEdit {
    pub title: String,
    pub brief: String,
    pub category: Option<String>,
    pub content: String,
    pub target: String,
    pub milestones: Vec<MilestoneDraft>,
}

fn parse_category(category: Option<&str>) -> Result<Option<Category>> {
    match category {
        None | Some("") => Ok(None),
        Some(raw) => raw.parse().map(Some),
    }
}

fn truncate(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

impl Proposal {
    pub fn create(new: NewProposal, creator: User, ids: &mut dyn IdGenerator) -> Result<Self> {
        let category = parse_category(new.category.as_deref())?;
        let stage = match new.stage.as_deref() {
            None | Some("") => ProposalStage::Preview,
            Some(raw) => raw.parse()?,
        };
        let id = ids.next_id(EntityKind::Proposal);
        let milestones = Milestone::make(&new.milestones, id, ids);
        let target = if new.target.is_empty() {
            "0".to_string()
        } else {
            new.target
        };

        info!(proposal.id = id, creator.id = creator.id, "Proposal draft created");
        Ok(Self {
            id,
            version: 0,
            date_created: Utc::now(),
            status: ProposalStatus::Draft,
            stage,
            title: new.title,
            brief: new.brief,
            content: new.content,
            category,
            target,
            date_approved: None,
            date_published: None,
            reject_reason: None,
            private: false,
            team: vec![creator],
            milestones,
            followers: Vec::new(),
            invites: Vec::new(),
            updates: Vec::new(),
        })
    }

    pub fn label(&self) -> String {
        format!("Proposal {}", self.id)
    }

    /// Plain save of a DRAFT or REJECTED proposal. Uses the loose save-time caps.
    pub fn update(&mut self, edit: ProposalEdit, ids: &mut dyn IdGenerator) -> Result<()> {
        match self.status {
            ProposalStatus::Draft | ProposalStatus::Rejected => {}
            ProposalStatus::Pending
            | ProposalStatus::Approved
            | ProposalStatus::Live
            | ProposalStatus::Deleted => {
                return Err(GrantError::invalid_state(self.label(), self.status, "DRAFT or REJECTED"));
            }
        }
        let category = parse_category(edit.category.as_deref())?;

        self.title = truncate(&edit.title, PLAIN_TEXT_LIMIT);
        self.brief = truncate(&edit.brief, PLAIN_TEXT_LIMIT);
        self.category = category;
        self.content = truncate(&edit.content, PLAIN_CONTENT_LIMIT);
        self.target = if edit.target.is_empty() {
            "0".to_string()
        } else {
            truncate(&edit.target, PLAIN_TEXT_LIMIT)
        };
        self.replace_milestones(&edit.milestones, ids);
        Ok(())
    }

    /// Destructive replace-all. An empty list leaves the current milestones alone.
    pub fn replace_milestones(&mut self, drafts: &[MilestoneDraft], ids: &mut dyn IdGenerator) {
        if drafts.is_empty() {
            return;
        }
        self.milestones = Milestone::make(drafts, self.id, ids);
    }

    /// DRAFT | REJECTED → PENDING
    pub fn submit_for_approval(&mut self, effects: &mut TransitionEffects) -> Result<()> {
        self.validate_publishable()?;
        self.validate_milestone_dates()?;
        match self.status {
            ProposalStatus::Draft | ProposalStatus::Rejected => {}
            ProposalStatus::Pending
            | ProposalStatus::Approved
            | ProposalStatus::Live
            | ProposalStatus::Deleted => {
                return Err(GrantError::invalid_state(self.label(), self.status, "DRAFT or REJECTED"));
            }
        }

        effects.notify(
            NotificationEvent::AdminApproval,
            Recipient::Admins,
            self.admin_context(),
        );
        self.status = ProposalStatus::Pending;
        info!(proposal.id = self.id, "Proposal submitted for approval");
        Ok(())
    }

    /// PENDING → APPROVED | REJECTED
    pub fn approve_pending(
        &mut self,
        is_approve: bool,
        reject_reason: Option<&str>,
        effects: &mut TransitionEffects,
    ) -> Result<()> {
        self.validate_publishable()?;
        if self.status != ProposalStatus::Pending {
            return Err(GrantError::invalid_state(self.label(), self.status, "PENDING"));
        }

        if is_approve {
            self.status = ProposalStatus::Approved;
            self.date_approved = Some(Utc::now());
            let context = self
                .public_context("")
                .with_message("Congratulations! Your proposal has been approved.");
            effects.notify_each(NotificationEvent::ProposalApproved, self.team_recipients(), &context);
            info!(proposal.id = self.id, "Proposal approved");
        } else {
            let reason = match reject_reason.map(str::trim) {
                Some(reason) if !reason.is_empty() => reason.to_string(),
                _ => {
                    return Err(GrantError::validation(
                        "Please provide a reason for rejecting the proposal",
                    ))
                }
            };
            self.status = ProposalStatus::Rejected;
            let context = self.public_context("").with_message(reason.clone());
            self.reject_reason = Some(reason);
            effects.notify_each(NotificationEvent::ProposalRejected, self.team_recipients(), &context);
            info!(proposal.id = self.id, "Proposal rejected");
        }
        Ok(())
    }

    /// APPROVED → LIVE, stage → WIP. Pays out an immediate first milestone.
    pub fn publish(&mut self, rule: FinalMilestoneRule, effects: &mut TransitionEffects) -> Result<()> {
        self.validate_publishable()?;
        if self.status != ProposalStatus::Approved {
            return Err(GrantError::invalid_state(self.label(), self.status, "APPROVED"));
        }

        self.date_published = Some(Utc::now());
        self.status = ProposalStatus::Live;
        self.stage = ProposalStage::Wip;

        let title = self.title.clone();
        let ctx = self.payout_context(&title, rule);
        if let Some(first) = self.milestones.first_mut() {
            if first.is_immediate() && first.stage == MilestoneStage::Idle {
                first.accept_immediate(&ctx, effects)?;
            }
        }
        info!(proposal.id = self.id, "Proposal published");
        Ok(())
    }

    /// Stage → CANCELED. Only a LIVE proposal can be canceled.
    pub fn cancel(&mut self, effects: &mut TransitionEffects) -> Result<()> {
        if self.status != ProposalStatus::Live {
            return Err(GrantError::invalid_state(self.label(), self.status, "LIVE"));
        }
        self.stage = ProposalStage::Canceled;
        let context = NotificationContext::proposal(self.id, self.title.clone())
            .with_link(SiteLink::Public("/contact".to_string()));
        effects.notify_each(NotificationEvent::ProposalCanceled, self.team_recipients(), &context);
        info!(proposal.id = self.id, "Proposal canceled");
        Ok(())
    }

    pub fn ensure_deletable(&self) -> Result<()> {
        match self.status {
            ProposalStatus::Draft
            | ProposalStatus::Pending
            | ProposalStatus::Approved
            | ProposalStatus::Rejected => Ok(()),
            ProposalStatus::Live | ProposalStatus::Deleted => Err(GrantError::invalid_state(
                self.label(),
                self.status,
                "DRAFT, PENDING, APPROVED or REJECTED",
            )),
        }
    }

    pub fn is_failed(&self) -> bool {
        if self.status != ProposalStatus::Live || self.date_published.is_none() {
            return false;
        }
        matches!(self.stage, ProposalStage::Failed | ProposalStage::Canceled)
    }

    /// First milestone not yet paid, else the last one.
    pub fn current_milestone(&self) -> Option<&Milestone> {
        self.milestones
            .iter()
            .find(|m| m.stage != MilestoneStage::Paid)
            .or_else(|| self.milestones.last())
    }

    pub fn is_team_member(&self, user_id: Id) -> bool {
        self.team.iter().any(|u| u.id == user_id)
    }

    /// Payout recipient of record for history text.
    pub fn recipient_id(&self) -> Option<Id> {
        self.team.first().map(|u| u.id)
    }

    pub fn milestone(&self, milestone_id: Id) -> Result<&Milestone> {
        self.milestones
            .iter()
            .find(|m| m.id == milestone_id)
            .ok_or_else(|| GrantError::not_found(format!("No milestone {} on proposal {}", milestone_id, self.id)))
    }

    fn payout_context<'a>(&self, title: &'a str, rule: FinalMilestoneRule) -> PayoutContext<'a> {
        PayoutContext {
            proposal_id: self.id,
            proposal_title: title,
            recipient_id: self.recipient_id(),
            milestone_count: self.milestones.len(),
            final_rule: rule,
        }
    }

    fn team_recipients(&self) -> Vec<Recipient> {
        self.team.iter().cloned().map(Recipient::User).collect()
    }

    fn follower_recipients(&self) -> Vec<Recipient> {
        self.followers.iter().cloned().map(Recipient::User).collect()
    }

    fn admin_context(&self) -> NotificationContext {
        NotificationContext::proposal(self.id, self.title.clone())
            .with_link(SiteLink::Admin(format!("/proposals/{}", self.id)))
    }

    fn public_context(&self, suffix: &str) -> NotificationContext {
        NotificationContext::proposal(self.id, self.title.clone())
            .with_link(SiteLink::Public(format!("/proposals/{}{}", self.id, suffix)))
    }
}

#[cfg(test)]
mod tests;
