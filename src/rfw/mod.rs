//! Request-for-work aggregate.
//!
//! An RFW owns its milestones, its workers (one per user) and the claims that
//! join a worker to a milestone. Tags are linked by id only. Effort and bounty
//! totals are always summed from the current milestones.

mod claim;
mod milestone;
mod worker;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info};

use crate::effects::TransitionEffects;
use crate::errors::{GrantError, Result};
use crate::ids::{EntityKind, Id, IdGenerator};
use crate::notifications::{NotificationContext, NotificationEvent, Recipient, SiteLink};
use crate::status::{Category, RfwStatus};
use crate::tag::{tag_exists, Tag};

pub use claim::RfwMilestoneClaim;
pub use milestone::{RfwMilestone, RfwMilestoneInput};
pub use worker::RfwWorker;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rfw {
    pub id: Id,
    #[serde(default)]
    pub version: u64,
    pub date_created: DateTime<Utc>,
    pub title: String,
    pub brief: String,
    pub content: String,
    pub status: RfwStatus,
    pub status_change_date: Option<DateTime<Utc>>,
    pub category: Category,
    pub milestones: Vec<RfwMilestone>,
    #[serde(default)]
    pub workers: Vec<RfwWorker>,
    #[serde(default)]
    pub claims: Vec<RfwMilestoneClaim>,
    #[serde(default)]
    pub tag_ids: Vec<Id>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewRfw {
    pub title: String,
    pub brief: String,
    pub content: String,
    pub status: Option<String>,
    pub category: Option<String>,
    /// `None` creates a single empty milestone at index 0
    pub milestones: Option<Vec<RfwMilestoneInput>>,
    pub tags: Vec<Id>,
}

/// Batch edit. `tags` is the desired full tag set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RfwEdit {
    pub title: Option<String>,
    pub brief: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub milestones: Vec<RfwMilestoneInput>,
    pub delete_milestones: Vec<Id>,
    pub tags: Vec<Id>,
}

impl Rfw {
    pub fn create(new: NewRfw, known_tags: &[Tag], ids: &mut dyn IdGenerator) -> Result<Self> {
        let status = match new.status.as_deref() {
            None | Some("") => RfwStatus::Draft,
            Some(raw) => raw.parse()?,
        };
        let category = match new.category.as_deref() {
            None | Some("") => Category::Community,
            Some(raw) => raw.parse()?,
        };

        let mut rfw = Self {
            id: ids.next_id(EntityKind::Rfw),
            version: 0,
            date_created: Utc::now(),
            title: new.title,
            brief: new.brief,
            content: new.content,
            status,
            status_change_date: None,
            category,
            milestones: Vec::new(),
            workers: Vec::new(),
            claims: Vec::new(),
            tag_ids: Vec::new(),
        };

        let milestones = new
            .milestones
            .unwrap_or_else(|| vec![RfwMilestoneInput::at_index(0)]);
        for input in &milestones {
            rfw.create_milestone(input, ids)?;
        }
        for tag_id in new.tags {
            rfw.add_tag_by_id(tag_id, known_tags);
        }
        info!(rfw.id = rfw.id, "RFW created");
        Ok(rfw)
    }

    pub fn label(&self) -> String {
        format!("RFW {}", self.id)
    }

    pub fn effort_from(&self) -> u64 {
        self.milestones.iter().map(|m| m.effort_from).sum()
    }

    pub fn effort_to(&self) -> u64 {
        self.milestones.iter().map(|m| m.effort_to).sum()
    }

    pub fn bounty(&self) -> u64 {
        self.milestones.iter().map(|m| m.bounty).sum()
    }

    pub fn check_live(&self) -> Result<()> {
        if self.status != RfwStatus::Live {
            return Err(GrantError::invalid_state(self.label(), self.status, "LIVE"));
        }
        Ok(())
    }

    /// Milestones sorted by index, the order every view uses.
    pub fn ordered_milestones(&self) -> Vec<&RfwMilestone> {
        let mut milestones: Vec<&RfwMilestone> = self.milestones.iter().collect();
        milestones.sort_by_key(|m| m.index);
        milestones
    }

    /// Indexes must be exactly 0..n-1.
    pub fn check_milestone_integrity(&self) -> Result<()> {
        for (expected, milestone) in self.ordered_milestones().into_iter().enumerate() {
            if milestone.index != expected {
                return Err(GrantError::Integrity(format!(
                    "RFW has bad milestone index for id {}. Got {}, expected {}",
                    milestone.id, milestone.index, expected
                )));
            }
        }
        Ok(())
    }

    pub fn update(
        &mut self,
        edit: RfwEdit,
        known_tags: &[Tag],
        ids: &mut dyn IdGenerator,
    ) -> Result<()> {
        if let Some(title) = edit.title {
            self.title = title;
        }
        if let Some(brief) = edit.brief {
            self.brief = brief;
        }
        if let Some(content) = edit.content {
            self.content = content;
        }
        if let Some(category) = edit.category.as_deref() {
            self.category = category.parse()?;
        }

        for input in &edit.milestones {
            if input.is_new {
                self.create_milestone(input, ids)?;
            } else if let Some(id) = input.id {
                self.update_milestone_by_id(id, input)?;
            }
        }
        for id in &edit.delete_milestones {
            self.delete_milestone_by_id(*id)?;
        }
        self.check_milestone_integrity()?;

        let desired: BTreeSet<Id> = edit.tags.iter().copied().collect();
        let to_remove: Vec<Id> = self
            .tag_ids
            .iter()
            .copied()
            .filter(|id| !desired.contains(id))
            .collect();
        for tag_id in to_remove {
            self.remove_tag_by_id(tag_id);
        }
        for tag_id in edit.tags {
            self.add_tag_by_id(tag_id, known_tags);
        }
        info!(rfw.id = self.id, "RFW updated");
        Ok(())
    }

    pub fn get_milestone_by_id(&self, id: Id) -> Result<&RfwMilestone> {
        self.milestones
            .iter()
            .find(|m| m.id == id)
            .ok_or_else(|| {
                GrantError::not_found(format!("Could not find RFW milestone with id {}", id))
            })
    }

    fn milestone_mut(&mut self, id: Id) -> Result<&mut RfwMilestone> {
        self.milestones
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| {
                GrantError::not_found(format!("Could not find RFW milestone with id {}", id))
            })
    }

    pub fn update_milestone_by_id(
        &mut self,
        id: Id,
        input: &RfwMilestoneInput,
    ) -> Result<&RfwMilestone> {
        let milestone = self.milestone_mut(id)?;
        milestone.update(input)?;
        Ok(milestone)
    }

    /// Removes the milestone and its claims, then re-indexes the rest from 0.
    pub fn delete_milestone_by_id(&mut self, id: Id) -> Result<()> {
        self.get_milestone_by_id(id)?;
        self.milestones.retain(|m| m.id != id);
        self.claims.retain(|c| c.milestone_id != id);

        self.milestones.sort_by_key(|m| m.index);
        for (index, milestone) in self.milestones.iter_mut().enumerate() {
            milestone.index = index;
        }
        debug!(rfw.id = self.id, milestone.id = id, "RFW milestone deleted");
        Ok(())
    }

    /// Appends with the caller's index; no integrity check here.
    pub fn create_milestone(
        &mut self,
        input: &RfwMilestoneInput,
        ids: &mut dyn IdGenerator,
    ) -> Result<Id> {
        let milestone = RfwMilestone::new(self.id, input, ids)?;
        let id = milestone.id;
        self.milestones.push(milestone);
        Ok(id)
    }

    /// Index is max existing index + 1, so a gap left by a deletion is not refilled.
    pub fn create_next_milestone(
        &mut self,
        input: &RfwMilestoneInput,
        ids: &mut dyn IdGenerator,
    ) -> Result<Id> {
        let next_index = self
            .milestones
            .iter()
            .map(|m| m.index as i64)
            .max()
            .unwrap_or(-1)
            + 1;
        let input = RfwMilestoneInput {
            index: Some(next_index as usize),
            ..input.clone()
        };
        self.create_milestone(&input, ids)
    }

    pub fn worker_for_user(&self, user_id: Id) -> Option<&RfwWorker> {
        self.workers.iter().find(|w| w.user_id == user_id)
    }

    pub fn get_worker_by_id(&self, id: Id) -> Result<&RfwWorker> {
        self.workers.iter().find(|w| w.id == id).ok_or_else(|| {
            GrantError::not_found(format!(
                "Could not find worker with id {} for RFW with id {}",
                id, self.id
            ))
        })
    }

    fn worker_mut(&mut self, id: Id) -> Result<&mut RfwWorker> {
        let rfw_id = self.id;
        self.workers.iter_mut().find(|w| w.id == id).ok_or_else(|| {
            GrantError::not_found(format!(
                "Could not find worker with id {} for RFW with id {}",
                id, rfw_id
            ))
        })
    }

    /// Reuses the user's worker row when one exists.
    pub fn create_worker_by_user_id_and_request(
        &mut self,
        user_id: Id,
        message: &str,
        ids: &mut dyn IdGenerator,
        effects: &mut TransitionEffects,
    ) -> Result<Id> {
        self.check_live()?;
        let rfw_id = self.id;
        let position = match self.workers.iter().position(|w| w.user_id == user_id) {
            Some(position) => position,
            None => {
                self.workers.push(RfwWorker::new(rfw_id, user_id, ids));
                self.workers.len() - 1
            }
        };
        let worker = &mut self.workers[position];
        worker.set_requested(message)?;
        let worker_id = worker.id;

        let mut context = self.admin_context();
        context.worker_id = Some(worker_id);
        effects.notify(NotificationEvent::AdminWorkerRequest, Recipient::Admins, context);
        Ok(worker_id)
    }

    pub fn accept_worker_by_id(
        &mut self,
        id: Id,
        message: &str,
        effects: &mut TransitionEffects,
    ) -> Result<()> {
        let worker = self.worker_mut(id)?;
        worker.set_accepted(message);
        let user_id = worker.user_id;
        self.notify_worker(NotificationEvent::WorkerApproved, user_id, id, message, effects);
        Ok(())
    }

    pub fn reject_worker_by_id(
        &mut self,
        id: Id,
        message: &str,
        effects: &mut TransitionEffects,
    ) -> Result<()> {
        let worker = self.worker_mut(id)?;
        worker.set_rejected(message);
        let user_id = worker.user_id;
        self.notify_worker(NotificationEvent::WorkerRejected, user_id, id, message, effects);
        Ok(())
    }

    /// Validates both ids belong to this RFW before looking for the pair.
    pub fn get_existing_claim(
        &self,
        worker_id: Id,
        milestone_id: Id,
    ) -> Result<Option<&RfwMilestoneClaim>> {
        self.get_worker_by_id(worker_id)?;
        self.get_milestone_by_id(milestone_id)?;
        Ok(self
            .claims
            .iter()
            .find(|c| c.worker_id == worker_id && c.milestone_id == milestone_id))
    }

    pub fn claims_for_milestone(
        &self,
        milestone_id: Id,
    ) -> impl Iterator<Item = &RfwMilestoneClaim> {
        self.claims.iter().filter(move |c| c.milestone_id == milestone_id)
    }

    pub fn claims_for_worker(&self, worker_id: Id) -> impl Iterator<Item = &RfwMilestoneClaim> {
        self.claims.iter().filter(move |c| c.worker_id == worker_id)
    }

    /// First claim creates the row; later calls re-request a rejected claim.
    pub fn request_milestone_claim(
        &mut self,
        worker_id: Id,
        milestone_id: Id,
        message: &str,
        url: &str,
        ids: &mut dyn IdGenerator,
        effects: &mut TransitionEffects,
    ) -> Result<Id> {
        self.check_live()?;
        let existing = self.get_existing_claim(worker_id, milestone_id)?.map(|c| c.id);
        let claim_id = match existing {
            Some(claim_id) => {
                self.claim_mut(milestone_id, claim_id)?.set_requested(message, url)?;
                claim_id
            }
            None => {
                let claim = RfwMilestoneClaim::new(worker_id, milestone_id, message, url, ids);
                let claim_id = claim.id;
                self.claims.push(claim);
                claim_id
            }
        };

        let milestone_title = self.get_milestone_by_id(milestone_id)?.title.clone();
        let mut context = self.admin_context().with_milestone(milestone_id, milestone_title);
        context.worker_id = Some(worker_id);
        context.claim_id = Some(claim_id);
        effects.notify(NotificationEvent::AdminWorkMilestoneClaim, Recipient::Admins, context);
        Ok(claim_id)
    }

    pub fn get_claim_by_id(&self, milestone_id: Id, claim_id: Id) -> Result<&RfwMilestoneClaim> {
        self.get_milestone_by_id(milestone_id)?;
        self.claims
            .iter()
            .find(|c| c.milestone_id == milestone_id && c.id == claim_id)
            .ok_or_else(|| {
                GrantError::not_found(format!(
                    "Could not find claim {} on RFW milestone {}",
                    claim_id, milestone_id
                ))
            })
    }

    fn claim_mut(&mut self, milestone_id: Id, claim_id: Id) -> Result<&mut RfwMilestoneClaim> {
        self.get_milestone_by_id(milestone_id)?;
        self.claims
            .iter_mut()
            .find(|c| c.milestone_id == milestone_id && c.id == claim_id)
            .ok_or_else(|| {
                GrantError::not_found(format!(
                    "Could not find claim {} on RFW milestone {}",
                    claim_id, milestone_id
                ))
            })
    }

    pub fn accept_milestone_claim(
        &mut self,
        milestone_id: Id,
        claim_id: Id,
        message: &str,
        effects: &mut TransitionEffects,
    ) -> Result<()> {
        let claim = self.claim_mut(milestone_id, claim_id)?;
        claim.set_accepted(message)?;
        let worker_id = claim.worker_id;
        self.notify_claim(
            NotificationEvent::WorkMilestoneAccepted,
            milestone_id,
            claim_id,
            worker_id,
            message,
            effects,
        )
    }

    pub fn reject_milestone_claim(
        &mut self,
        milestone_id: Id,
        claim_id: Id,
        message: &str,
        effects: &mut TransitionEffects,
    ) -> Result<()> {
        let claim = self.claim_mut(milestone_id, claim_id)?;
        claim.set_rejected(message)?;
        let worker_id = claim.worker_id;
        self.notify_claim(
            NotificationEvent::WorkMilestoneRejected,
            milestone_id,
            claim_id,
            worker_id,
            message,
            effects,
        )
    }

    /// Unknown tag ids are ignored; an already linked tag is not linked twice.
    pub fn add_tag_by_id(&mut self, tag_id: Id, known_tags: &[Tag]) {
        if !tag_exists(known_tags, tag_id) {
            debug!(rfw.id = self.id, tag.id = tag_id, "Ignoring unknown tag");
            return;
        }
        if !self.tag_ids.contains(&tag_id) {
            self.tag_ids.push(tag_id);
        }
    }

    pub fn remove_tag_by_id(&mut self, tag_id: Id) {
        self.tag_ids.retain(|id| *id != tag_id);
    }

    /// DRAFT → LIVE
    pub fn publish(&mut self) -> Result<()> {
        if self.status != RfwStatus::Draft {
            return Err(GrantError::invalid_state(self.label(), self.status, "DRAFT"));
        }
        self.set_status(RfwStatus::Live);
        Ok(())
    }

    /// LIVE → CLOSED
    pub fn close(&mut self) -> Result<()> {
        if self.status != RfwStatus::Live {
            return Err(GrantError::invalid_state(self.label(), self.status, "LIVE"));
        }
        self.set_status(RfwStatus::Closed);
        Ok(())
    }

    fn set_status(&mut self, status: RfwStatus) {
        let from = self.status;
        self.status = status;
        self.status_change_date = Some(Utc::now());
        info!(rfw.id = self.id, %from, to = %status, "RFW status changed");
    }

    fn admin_context(&self) -> NotificationContext {
        NotificationContext::rfw(self.id, self.title.clone())
            .with_link(SiteLink::Admin(format!("/bounties/{}", self.id)))
    }

    fn public_context(&self) -> NotificationContext {
        NotificationContext::rfw(self.id, self.title.clone())
            .with_link(SiteLink::Public(format!("/rfws/{}", self.id)))
    }

    fn notify_worker(
        &self,
        event: NotificationEvent,
        user_id: Id,
        worker_id: Id,
        message: &str,
        effects: &mut TransitionEffects,
    ) {
        let mut context = self.public_context().with_message(message);
        context.worker_id = Some(worker_id);
        effects.notify(event, Recipient::UserId(user_id), context);
    }

    fn notify_claim(
        &self,
        event: NotificationEvent,
        milestone_id: Id,
        claim_id: Id,
        worker_id: Id,
        message: &str,
        effects: &mut TransitionEffects,
    ) -> Result<()> {
        let user_id = self.get_worker_by_id(worker_id)?.user_id;
        let milestone_title = self.get_milestone_by_id(milestone_id)?.title.clone();
        let mut context = self
            .public_context()
            .with_milestone(milestone_id, milestone_title)
            .with_message(message);
        context.worker_id = Some(worker_id);
        context.claim_id = Some(claim_id);
        effects.notify(event, Recipient::UserId(user_id), context);
        Ok(())
    }
}
