//! Viewer-dependent read models.
//!
//! Fields such as `authed_follows` or `is_self` depend on who is looking. The
//! viewer is always passed in; aggregates never look up the current user.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::ids::Id;
use crate::milestone::Milestone;
use crate::proposal::Proposal;
use crate::rfw::{Rfw, RfwMilestone, RfwMilestoneClaim, RfwWorker};
use crate::status::{
    Category, ProposalStage, ProposalStatus, RfwMilestoneClaimStage, RfwStatus, RfwWorkerStatus,
};
use crate::user::User;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProposalView {
    pub id: Id,
    pub status: ProposalStatus,
    pub stage: ProposalStage,
    pub title: String,
    pub brief: String,
    pub content: String,
    pub category: Option<Category>,
    pub target: String,
    pub date_published: Option<DateTime<Utc>>,
    pub team: Vec<User>,
    pub milestones: Vec<Milestone>,
    pub current_milestone: Option<Milestone>,
    pub is_failed: bool,
    pub authed_follows: bool,
    pub follower_count: usize,
}

impl ProposalView {
    pub fn new(proposal: &Proposal, viewer: Option<&User>) -> Self {
        Self {
            id: proposal.id,
            status: proposal.status,
            stage: proposal.stage,
            title: proposal.title.clone(),
            brief: proposal.brief.clone(),
            content: proposal.content.clone(),
            category: proposal.category,
            target: proposal.target.clone(),
            date_published: proposal.date_published,
            team: proposal.team.clone(),
            milestones: proposal.milestones.clone(),
            current_milestone: proposal.current_milestone().cloned(),
            is_failed: proposal.is_failed(),
            authed_follows: viewer.is_some_and(|v| proposal.is_followed_by(v.id)),
            follower_count: proposal.followers.len(),
        }
    }
}

/// Proposals a user is on the team of. Private ones are only shown to team members.
pub fn proposals_for_user<'a>(
    proposals: impl IntoIterator<Item = &'a Proposal>,
    user_id: Id,
    statuses: &[ProposalStatus],
    viewer: Option<&User>,
) -> Vec<ProposalView> {
    proposals
        .into_iter()
        .filter(|p| p.is_team_member(user_id) && statuses.contains(&p.status))
        .filter(|p| !p.private || viewer.is_some_and(|v| p.is_team_member(v.id)))
        .map(|p| ProposalView::new(p, viewer))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkerView {
    pub id: Id,
    pub user_id: Id,
    pub status: RfwWorkerStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    pub status_change_date: Option<DateTime<Utc>>,
    pub is_self: bool,
}

impl WorkerView {
    fn new(worker: &RfwWorker, viewer: Option<&User>) -> Self {
        Self {
            id: worker.id,
            user_id: worker.user_id,
            status: worker.status,
            status_message: Some(worker.status_message.clone()),
            status_change_date: worker.status_change_date,
            is_self: viewer.is_some_and(|v| v.id == worker.user_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClaimView {
    pub id: Id,
    pub worker_id: Id,
    pub milestone_id: Id,
    pub stage: RfwMilestoneClaimStage,
    pub stage_message: String,
    pub stage_url: String,
    pub stage_change_date: DateTime<Utc>,
}

impl From<&RfwMilestoneClaim> for ClaimView {
    fn from(claim: &RfwMilestoneClaim) -> Self {
        Self {
            id: claim.id,
            worker_id: claim.worker_id,
            milestone_id: claim.milestone_id,
            stage: claim.stage,
            stage_message: claim.stage_message.clone(),
            stage_url: claim.stage_url.clone(),
            stage_change_date: claim.stage_change_date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RfwMilestoneView {
    pub id: Id,
    pub index: usize,
    pub title: String,
    pub content: String,
    pub effort_from: u64,
    pub effort_to: u64,
    pub bounty: u64,
    pub claims: Vec<ClaimView>,
    pub authed_claim: Option<ClaimView>,
    pub is_authed_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RfwView {
    pub id: Id,
    pub title: String,
    pub brief: String,
    pub content: String,
    pub status: RfwStatus,
    pub category: Category,
    pub effort_from: u64,
    pub effort_to: u64,
    pub bounty: u64,
    pub milestones: Vec<RfwMilestoneView>,
    pub workers: Vec<WorkerView>,
    pub tag_ids: Vec<Id>,
    pub authed_worker: Option<WorkerView>,
}

impl RfwView {
    pub fn new(rfw: &Rfw, viewer: Option<&User>) -> Self {
        let authed_worker = viewer.and_then(|v| rfw.worker_for_user(v.id));
        let active_milestone = authed_worker.and_then(|w| active_milestone_for(rfw, w));

        let milestones = rfw
            .ordered_milestones()
            .into_iter()
            .map(|m| milestone_view(rfw, m, authed_worker, active_milestone))
            .collect();

        Self {
            id: rfw.id,
            title: rfw.title.clone(),
            brief: rfw.brief.clone(),
            content: rfw.content.clone(),
            status: rfw.status,
            category: rfw.category,
            effort_from: rfw.effort_from(),
            effort_to: rfw.effort_to(),
            bounty: rfw.bounty(),
            milestones,
            workers: rfw.workers.iter().map(|w| WorkerView::new(w, viewer)).collect(),
            tag_ids: rfw.tag_ids.clone(),
            authed_worker: authed_worker.map(|w| WorkerView::new(w, viewer)),
        }
    }
}

/// First milestone, in index order, without an accepted claim from an accepted worker.
fn active_milestone_for(rfw: &Rfw, worker: &RfwWorker) -> Option<Id> {
    if worker.status != RfwWorkerStatus::Accepted {
        return None;
    }
    let accepted: Vec<Id> = rfw
        .claims_for_worker(worker.id)
        .filter(|c| c.stage == RfwMilestoneClaimStage::Accepted)
        .map(|c| c.milestone_id)
        .collect();
    rfw.ordered_milestones()
        .into_iter()
        .find(|m| !accepted.contains(&m.id))
        .map(|m| m.id)
}

fn milestone_view(
    rfw: &Rfw,
    milestone: &RfwMilestone,
    authed_worker: Option<&RfwWorker>,
    active_milestone: Option<Id>,
) -> RfwMilestoneView {
    let authed_claim = authed_worker.and_then(|w| {
        rfw.claims_for_milestone(milestone.id)
            .find(|c| c.worker_id == w.id)
            .map(ClaimView::from)
    });
    RfwMilestoneView {
        id: milestone.id,
        index: milestone.index,
        title: milestone.title.clone(),
        content: milestone.content.clone(),
        effort_from: milestone.effort_from,
        effort_to: milestone.effort_to,
        bounty: milestone.bounty,
        claims: rfw.claims_for_milestone(milestone.id).map(ClaimView::from).collect(),
        authed_claim,
        is_authed_active: active_milestone == Some(milestone.id),
    }
}

/// One entry of a user's work portfolio.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkEntry {
    pub rfw_id: Id,
    pub rfw_title: String,
    pub worker: WorkerView,
    pub claims: Vec<ClaimView>,
}

/// Work done by `user_id` across RFWs, most recent status change first.
///
/// The owner sees everything. Anyone else only sees accepted workers and
/// their accepted claims, without status messages.
pub fn worker_portfolio<'a>(rfws: impl IntoIterator<Item = &'a Rfw>, user_id: Id, is_self: bool) -> Vec<WorkEntry> {
    let mut entries: Vec<WorkEntry> = rfws
        .into_iter()
        .filter_map(|rfw| {
            let worker = rfw.worker_for_user(user_id)?;
            if !is_self && worker.status != RfwWorkerStatus::Accepted {
                return None;
            }
            let mut view = WorkerView {
                is_self,
                ..WorkerView::new(worker, None)
            };
            if !is_self {
                view.status_message = None;
            }
            let claims = rfw
                .claims_for_worker(worker.id)
                .filter(|c| is_self || c.stage == RfwMilestoneClaimStage::Accepted)
                .map(ClaimView::from)
                .collect();
            Some(WorkEntry {
                rfw_id: rfw.id,
                rfw_title: rfw.title.clone(),
                worker: view,
                claims,
            })
        })
        .collect();
    entries.sort_by(|a, b| b.worker.status_change_date.cmp(&a.worker.status_change_date));
    entries
}
