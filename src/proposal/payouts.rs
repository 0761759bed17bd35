use tracing::info;

use super::Proposal;
use crate::effects::TransitionEffects;
use crate::errors::{GrantError, Result};
use crate::ids::Id;
use crate::milestone::{FinalMilestoneRule, Milestone};
use crate::notifications::NotificationEvent;
use crate::status::{MilestoneStage, ProposalStage, ProposalStatus};

impl Proposal {
    fn milestone_mut(&mut self, milestone_id: Id) -> Result<&mut Milestone> {
        let proposal_id = self.id;
        self.milestones
            .iter_mut()
            .find(|m| m.id == milestone_id)
            .ok_or_else(|| GrantError::not_found(format!("No milestone {} on proposal {}", milestone_id, proposal_id)))
    }

    /// Team member asks for a milestone payout.
    pub fn request_milestone_payout(
        &mut self,
        milestone_id: Id,
        requester_id: Id,
        effects: &mut TransitionEffects,
    ) -> Result<()> {
        let title = self.title.clone();
        let ctx = self.payout_context(&title, FinalMilestoneRule::default());
        self.milestone_mut(milestone_id)?
            .request_payout(requester_id, &ctx, effects)
    }

    /// Admin accepts a requested payout; records the payout in history.
    pub fn accept_milestone_payout(
        &mut self,
        milestone_id: Id,
        rule: FinalMilestoneRule,
        effects: &mut TransitionEffects,
    ) -> Result<()> {
        let title = self.title.clone();
        let ctx = self.payout_context(&title, rule);
        self.milestone_mut(milestone_id)?.accept_request(&ctx, effects)
    }

    /// Admin rejects a requested payout; the team is told why.
    pub fn reject_milestone_payout(
        &mut self,
        milestone_id: Id,
        reason: &str,
        effects: &mut TransitionEffects,
    ) -> Result<()> {
        let milestone = self.milestone_mut(milestone_id)?;
        milestone.reject_request(reason)?;
        let milestone_title = milestone.title.clone();

        let context = self
            .public_context("?tab=milestones")
            .with_milestone(milestone_id, milestone_title)
            .with_message(reason);
        effects.notify_each(NotificationEvent::MilestoneReject, self.team_recipients(), &context);
        Ok(())
    }

    /// Admin records a payout. Completes the proposal once every milestone is paid.
    pub fn mark_milestone_paid(
        &mut self,
        milestone_id: Id,
        tx_id: Option<&str>,
        effects: &mut TransitionEffects,
    ) -> Result<()> {
        if self.status != ProposalStatus::Live {
            return Err(GrantError::invalid_state(self.label(), self.status, "LIVE"));
        }
        let milestone = self.milestone_mut(milestone_id)?;
        milestone.mark_paid(tx_id)?;
        let milestone_title = milestone.title.clone();
        let amount = milestone.payout_amount.clone();

        if self.milestones.iter().all(|m| m.stage == MilestoneStage::Paid) {
            self.stage = ProposalStage::Completed;
            info!(proposal.id = self.id, "Every milestone paid, proposal completed");
        }

        let context = self
            .public_context("?tab=milestones")
            .with_milestone(milestone_id, milestone_title)
            .with_amount(amount);
        effects.notify_each(NotificationEvent::MilestonePaid, self.team_recipients(), &context);
        effects.notify_each(
            NotificationEvent::FollowedProposalMilestone,
            self.follower_recipients(),
            &context,
        );
        Ok(())
    }
}
