use tracing::{info, Instrument};

use super::Lifecycle;
use crate::config::HistoryConfig;
use crate::errors::Result;
use crate::ids::{EntityKind, Id};
use crate::listing::{Page, ProposalQuery};
use crate::milestone::FinalMilestoneRule;
use crate::proposal::{NewProposal, Proposal, ProposalEdit};
use crate::store::{Deletion, UnitOfWork};
use crate::telemetry::{create_transition_span, generate_correlation_id};
use crate::user::User;

/// Proposal operations, one per lifecycle method.
#[derive(Clone)]
pub struct ProposalService {
    lifecycle: Lifecycle,
    final_rule: FinalMilestoneRule,
}

impl ProposalService {
    pub fn new(lifecycle: Lifecycle) -> Self {
        Self {
            lifecycle,
            final_rule: FinalMilestoneRule::default(),
        }
    }

    pub fn with_history_config(mut self, config: &HistoryConfig) -> Self {
        self.final_rule = config.final_milestone_rule;
        self
    }

    pub async fn get(&self, id: Id) -> Result<Proposal> {
        self.lifecycle.store().load_proposal(id).await
    }

    pub async fn list(&self, query: ProposalQuery) -> Result<Page<Proposal>> {
        self.lifecycle.store().list_proposals(query).await
    }

    pub async fn create(&self, new: NewProposal, creator: User) -> Result<Proposal> {
        self.lifecycle
            .insert("create", |ids| Proposal::create(new, creator, ids))
            .await
    }

    pub async fn update(&self, id: Id, edit: ProposalEdit) -> Result<Proposal> {
        let (proposal, ()) = self
            .lifecycle
            .transition(id, "update", self.get(id), |p, ids, _| p.update(edit, ids))
            .await?;
        Ok(proposal)
    }

    pub async fn submit_for_approval(&self, id: Id) -> Result<Proposal> {
        let (proposal, ()) = self
            .lifecycle
            .transition(id, "submit_for_approval", self.get(id), |p, _, effects| {
                p.submit_for_approval(effects)
            })
            .await?;
        Ok(proposal)
    }

    pub async fn approve_pending(
        &self,
        id: Id,
        is_approve: bool,
        reject_reason: Option<&str>,
    ) -> Result<Proposal> {
        let (proposal, ()) = self
            .lifecycle
            .transition(id, "approve_pending", self.get(id), |p, _, effects| {
                p.approve_pending(is_approve, reject_reason, effects)
            })
            .await?;
        Ok(proposal)
    }

    pub async fn publish(&self, id: Id) -> Result<Proposal> {
        let rule = self.final_rule;
        let (proposal, ()) = self
            .lifecycle
            .transition(id, "publish", self.get(id), |p, _, effects| p.publish(rule, effects))
            .await?;
        Ok(proposal)
    }

    pub async fn cancel(&self, id: Id) -> Result<Proposal> {
        let (proposal, ()) = self
            .lifecycle
            .transition(id, "cancel", self.get(id), |p, _, effects| p.cancel(effects))
            .await?;
        Ok(proposal)
    }

    /// Removes the proposal and its owned children. History is kept.
    pub async fn delete(&self, id: Id) -> Result<()> {
        let span = create_transition_span(
            EntityKind::Proposal,
            id,
            "delete",
            &generate_correlation_id(),
        );
        async {
            let proposal = self.get(id).await?;
            proposal.ensure_deletable()?;
            self.lifecycle
                .commit_work(UnitOfWork::new().delete(Deletion::proposal(&proposal)))
                .await?;
            info!(proposal.id = id, "Proposal deleted");
            Ok(())
        }
        .instrument(span)
        .await
    }

    pub async fn follow(&self, id: Id, user: &User, is_follow: bool) -> Result<Proposal> {
        let (proposal, ()) = self
            .lifecycle
            .transition(id, "follow", self.get(id), |p, _, _| {
                p.follow(user, is_follow);
                Ok(())
            })
            .await?;
        Ok(proposal)
    }

    pub async fn invite(&self, id: Id, address: &str, inviter: &User) -> Result<Id> {
        let (_, invite_id) = self
            .lifecycle
            .transition(id, "invite", self.get(id), |p, ids, effects| {
                p.invite(address, inviter, ids, effects)
            })
            .await?;
        Ok(invite_id)
    }

    pub async fn respond_to_invite(
        &self,
        id: Id,
        invite_id: Id,
        user: &User,
        accept: bool,
    ) -> Result<Proposal> {
        let (proposal, ()) = self
            .lifecycle
            .transition(id, "respond_to_invite", self.get(id), |p, _, _| {
                p.respond_to_invite(invite_id, user, accept)
            })
            .await?;
        Ok(proposal)
    }

    pub async fn remove_invite(&self, id: Id, id_or_address: &str) -> Result<Proposal> {
        let (proposal, ()) = self
            .lifecycle
            .transition(id, "remove_invite", self.get(id), |p, _, _| p.remove_invite(id_or_address))
            .await?;
        Ok(proposal)
    }

    pub async fn post_update(&self, id: Id, title: &str, content: &str) -> Result<Id> {
        let (_, update_id) = self
            .lifecycle
            .transition(id, "post_update", self.get(id), |p, ids, effects| {
                p.post_update(title, content, ids, effects)
            })
            .await?;
        Ok(update_id)
    }

    pub async fn request_milestone_payout(
        &self,
        id: Id,
        milestone_id: Id,
        requester_id: Id,
    ) -> Result<Proposal> {
        let (proposal, ()) = self
            .lifecycle
            .transition(id, "request_milestone_payout", self.get(id), |p, _, effects| {
                p.request_milestone_payout(milestone_id, requester_id, effects)
            })
            .await?;
        Ok(proposal)
    }

    pub async fn accept_milestone_payout(&self, id: Id, milestone_id: Id) -> Result<Proposal> {
        let rule = self.final_rule;
        let (proposal, ()) = self
            .lifecycle
            .transition(id, "accept_milestone_payout", self.get(id), |p, _, effects| {
                p.accept_milestone_payout(milestone_id, rule, effects)
            })
            .await?;
        Ok(proposal)
    }

    pub async fn reject_milestone_payout(
        &self,
        id: Id,
        milestone_id: Id,
        reason: &str,
    ) -> Result<Proposal> {
        let (proposal, ()) = self
            .lifecycle
            .transition(id, "reject_milestone_payout", self.get(id), |p, _, effects| {
                p.reject_milestone_payout(milestone_id, reason, effects)
            })
            .await?;
        Ok(proposal)
    }

    pub async fn mark_milestone_paid(
        &self,
        id: Id,
        milestone_id: Id,
        tx_id: Option<&str>,
    ) -> Result<Proposal> {
        let (proposal, ()) = self
            .lifecycle
            .transition(id, "mark_milestone_paid", self.get(id), |p, _, effects| {
                p.mark_milestone_paid(milestone_id, tx_id, effects)
            })
            .await?;
        Ok(proposal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::errors::GrantError;
    use crate::history::HistoryEvent;
    use crate::notifications::{MockNotifier, MockUserDirectory, NotificationDispatcher};
    use crate::store::MockGrantStore;
    use std::sync::Arc;

    fn silent_dispatcher() -> Arc<NotificationDispatcher> {
        let mut notifier = MockNotifier::new();
        notifier.expect_notify().never();
        Arc::new(NotificationDispatcher::new(
            Arc::new(notifier),
            Arc::new(MockUserDirectory::new()),
            SiteConfig::default(),
        ))
    }

    fn draft() -> Proposal {
        Proposal::create(
            NewProposal {
                title: "Wallet".to_string(),
                ..Default::default()
            },
            User::new(1, "Ann", "ann@example.com"),
            &mut crate::ids::SequentialIds::new(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_refused_transition_never_commits() {
        let mut store = MockGrantStore::new();
        store.expect_load_proposal().returning(|_| Ok(draft()));
        store.expect_taken_ids().returning(|_| Ok(Vec::new()));
        store.expect_commit().never();

        let service = ProposalService::new(Lifecycle::new(Arc::new(store), silent_dispatcher()));
        let err = service.publish(100_000).await.unwrap_err();
        assert!(matches!(err, GrantError::Validation(_) | GrantError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_conflict_surfaces_and_skips_dispatch() {
        let mut store = MockGrantStore::new();
        store.expect_load_proposal().returning(|_| Ok(draft()));
        store.expect_taken_ids().returning(|_| Ok(Vec::new()));
        store
            .expect_commit()
            .times(1)
            .returning(|_| Err(GrantError::Conflict("stale".to_string())));

        let service = ProposalService::new(Lifecycle::new(Arc::new(store), silent_dispatcher()));
        let user = User::new(2, "Bo", "bo@example.com");
        let err = service.follow(100_000, &user, true).await.unwrap_err();
        assert_eq!(err.code(), "CONFLICT");
    }

    #[tokio::test]
    async fn test_commit_carries_aggregate() {
        let mut store = MockGrantStore::new();
        store.expect_load_proposal().returning(|_| Ok(draft()));
        store.expect_taken_ids().returning(|_| Ok(Vec::new()));
        store
            .expect_commit()
            .withf(|work| match work.upserts.as_slice() {
                [crate::store::Aggregate::Proposal(p)] => {
                    p.followers.len() == 1 && work.history.is_empty()
                }
                _ => false,
            })
            .times(1)
            .returning(|_| Ok(Vec::<HistoryEvent>::new()));

        let service = ProposalService::new(Lifecycle::new(Arc::new(store), silent_dispatcher()));
        let user = User::new(2, "Bo", "bo@example.com");
        let proposal = service.follow(100_000, &user, true).await.unwrap();
        assert_eq!(proposal.version, 1);
        assert!(proposal.is_followed_by(2));
    }
}
