use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{Aggregate, Deletion, GrantStore, UnitOfWork};
use crate::errors::{GrantError, Result};
use crate::history::HistoryEvent;
use crate::ids::{gen_random_id, EntityKind, Id};
use crate::listing::{Page, ProposalQuery};
use crate::notifications::UserDirectory;
use crate::proposal::Proposal;
use crate::rfw::Rfw;
use crate::tag::Tag;
use crate::user::User;

/// Store kept in process memory. Also serves as the user directory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
}

#[derive(Debug, Default)]
struct StoreState {
    proposals: BTreeMap<Id, Proposal>,
    rfws: BTreeMap<Id, Rfw>,
    tags: BTreeMap<Id, Tag>,
    history: Vec<HistoryEvent>,
    users: BTreeMap<Id, User>,
}

impl StoreState {
    fn stored_version(&self, aggregate: &Aggregate) -> Option<u64> {
        match aggregate {
            Aggregate::Proposal(p) => self.proposals.get(&p.id).map(|p| p.version),
            Aggregate::Rfw(r) => self.rfws.get(&r.id).map(|r| r.version),
            Aggregate::Tag(t) => self.tags.get(&t.id).map(|_| 0),
        }
    }

    fn check_upsert(&self, aggregate: &Aggregate) -> Result<()> {
        let Some(incoming) = aggregate.version() else {
            return Ok(());
        };
        match self.stored_version(aggregate) {
            Some(stored) if stored != incoming => Err(GrantError::Conflict(format!(
                "{:?} {} is at version {}, write was based on {}",
                aggregate.kind(),
                aggregate.id(),
                stored,
                incoming
            ))),
            None if incoming != 0 => Err(GrantError::Conflict(format!(
                "{:?} {} no longer exists",
                aggregate.kind(),
                aggregate.id()
            ))),
            _ => Ok(()),
        }
    }

    fn check_deletion(&self, deletion: &Deletion) -> Result<()> {
        let stored = match deletion {
            Deletion::Proposal { id, .. } => self.proposals.get(id).map(|p| Some(p.version)),
            Deletion::Rfw { id, .. } => self.rfws.get(id).map(|r| Some(r.version)),
            Deletion::Tag(id) => self.tags.get(id).map(|_| None),
        };
        let Some(stored) = stored else {
            return Err(GrantError::not_found(format!(
                "Cannot delete missing {:?} {}",
                deletion.kind(),
                deletion.id()
            )));
        };
        match (stored, deletion.version()) {
            (Some(stored), Some(expected)) if stored != expected => {
                Err(GrantError::Conflict(format!(
                    "{:?} {} is at version {}, delete was based on {}",
                    deletion.kind(),
                    deletion.id(),
                    stored,
                    expected
                )))
            }
            _ => Ok(()),
        }
    }

    fn apply_upsert(&mut self, aggregate: Aggregate) {
        match aggregate {
            Aggregate::Proposal(mut p) => {
                p.version += 1;
                self.proposals.insert(p.id, p);
            }
            Aggregate::Rfw(mut r) => {
                r.version += 1;
                self.rfws.insert(r.id, r);
            }
            Aggregate::Tag(t) => {
                self.tags.insert(t.id, t);
            }
        }
    }

    /// History rows outlive the proposal they mention.
    fn apply_deletion(&mut self, deletion: Deletion) {
        match deletion {
            Deletion::Proposal { id, .. } => {
                self.proposals.remove(&id);
            }
            Deletion::Rfw { id, .. } => {
                self.rfws.remove(&id);
            }
            Deletion::Tag(id) => {
                self.tags.remove(&id);
                for rfw in self.rfws.values_mut() {
                    if rfw.tag_ids.contains(&id) {
                        rfw.tag_ids.retain(|t| *t != id);
                        rfw.version += 1;
                    }
                }
            }
        }
    }

    fn taken_ids(&self, kind: EntityKind) -> Vec<Id> {
        let proposals = self.proposals.values();
        let rfws = self.rfws.values();
        match kind {
            EntityKind::Proposal => self.proposals.keys().copied().collect(),
            EntityKind::Milestone => proposals.flat_map(|p| p.milestones.iter().map(|m| m.id)).collect(),
            EntityKind::ProposalUpdate => proposals.flat_map(|p| p.updates.iter().map(|u| u.id)).collect(),
            EntityKind::TeamInvite => proposals.flat_map(|p| p.invites.iter().map(|i| i.id)).collect(),
            EntityKind::HistoryEvent => self.history.iter().map(|e| e.id).collect(),
            EntityKind::Rfw => self.rfws.keys().copied().collect(),
            EntityKind::RfwMilestone => rfws.flat_map(|r| r.milestones.iter().map(|m| m.id)).collect(),
            EntityKind::RfwWorker => rfws.flat_map(|r| r.workers.iter().map(|w| w.id)).collect(),
            EntityKind::RfwMilestoneClaim => rfws.flat_map(|r| r.claims.iter().map(|c| c.id)).collect(),
            EntityKind::Tag => self.tags.keys().copied().collect(),
        }
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, user: User) {
        self.state.lock().await.users.insert(user.id, user);
    }

    /// Snapshot of every stored RFW, used by portfolio views.
    pub async fn rfws(&self) -> Vec<Rfw> {
        self.state.lock().await.rfws.values().cloned().collect()
    }
}

#[async_trait]
impl GrantStore for InMemoryStore {
    async fn load_proposal(&self, id: Id) -> Result<Proposal> {
        self.state
            .lock()
            .await
            .proposals
            .get(&id)
            .cloned()
            .ok_or_else(|| GrantError::not_found(format!("No proposal matching id {}", id)))
    }

    async fn load_rfw(&self, id: Id) -> Result<Rfw> {
        self.state
            .lock()
            .await
            .rfws
            .get(&id)
            .cloned()
            .ok_or_else(|| GrantError::not_found(format!("No RFW matching id {}", id)))
    }

    async fn load_tags(&self) -> Result<Vec<Tag>> {
        Ok(self.state.lock().await.tags.values().cloned().collect())
    }

    async fn taken_ids(&self, kind: EntityKind) -> Result<Vec<Id>> {
        Ok(self.state.lock().await.taken_ids(kind))
    }

    async fn commit(&self, work: UnitOfWork) -> Result<Vec<HistoryEvent>> {
        let mut state = self.state.lock().await;

        for aggregate in &work.upserts {
            if let Err(err) = state.check_upsert(aggregate) {
                warn!(error = %err, "Rejecting stale unit of work");
                return Err(err);
            }
        }
        for deletion in &work.deletions {
            if let Err(err) = state.check_deletion(deletion) {
                warn!(error = %err, "Rejecting stale deletion");
                return Err(err);
            }
        }

        let upserts = work.upserts.len();
        for aggregate in work.upserts {
            state.apply_upsert(aggregate);
        }
        for deletion in work.deletions {
            state.apply_deletion(deletion);
        }

        let mut recorded = Vec::with_capacity(work.history.len());
        for draft in work.history {
            let id = gen_random_id(|candidate| state.history.iter().any(|e| e.id == candidate));
            let event = draft.into_event(id);
            state.history.push(event.clone());
            recorded.push(event);
        }
        debug!(upserts, history = recorded.len(), "Unit of work committed");
        Ok(recorded)
    }

    async fn history(&self, proposal_id: Option<Id>) -> Result<Vec<HistoryEvent>> {
        let state = self.state.lock().await;
        let mut events: Vec<HistoryEvent> = state
            .history
            .iter()
            .filter(|e| proposal_id.is_none() || e.proposal_id == proposal_id)
            .cloned()
            .collect();
        events.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(events)
    }

    async fn list_proposals(&self, query: ProposalQuery) -> Result<Page<Proposal>> {
        let state = self.state.lock().await;
        Ok(query.apply(state.proposals.values()))
    }
}

#[async_trait]
impl UserDirectory for InMemoryStore {
    async fn find_user(&self, id: Id) -> anyhow::Result<Option<User>> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }

    async fn find_by_email(&self, address: &str) -> anyhow::Result<Option<User>> {
        Ok(self
            .state
            .lock()
            .await
            .users
            .values()
            .find(|u| u.has_email(address))
            .cloned())
    }

    async fn admins(&self) -> anyhow::Result<Vec<User>> {
        Ok(self
            .state
            .lock()
            .await
            .users
            .values()
            .filter(|u| u.is_admin)
            .cloned()
            .collect())
    }
}
