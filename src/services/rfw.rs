use std::sync::Arc;
use tracing::{info, Instrument};

use super::Lifecycle;
use crate::errors::{GrantError, Result};
use crate::ids::{EntityKind, Id, RandomIds};
use crate::notifications::UserDirectory;
use crate::rfw::{NewRfw, Rfw, RfwEdit, RfwMilestoneInput};
use crate::store::{Aggregate, Deletion, UnitOfWork};
use crate::tag::Tag;
use crate::telemetry::{create_transition_span, generate_correlation_id};

/// RFW, worker and claim operations.
#[derive(Clone)]
pub struct RfwService {
    lifecycle: Lifecycle,
    users: Arc<dyn UserDirectory>,
}

impl RfwService {
    pub fn new(lifecycle: Lifecycle, users: Arc<dyn UserDirectory>) -> Self {
        Self { lifecycle, users }
    }

    pub async fn get(&self, id: Id) -> Result<Rfw> {
        self.lifecycle.store().load_rfw(id).await
    }

    pub async fn tags(&self) -> Result<Vec<Tag>> {
        self.lifecycle.store().load_tags().await
    }

    pub async fn create(&self, new: NewRfw) -> Result<Rfw> {
        let tags = self.tags().await?;
        self.lifecycle
            .insert("create", |ids| Rfw::create(new, &tags, ids))
            .await
    }

    pub async fn update(&self, id: Id, edit: RfwEdit) -> Result<Rfw> {
        let tags = self.tags().await?;
        let (rfw, ()) = self
            .lifecycle
            .transition(id, "update", self.get(id), |rfw, ids, _| rfw.update(edit, &tags, ids))
            .await?;
        Ok(rfw)
    }

    pub async fn publish(&self, id: Id) -> Result<Rfw> {
        let (rfw, ()) = self
            .lifecycle
            .transition(id, "publish", self.get(id), |rfw, _, _| rfw.publish())
            .await?;
        Ok(rfw)
    }

    pub async fn close(&self, id: Id) -> Result<Rfw> {
        let (rfw, ()) = self
            .lifecycle
            .transition(id, "close", self.get(id), |rfw, _, _| rfw.close())
            .await?;
        Ok(rfw)
    }

    /// Cascades milestones, workers and claims. Linked tags stay.
    pub async fn delete(&self, id: Id) -> Result<()> {
        let span = create_transition_span(
            EntityKind::Rfw,
            id,
            "delete",
            &generate_correlation_id(),
        );
        async {
            let rfw = self.get(id).await?;
            self.lifecycle
                .commit_work(UnitOfWork::new().delete(Deletion::rfw(&rfw)))
                .await?;
            info!(rfw.id = id, "RFW deleted");
            Ok(())
        }
        .instrument(span)
        .await
    }

    pub async fn create_next_milestone(&self, id: Id, input: RfwMilestoneInput) -> Result<Id> {
        let (_, milestone_id) = self
            .lifecycle
            .transition(id, "create_next_milestone", self.get(id), |rfw, ids, _| {
                rfw.create_next_milestone(&input, ids)
            })
            .await?;
        Ok(milestone_id)
    }

    pub async fn delete_milestone(&self, id: Id, milestone_id: Id) -> Result<Rfw> {
        let (rfw, ()) = self
            .lifecycle
            .transition(id, "delete_milestone", self.get(id), |rfw, _, _| {
                rfw.delete_milestone_by_id(milestone_id)
            })
            .await?;
        Ok(rfw)
    }

    pub async fn request_work(&self, id: Id, user_id: Id, message: &str) -> Result<Id> {
        let user = self
            .users
            .find_user(user_id)
            .await
            .map_err(|e| GrantError::Storage(e.to_string()))?;
        if user.is_none() {
            return Err(GrantError::not_found(format!(
                "Could not create a worker for RFW because user {} not found",
                user_id
            )));
        }
        let (_, worker_id) = self
            .lifecycle
            .transition(id, "request_work", self.get(id), |rfw, ids, effects| {
                rfw.create_worker_by_user_id_and_request(user_id, message, ids, effects)
            })
            .await?;
        Ok(worker_id)
    }

    pub async fn accept_worker(&self, id: Id, worker_id: Id, message: &str) -> Result<Rfw> {
        let (rfw, ()) = self
            .lifecycle
            .transition(id, "accept_worker", self.get(id), |rfw, _, effects| {
                rfw.accept_worker_by_id(worker_id, message, effects)
            })
            .await?;
        Ok(rfw)
    }

    pub async fn reject_worker(&self, id: Id, worker_id: Id, message: &str) -> Result<Rfw> {
        let (rfw, ()) = self
            .lifecycle
            .transition(id, "reject_worker", self.get(id), |rfw, _, effects| {
                rfw.reject_worker_by_id(worker_id, message, effects)
            })
            .await?;
        Ok(rfw)
    }

    pub async fn request_milestone_claim(
        &self,
        id: Id,
        worker_id: Id,
        milestone_id: Id,
        message: &str,
        url: &str,
    ) -> Result<Id> {
        let (_, claim_id) = self
            .lifecycle
            .transition(id, "request_milestone_claim", self.get(id), |rfw, ids, effects| {
                rfw.request_milestone_claim(worker_id, milestone_id, message, url, ids, effects)
            })
            .await?;
        Ok(claim_id)
    }

    pub async fn accept_milestone_claim(
        &self,
        id: Id,
        milestone_id: Id,
        claim_id: Id,
        message: &str,
    ) -> Result<Rfw> {
        let (rfw, ()) = self
            .lifecycle
            .transition(id, "accept_milestone_claim", self.get(id), |rfw, _, effects| {
                rfw.accept_milestone_claim(milestone_id, claim_id, message, effects)
            })
            .await?;
        Ok(rfw)
    }

    pub async fn reject_milestone_claim(
        &self,
        id: Id,
        milestone_id: Id,
        claim_id: Id,
        message: &str,
    ) -> Result<Rfw> {
        let (rfw, ()) = self
            .lifecycle
            .transition(id, "reject_milestone_claim", self.get(id), |rfw, _, effects| {
                rfw.reject_milestone_claim(milestone_id, claim_id, message, effects)
            })
            .await?;
        Ok(rfw)
    }

    pub async fn create_tag(&self, text: &str, description: &str, color: &str) -> Result<Tag> {
        let taken = self.lifecycle.store().taken_ids(EntityKind::Tag).await?;
        let mut ids = RandomIds::new().with_taken(EntityKind::Tag, taken);
        let tag = Tag::create(text, description, color, &mut ids)?;
        self.lifecycle
            .commit_work(UnitOfWork::new().upsert(Aggregate::Tag(tag.clone())))
            .await?;
        info!(tag.id = tag.id, "Tag created");
        Ok(tag)
    }

    /// Unlinks the tag from every RFW.
    pub async fn delete_tag(&self, tag_id: Id) -> Result<()> {
        self.lifecycle
            .commit_work(UnitOfWork::new().delete(Deletion::Tag(tag_id)))
            .await?;
        info!(tag.id = tag_id, "Tag deleted");
        Ok(())
    }
}
