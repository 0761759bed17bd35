//! Operation layer.
//!
//! Every lifecycle operation runs the same way: load the aggregate, apply the
//! domain transition to that copy, commit the aggregate and its history in one
//! unit of work, and only then hand the collected notifications to the
//! dispatcher. A refused transition never reaches the store.

mod history;
mod proposal;
mod rfw;

use std::future::Future;
use std::sync::Arc;
use tracing::{error, info, warn, Instrument};

use crate::effects::TransitionEffects;
use crate::errors::{GrantError, Result};
use crate::ids::{EntityKind, Id, RandomIds};
use crate::notifications::NotificationDispatcher;
use crate::observability::{lifecycle_metrics, OperationTimer};
use crate::proposal::Proposal;
use crate::rfw::Rfw;
use crate::store::{Aggregate, GrantStore, UnitOfWork};
use crate::telemetry::{create_transition_span, generate_correlation_id};

pub use history::HistoryService;
pub use proposal::ProposalService;
pub use rfw::RfwService;

/// Aggregate root that can be written through a unit of work.
pub trait Root: Clone {
    const KIND: EntityKind;

    fn root_id(&self) -> Id;

    fn version_mut(&mut self) -> &mut u64;

    fn into_aggregate(self) -> Aggregate;
}

impl Root for Proposal {
    const KIND: EntityKind = EntityKind::Proposal;

    fn root_id(&self) -> Id {
        self.id
    }

    fn version_mut(&mut self) -> &mut u64 {
        &mut self.version
    }

    fn into_aggregate(self) -> Aggregate {
        Aggregate::Proposal(self)
    }
}

impl Root for Rfw {
    const KIND: EntityKind = EntityKind::Rfw;

    fn root_id(&self) -> Id {
        self.id
    }

    fn version_mut(&mut self) -> &mut u64 {
        &mut self.version
    }

    fn into_aggregate(self) -> Aggregate {
        Aggregate::Rfw(self)
    }
}

/// Store plus dispatcher shared by the services.
#[derive(Clone)]
pub struct Lifecycle {
    store: Arc<dyn GrantStore>,
    dispatcher: Arc<NotificationDispatcher>,
}

impl Lifecycle {
    pub fn new(store: Arc<dyn GrantStore>, dispatcher: Arc<NotificationDispatcher>) -> Self {
        Self { store, dispatcher }
    }

    pub fn store(&self) -> &Arc<dyn GrantStore> {
        &self.store
    }

    pub fn dispatcher(&self) -> &Arc<NotificationDispatcher> {
        &self.dispatcher
    }

    /// Id source seeded with everything already stored.
    async fn id_generator(&self) -> Result<RandomIds> {
        let mut ids = RandomIds::new();
        for kind in EntityKind::ALL {
            ids = ids.with_taken(kind, self.store.taken_ids(kind).await?);
        }
        Ok(ids)
    }

    /// Load, transition, commit, dispatch.
    pub async fn transition<A, T, L, F>(
        &self,
        id: Id,
        operation: &'static str,
        load: L,
        apply: F,
    ) -> Result<(A, T)>
    where
        A: Root,
        L: Future<Output = Result<A>>,
        F: FnOnce(&mut A, &mut RandomIds, &mut TransitionEffects) -> Result<T>,
    {
        let correlation_id = generate_correlation_id();
        let span = create_transition_span(A::KIND, id, operation, &correlation_id);
        async move {
            let timer = OperationTimer::new(operation);
            let mut aggregate = load.await?;
            let mut ids = self.id_generator().await?;
            let mut effects = TransitionEffects::new();

            let value = apply(&mut aggregate, &mut ids, &mut effects).map_err(refused)?;
            let aggregate = self.commit(aggregate, effects).await?;
            timer.finish();
            Ok((aggregate, value))
        }
        .instrument(span)
        .await
    }

    /// Build a new aggregate and commit it.
    pub async fn insert<A, F>(&self, operation: &'static str, build: F) -> Result<A>
    where
        A: Root,
        F: FnOnce(&mut RandomIds) -> Result<A>,
    {
        let mut ids = self.id_generator().await?;
        let aggregate = build(&mut ids).map_err(refused)?;

        let correlation_id = generate_correlation_id();
        let span = create_transition_span(A::KIND, aggregate.root_id(), operation, &correlation_id);
        self.commit(aggregate, TransitionEffects::new())
            .instrument(span)
            .await
    }

    pub async fn commit_work(&self, work: UnitOfWork) -> Result<()> {
        match self.store.commit(work).await {
            Ok(_) => {
                lifecycle_metrics().record_committed();
                Ok(())
            }
            Err(err) => {
                if matches!(err, GrantError::Conflict(_)) {
                    lifecycle_metrics().record_conflict();
                }
                Err(err)
            }
        }
    }

    async fn commit<A: Root>(&self, mut aggregate: A, effects: TransitionEffects) -> Result<A> {
        let TransitionEffects {
            history,
            notifications,
        } = effects;
        let work = UnitOfWork::new()
            .upsert(aggregate.clone().into_aggregate())
            .with_history(history);
        self.commit_work(work).await?;

        *aggregate.version_mut() += 1;
        info!(
            entity.id = aggregate.root_id(),
            notifications = notifications.len(),
            "Transition committed"
        );
        self.dispatcher.dispatch(notifications).await;
        Ok(aggregate)
    }
}

fn refused(err: GrantError) -> GrantError {
    lifecycle_metrics().record_rejected();
    if err.is_user_correctable() {
        warn!(code = err.code(), error = %err, "Transition refused");
    } else {
        error!(code = err.code(), error = %err, "Transition failed an integrity check");
    }
    err
}
