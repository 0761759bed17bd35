//! Persistence boundary.
//!
//! Services load aggregates, transition a clone, then hand the result to
//! [`GrantStore::commit`] as one [`UnitOfWork`]. The store applies every
//! upsert, deletion and history draft atomically or none of them.

mod memory;

use async_trait::async_trait;

#[cfg(any(test, feature = "testing"))]
use mockall::automock;

use crate::errors::Result;
use crate::history::{HistoryDraft, HistoryEvent};
use crate::ids::{EntityKind, Id};
use crate::listing::{Page, ProposalQuery};
use crate::proposal::Proposal;
use crate::rfw::Rfw;
use crate::tag::Tag;

pub use memory::InMemoryStore;

/// Root entity written by a unit of work. Owned children travel with it.
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregate {
    Proposal(Proposal),
    Rfw(Rfw),
    Tag(Tag),
}

impl Aggregate {
    pub fn kind(&self) -> EntityKind {
        match self {
            Aggregate::Proposal(_) => EntityKind::Proposal,
            Aggregate::Rfw(_) => EntityKind::Rfw,
            Aggregate::Tag(_) => EntityKind::Tag,
        }
    }

    pub fn id(&self) -> Id {
        match self {
            Aggregate::Proposal(p) => p.id,
            Aggregate::Rfw(r) => r.id,
            Aggregate::Tag(t) => t.id,
        }
    }

    /// Tags are shared reference data and are not version checked.
    pub fn version(&self) -> Option<u64> {
        match self {
            Aggregate::Proposal(p) => Some(p.version),
            Aggregate::Rfw(r) => Some(r.version),
            Aggregate::Tag(_) => None,
        }
    }
}

/// Aggregate removal. Proposals and RFWs take their owned children with them;
/// tags and users are only unlinked.
///
/// `version` is the one the caller loaded; a newer stored version fails the
/// commit with `Conflict` like a stale upsert does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deletion {
    Proposal { id: Id, version: u64 },
    Rfw { id: Id, version: u64 },
    Tag(Id),
}

impl Deletion {
    pub fn proposal(proposal: &Proposal) -> Self {
        Deletion::Proposal {
            id: proposal.id,
            version: proposal.version,
        }
    }

    pub fn rfw(rfw: &Rfw) -> Self {
        Deletion::Rfw {
            id: rfw.id,
            version: rfw.version,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Deletion::Proposal { .. } => EntityKind::Proposal,
            Deletion::Rfw { .. } => EntityKind::Rfw,
            Deletion::Tag(_) => EntityKind::Tag,
        }
    }

    pub fn id(&self) -> Id {
        match self {
            Deletion::Proposal { id, .. } | Deletion::Rfw { id, .. } | Deletion::Tag(id) => *id,
        }
    }

    /// Tags are not version checked.
    pub fn version(&self) -> Option<u64> {
        match self {
            Deletion::Proposal { version, .. } | Deletion::Rfw { version, .. } => Some(*version),
            Deletion::Tag(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitOfWork {
    pub upserts: Vec<Aggregate>,
    pub deletions: Vec<Deletion>,
    pub history: Vec<HistoryDraft>,
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(mut self, aggregate: Aggregate) -> Self {
        self.upserts.push(aggregate);
        self
    }

    pub fn delete(mut self, deletion: Deletion) -> Self {
        self.deletions.push(deletion);
        self
    }

    pub fn with_history(mut self, drafts: impl IntoIterator<Item = HistoryDraft>) -> Self {
        self.history.extend(drafts);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.deletions.is_empty() && self.history.is_empty()
    }
}

#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait GrantStore: Send + Sync {
    async fn load_proposal(&self, id: Id) -> Result<Proposal>;

    async fn load_rfw(&self, id: Id) -> Result<Rfw>;

    async fn load_tags(&self) -> Result<Vec<Tag>>;

    /// Every id currently stored for one entity kind
    async fn taken_ids(&self, kind: EntityKind) -> Result<Vec<Id>>;

    /// Apply a unit of work. A stale aggregate version fails with `Conflict`.
    async fn commit(&self, work: UnitOfWork) -> Result<Vec<HistoryEvent>>;

    /// History newest first, optionally for one proposal
    async fn history(&self, proposal_id: Option<Id>) -> Result<Vec<HistoryEvent>>;

    async fn list_proposals(&self, query: ProposalQuery) -> Result<Page<Proposal>>;
}
