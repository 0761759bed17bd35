//! Random entity identifiers.
//!
//! Ids are drawn uniformly from `[MIN_ID, MAX_ID]` and re-drawn on collision
//! with an id already present in the target table.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

pub type Id = u32;

pub const MIN_ID: Id = 100_000;
pub const MAX_ID: Id = 2_147_483_647;

/// Table an id belongs to. Collisions are only checked within one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Proposal,
    Milestone,
    ProposalUpdate,
    TeamInvite,
    HistoryEvent,
    Rfw,
    RfwMilestone,
    RfwWorker,
    RfwMilestoneClaim,
    Tag,
}

impl EntityKind {
    pub const ALL: [EntityKind; 10] = [
        EntityKind::Proposal,
        EntityKind::Milestone,
        EntityKind::ProposalUpdate,
        EntityKind::TeamInvite,
        EntityKind::HistoryEvent,
        EntityKind::Rfw,
        EntityKind::RfwMilestone,
        EntityKind::RfwWorker,
        EntityKind::RfwMilestoneClaim,
        EntityKind::Tag,
    ];
}

/// Draw a random id, retrying while `is_taken` reports a collision.
pub fn gen_random_id(is_taken: impl Fn(Id) -> bool) -> Id {
    let mut rng = rand::rng();
    loop {
        let candidate = rng.random_range(MIN_ID..=MAX_ID);
        if !is_taken(candidate) {
            return candidate;
        }
    }
}

pub trait IdGenerator {
    fn next_id(&mut self, kind: EntityKind) -> Id;
}

/// Random ids checked against the ids already stored per table.
///
/// Issued ids are remembered so one unit of work never hands out the same id
/// twice before it is committed.
#[derive(Debug, Default, Clone)]
pub struct RandomIds {
    taken: HashMap<EntityKind, HashSet<Id>>,
}

impl RandomIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_taken(mut self, kind: EntityKind, ids: impl IntoIterator<Item = Id>) -> Self {
        self.taken.entry(kind).or_default().extend(ids);
        self
    }
}

impl IdGenerator for RandomIds {
    fn next_id(&mut self, kind: EntityKind) -> Id {
        let taken = self.taken.entry(kind).or_default();
        let id = gen_random_id(|candidate| taken.contains(&candidate));
        taken.insert(id);
        id
    }
}

/// Deterministic ids starting at `MIN_ID`, shared across kinds.
#[derive(Debug, Clone)]
pub struct SequentialIds {
    next: Id,
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new()
    }
}

impl SequentialIds {
    pub fn new() -> Self {
        Self { next: MIN_ID }
    }

    pub fn starting_at(next: Id) -> Self {
        Self { next }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self, _kind: EntityKind) -> Id {
        let id = self.next;
        self.next += 1;
        id
    }
}
