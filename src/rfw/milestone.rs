use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{GrantError, Result};
use crate::ids::{EntityKind, Id, IdGenerator};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RfwMilestone {
    pub id: Id,
    pub rfw_id: Id,
    pub index: usize,
    pub date_created: DateTime<Utc>,
    pub title: String,
    pub content: String,
    pub effort_from: u64,
    pub effort_to: u64,
    pub bounty: u64,
}

/// Milestone entry of an RFW create or update batch.
///
/// `is_new` entries are appended with whatever index they carry. Other entries
/// with an `id` patch the milestone of that id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RfwMilestoneInput {
    pub is_new: bool,
    pub id: Option<Id>,
    pub index: Option<usize>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub effort_from: Option<u64>,
    pub effort_to: Option<u64>,
    pub bounty: Option<u64>,
}

impl RfwMilestoneInput {
    pub fn at_index(index: usize) -> Self {
        Self {
            index: Some(index),
            ..Default::default()
        }
    }

    pub fn with_bounty(mut self, bounty: u64) -> Self {
        self.bounty = Some(bounty);
        self
    }

    pub fn with_effort(mut self, from: u64, to: u64) -> Self {
        self.effort_from = Some(from);
        self.effort_to = Some(to);
        self
    }
}

impl RfwMilestone {
    pub fn new(rfw_id: Id, input: &RfwMilestoneInput, ids: &mut dyn IdGenerator) -> Result<Self> {
        let index = input
            .index
            .ok_or_else(|| GrantError::validation("Must set index on RFW milestone"))?;
        Ok(Self {
            id: ids.next_id(EntityKind::RfwMilestone),
            rfw_id,
            index,
            date_created: Utc::now(),
            title: input.title.clone().unwrap_or_default(),
            content: input.content.clone().unwrap_or_default(),
            effort_from: input.effort_from.unwrap_or(0),
            effort_to: input.effort_to.unwrap_or(0),
            bounty: input.bounty.unwrap_or(0),
        })
    }

    /// Patch fields in place. The index may drift until the batch integrity check.
    pub fn update(&mut self, input: &RfwMilestoneInput) -> Result<()> {
        if let Some(id) = input.id {
            if id != self.id {
                return Err(GrantError::validation(
                    "Cannot update RFW milestone ids once created",
                ));
            }
        }
        if let Some(index) = input.index {
            self.index = index;
        }
        if let Some(title) = &input.title {
            self.title = title.clone();
        }
        if let Some(content) = &input.content {
            self.content = content.clone();
        }
        if let Some(effort_from) = input.effort_from {
            self.effort_from = effort_from;
        }
        if let Some(effort_to) = input.effort_to {
            self.effort_to = effort_to;
        }
        if let Some(bounty) = input.bounty {
            self.bounty = bounty;
        }
        Ok(())
    }
}
