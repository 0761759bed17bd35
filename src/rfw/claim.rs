use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::{GrantError, Result};
use crate::ids::{EntityKind, Id, IdGenerator};
use crate::status::RfwMilestoneClaimStage;

/// A worker's claim of completed work on one RFW milestone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RfwMilestoneClaim {
    pub id: Id,
    pub worker_id: Id,
    pub milestone_id: Id,
    pub date_created: DateTime<Utc>,
    pub stage: RfwMilestoneClaimStage,
    pub stage_message: String,
    pub stage_url: String,
    pub stage_change_date: DateTime<Utc>,
}

impl RfwMilestoneClaim {
    pub fn new(worker_id: Id, milestone_id: Id, message: &str, url: &str, ids: &mut dyn IdGenerator) -> Self {
        let now = Utc::now();
        Self {
            id: ids.next_id(EntityKind::RfwMilestoneClaim),
            worker_id,
            milestone_id,
            date_created: now,
            stage: RfwMilestoneClaimStage::Requested,
            stage_message: message.to_string(),
            stage_url: url.to_string(),
            stage_change_date: now,
        }
    }

    fn refuse(&self, expected: &str) -> GrantError {
        GrantError::invalid_state(format!("Claim {}", self.id), self.stage, expected)
    }

    /// Re-open a rejected claim.
    pub fn set_requested(&mut self, message: &str, url: &str) -> Result<()> {
        match self.stage {
            RfwMilestoneClaimStage::Rejected => {}
            RfwMilestoneClaimStage::Accepted | RfwMilestoneClaimStage::Requested => {
                return Err(self.refuse("REJECTED"));
            }
        }
        self.stage = RfwMilestoneClaimStage::Requested;
        self.stage_message = message.to_string();
        self.stage_url = url.to_string();
        self.stage_change_date = Utc::now();
        info!(claim.id = self.id, "Milestone claim re-requested");
        Ok(())
    }

    pub fn set_accepted(&mut self, message: &str) -> Result<()> {
        match self.stage {
            RfwMilestoneClaimStage::Requested => {}
            RfwMilestoneClaimStage::Accepted | RfwMilestoneClaimStage::Rejected => {
                return Err(self.refuse("REQUESTED"));
            }
        }
        self.stage = RfwMilestoneClaimStage::Accepted;
        self.stage_message = message.to_string();
        self.stage_change_date = Utc::now();
        info!(claim.id = self.id, "Milestone claim accepted");
        Ok(())
    }

    /// Rejection drops the submitted url.
    pub fn set_rejected(&mut self, message: &str) -> Result<()> {
        match self.stage {
            RfwMilestoneClaimStage::Requested => {}
            RfwMilestoneClaimStage::Accepted | RfwMilestoneClaimStage::Rejected => {
                return Err(self.refuse("REQUESTED"));
            }
        }
        self.stage = RfwMilestoneClaimStage::Rejected;
        self.stage_message = message.to_string();
        self.stage_change_date = Utc::now();
        self.stage_url.clear();
        info!(claim.id = self.id, "Milestone claim rejected");
        Ok(())
    }
}
