use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::{GrantError, Result};
use crate::ids::{EntityKind, Id, IdGenerator};
use crate::status::RfwWorkerStatus;

/// A user's request to work on an RFW. One row per (RFW, user).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RfwWorker {
    pub id: Id,
    pub rfw_id: Id,
    pub user_id: Id,
    pub date_created: DateTime<Utc>,
    pub status: RfwWorkerStatus,
    pub status_message: String,
    pub status_change_date: Option<DateTime<Utc>>,
}

impl RfwWorker {
    pub fn new(rfw_id: Id, user_id: Id, ids: &mut dyn IdGenerator) -> Self {
        Self {
            id: ids.next_id(EntityKind::RfwWorker),
            rfw_id,
            user_id,
            date_created: Utc::now(),
            status: RfwWorkerStatus::Requested,
            status_message: String::new(),
            status_change_date: None,
        }
    }

    /// Refused only while ACCEPTED; a rejected worker may ask again.
    pub fn set_requested(&mut self, message: &str) -> Result<()> {
        match self.status {
            RfwWorkerStatus::Accepted => {
                return Err(GrantError::invalid_state(
                    format!("RFW worker {}", self.id),
                    self.status,
                    "REQUESTED or REJECTED",
                ));
            }
            RfwWorkerStatus::Requested | RfwWorkerStatus::Rejected => {}
        }
        self.set_status(RfwWorkerStatus::Requested, message);
        Ok(())
    }

    pub fn set_accepted(&mut self, message: &str) {
        self.set_status(RfwWorkerStatus::Accepted, message);
    }

    pub fn set_rejected(&mut self, message: &str) {
        self.set_status(RfwWorkerStatus::Rejected, message);
    }

    fn set_status(&mut self, status: RfwWorkerStatus, message: &str) {
        let from = self.status;
        self.status = status;
        self.status_message = message.to_string();
        self.status_change_date = Some(Utc::now());
        info!(worker.id = self.id, %from, to = %status, "RFW worker status changed");
    }
}
