use std::collections::HashMap;
use std::sync::Arc;

use crate::config::SiteConfig;
use crate::errors::{GrantError, Result};
use crate::history::{HistoryEventView, HistorySubjects};
use crate::ids::Id;
use crate::notifications::UserDirectory;
use crate::store::GrantStore;
use crate::user::User;

/// Renders the history ledger with the current names of its subjects.
#[derive(Clone)]
pub struct HistoryService {
    store: Arc<dyn GrantStore>,
    users: Arc<dyn UserDirectory>,
    site: SiteConfig,
}

impl HistoryService {
    pub fn new(
        store: Arc<dyn GrantStore>,
        users: Arc<dyn UserDirectory>,
        site: SiteConfig,
    ) -> Self {
        Self { store, users, site }
    }

    /// Newest first. Events about a deleted proposal keep their raw placeholder.
    pub async fn list(&self, proposal_id: Option<Id>) -> Result<Vec<HistoryEventView>> {
        let events = self.store.history(proposal_id).await?;

        let mut users: HashMap<Id, Option<User>> = HashMap::new();
        let mut titles: HashMap<Id, Option<String>> = HashMap::new();
        for event in &events {
            if let Some(user_id) = event.user_id {
                if !users.contains_key(&user_id) {
                    let user = self
                        .users
                        .find_user(user_id)
                        .await
                        .map_err(|e| GrantError::Storage(e.to_string()))?;
                    users.insert(user_id, user);
                }
            }
            if let Some(proposal_id) = event.proposal_id {
                if !titles.contains_key(&proposal_id) {
                    let title = match self.store.load_proposal(proposal_id).await {
                        Ok(proposal) => Some(proposal.title),
                        Err(GrantError::NotFound(_)) => None,
                        Err(err) => return Err(err),
                    };
                    titles.insert(proposal_id, title);
                }
            }
        }

        Ok(events
            .iter()
            .map(|event| {
                let subjects = HistorySubjects {
                    user: event.user_id.and_then(|id| users.get(&id)).and_then(Option::as_ref),
                    proposal_title: event
                        .proposal_id
                        .and_then(|id| titles.get(&id))
                        .and_then(|t| t.as_deref()),
                };
                HistoryEventView::render(event, subjects, &self.site)
            })
            .collect())
    }
}
