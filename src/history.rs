//! Append-only history ledger.
//!
//! Titles and contents are stored with `$user` / `$proposal` placeholders and
//! rendered when read, so a renamed user or retitled proposal is reflected in
//! every past event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::SiteConfig;
use crate::ids::Id;
use crate::user::User;

pub const USER_TOKEN: &str = "$user";
pub const PROPOSAL_TOKEN: &str = "$proposal";

const TITLE_LIMIT: usize = 120;
const CONTENT_LIMIT: usize = 1000;

/// A history entry produced by a transition, not yet assigned an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryDraft {
    pub title: String,
    pub content: String,
    pub date: DateTime<Utc>,
    pub user_id: Option<Id>,
    pub proposal_id: Option<Id>,
}

impl HistoryDraft {
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        user_id: Option<Id>,
        proposal_id: Option<Id>,
    ) -> Self {
        Self {
            title: truncate_chars(&title.into(), TITLE_LIMIT),
            content: truncate_chars(&content.into(), CONTENT_LIMIT),
            date: Utc::now(),
            user_id,
            proposal_id,
        }
    }

    pub fn into_event(self, id: Id) -> HistoryEvent {
        HistoryEvent {
            id,
            title: self.title,
            content: self.content,
            date: self.date,
            user_id: self.user_id,
            proposal_id: self.proposal_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEvent {
    pub id: Id,
    pub title: String,
    pub content: String,
    pub date: DateTime<Utc>,
    pub user_id: Option<Id>,
    pub proposal_id: Option<Id>,
}

/// Current display data of the entities an event refers to.
#[derive(Debug, Clone, Copy, Default)]
pub struct HistorySubjects<'a> {
    pub user: Option<&'a User>,
    pub proposal_title: Option<&'a str>,
}

impl HistoryEvent {
    pub fn title_text(&self, subjects: HistorySubjects<'_>) -> String {
        self.substitute(&self.title, subjects, None)
    }

    pub fn content_text(&self, subjects: HistorySubjects<'_>) -> String {
        self.substitute(&self.content, subjects, None)
    }

    /// Content with placeholders replaced by markdown links to the profile and proposal pages.
    pub fn content_markdown(&self, subjects: HistorySubjects<'_>, site: &SiteConfig) -> String {
        self.substitute(&self.content, subjects, Some(site))
    }

    fn substitute(&self, raw: &str, subjects: HistorySubjects<'_>, site: Option<&SiteConfig>) -> String {
        let mut text = raw.to_string();
        if let Some(user) = subjects.user {
            let replacement = match site {
                Some(site) => format!(
                    "[{}]({})",
                    user.display_name,
                    site.public_url(&format!("/profile/{}", user.id))
                ),
                None => user.display_name.clone(),
            };
            text = text.replace(USER_TOKEN, &replacement);
        }
        if let (Some(title), Some(proposal_id)) = (subjects.proposal_title, self.proposal_id) {
            let replacement = match site {
                Some(site) => format!(
                    "[{}]({})",
                    title,
                    site.public_url(&format!("/proposal/{}", proposal_id))
                ),
                None => title.to_string(),
            };
            text = text.replace(PROPOSAL_TOKEN, &replacement);
        }
        text
    }
}

/// Rendered form handed to the serialization layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEventView {
    pub id: Id,
    pub title: String,
    pub title_raw: String,
    pub content: String,
    pub content_raw: String,
    pub date: DateTime<Utc>,
    pub user_id: Option<Id>,
    pub proposal_id: Option<Id>,
}

impl HistoryEventView {
    pub fn render(event: &HistoryEvent, subjects: HistorySubjects<'_>, site: &SiteConfig) -> Self {
        Self {
            id: event.id,
            title: event.title_text(subjects),
            title_raw: event.title.clone(),
            content: event.content_markdown(subjects, site),
            content_raw: event.content.clone(),
            date: event.date,
            user_id: event.user_id,
            proposal_id: event.proposal_id,
        }
    }
}

fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}
