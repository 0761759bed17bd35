//! Query shaping for proposal lists.

use serde::{Deserialize, Serialize};

use crate::proposal::Proposal;
use crate::status::{ProposalSort, ProposalStatus};

pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProposalQuery {
    /// Empty means LIVE only, the public listing
    pub statuses: Vec<ProposalStatus>,
    /// Case-insensitive match on title or brief
    pub search: Option<String>,
    pub sort: ProposalSort,
    /// 1-based
    pub page: usize,
    pub page_size: usize,
}

impl Default for ProposalQuery {
    fn default() -> Self {
        Self {
            statuses: Vec::new(),
            search: None,
            sort: ProposalSort::default(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
}

impl<T> Page<T> {
    pub fn empty(page: usize, page_size: usize) -> Self {
        Self {
            items: Vec::new(),
            page,
            page_size,
            total: 0,
        }
    }

    pub fn has_more(&self) -> bool {
        self.page * self.page_size < self.total
    }
}

impl ProposalQuery {
    pub fn matches(&self, proposal: &Proposal) -> bool {
        let status_ok = if self.statuses.is_empty() {
            proposal.status == ProposalStatus::Live
        } else {
            self.statuses.contains(&proposal.status)
        };
        if !status_ok {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(term) => {
                let term = term.to_lowercase();
                proposal.title.to_lowercase().contains(&term)
                    || proposal.brief.to_lowercase().contains(&term)
            }
        }
    }

    /// Filter, sort by creation date and cut one page.
    pub fn apply<'a>(&self, proposals: impl IntoIterator<Item = &'a Proposal>) -> Page<Proposal> {
        let mut matching: Vec<&Proposal> = proposals.into_iter().filter(|p| self.matches(p)).collect();
        match self.sort {
            ProposalSort::Newest => matching.sort_by(|a, b| b.date_created.cmp(&a.date_created)),
            ProposalSort::Oldest => matching.sort_by(|a, b| a.date_created.cmp(&b.date_created)),
        }

        let page = self.page.max(1);
        let page_size = if self.page_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            self.page_size
        };
        let total = matching.len();
        let items = matching
            .into_iter()
            .skip((page - 1) * page_size)
            .take(page_size)
            .cloned()
            .collect();
        Page {
            items,
            page,
            page_size,
            total,
        }
    }
}
