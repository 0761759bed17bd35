use serde::{Deserialize, Serialize};

use super::Milestone;
use crate::errors::{GrantError, Result};
use crate::history::HistoryDraft;
use crate::ids::Id;

/// How the "completed their proposal" wording picks the final milestone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalMilestoneRule {
    /// `index == milestone count`, which never matches a contiguous 0-based list.
    /// Kept as the default so existing ledgers read the same.
    #[default]
    IndexEqualsCount,
    /// `index == milestone count - 1`
    LastIndex,
}

impl FinalMilestoneRule {
    pub fn is_final(&self, index: usize, milestone_count: usize) -> bool {
        match self {
            FinalMilestoneRule::IndexEqualsCount => index == milestone_count,
            FinalMilestoneRule::LastIndex => milestone_count > 0 && index + 1 == milestone_count,
        }
    }
}

/// Proposal-level facts a milestone needs for its payout side effects.
#[derive(Debug, Clone, Copy)]
pub struct PayoutContext<'a> {
    pub proposal_id: Id,
    pub proposal_title: &'a str,
    /// First team member, the recipient of record
    pub recipient_id: Option<Id>,
    pub milestone_count: usize,
    pub final_rule: FinalMilestoneRule,
}

/// Two-decimal rounding with trailing zeros and point removed.
pub fn clean_amount(amount: f64) -> String {
    let formatted = format!("{:.2}", amount);
    formatted.trim_end_matches('0').trim_end_matches('.').to_string()
}

impl Milestone {
    /// Ledger entry for an accepted payout, or `None` for zero-value milestones.
    pub fn history_event(&self, ctx: &PayoutContext<'_>) -> Result<Option<HistoryDraft>> {
        let amount: f64 = self.payout_amount.trim().parse().map_err(|_| {
            GrantError::validation(format!(
                "Milestone payout amount {:?} is not a number",
                self.payout_amount
            ))
        })?;
        if amount <= 0.0 {
            return Ok(None);
        }
        let amount = clean_amount(amount);

        let (title, content) = if ctx.final_rule.is_final(self.index, ctx.milestone_count) {
            (
                format!("$user received {} STARS for completing their proposal", amount),
                format!(
                    "$user has completed their work on $proposal and received their final payout of {} STARS",
                    amount
                ),
            )
        } else if self.is_immediate() {
            (
                format!("$user received {} STARS to start working on their proposal", amount),
                format!("$user has received an initial payout of {} STARS for $proposal", amount),
            )
        } else {
            (
                format!("$user received {} STARS for completing a milestone", amount),
                format!(
                    "$user has received a payout of {} STARS for completing a milestone for $proposal",
                    amount
                ),
            )
        };

        Ok(Some(HistoryDraft::new(
            title,
            content,
            ctx.recipient_id,
            Some(ctx.proposal_id),
        )))
    }
}
