use chrono::{DateTime, Datelike, TimeZone, Utc};

use super::Proposal;
use crate::errors::{GrantError, Result};
use crate::milestone::Milestone;

const TITLE_LIMIT: usize = 60;
const BRIEF_LIMIT: usize = 140;
const CONTENT_LIMIT: usize = 250_000;
const MILESTONE_TITLE_LIMIT: usize = 60;
const MILESTONE_CONTENT_LIMIT: usize = 200;

/// Publish-time milestone checks: whole positive payouts, immediate payout only
/// on the first milestone, short texts, and a total equal to the target.
pub fn validate_publishable_milestones(milestones: &[Milestone], target: &str) -> Result<()> {
    let mut payout_total = 0.0_f64;
    for (i, milestone) in milestones.iter().enumerate() {
        if milestone.immediate_payout && i != 0 {
            return Err(GrantError::validation(
                "Only the first milestone can have an immediate payout",
            ));
        }
        if milestone.title.chars().count() > MILESTONE_TITLE_LIMIT {
            return Err(GrantError::validation(
                "Milestone title cannot be longer than 60 chars",
            ));
        }
        if milestone.content.chars().count() > MILESTONE_CONTENT_LIMIT {
            return Err(GrantError::validation(
                "Milestone content cannot be longer than 200 chars",
            ));
        }

        let payout: f64 = milestone
            .payout_amount
            .trim()
            .parse()
            .map_err(|_| GrantError::validation("Milestone payout must be a number"))?;
        if payout.fract() != 0.0 {
            return Err(GrantError::validation(
                "Milestone payout must be whole numbers, no decimals",
            ));
        }
        if payout <= 0.0 {
            return Err(GrantError::validation(
                "Milestone payout must be greater than zero",
            ));
        }
        payout_total += payout;
    }

    let target: f64 = target
        .trim()
        .parse()
        .map_err(|_| GrantError::validation("Proposal target must be a number"))?;
    if payout_total != target {
        return Err(GrantError::validation(format!(
            "Payout of milestones must add up to proposal target (milestones total {}, target {})",
            payout_total, target
        )));
    }
    Ok(())
}

/// Every estimate must fall on or after the first day of `now`'s month.
pub fn validate_milestone_dates_at(milestones: &[Milestone], now: DateTime<Utc>) -> Result<()> {
    let threshold = Utc
        .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .ok_or_else(|| GrantError::validation("Could not compute the milestone date threshold"))?;
    if milestones.iter().any(|m| threshold > m.date_estimated) {
        return Err(GrantError::validation(
            "Milestone date estimate must be in the future",
        ));
    }
    Ok(())
}

impl Proposal {
    pub fn validate_publishable_milestones(&self) -> Result<()> {
        validate_publishable_milestones(&self.milestones, &self.target)
    }

    pub fn validate_publishable(&self) -> Result<()> {
        self.validate_publishable_milestones()?;

        if self.category.is_none() {
            return Err(GrantError::validation("Proposal must have a category"));
        }
        if self.title.chars().count() > TITLE_LIMIT {
            return Err(GrantError::validation(
                "Proposal title cannot be longer than 60 characters",
            ));
        }
        if self.brief.chars().count() > BRIEF_LIMIT {
            return Err(GrantError::validation(
                "Brief cannot be longer than 140 characters",
            ));
        }
        if self.content.chars().count() > CONTENT_LIMIT {
            return Err(GrantError::validation(
                "Content cannot be longer than 250,000 characters",
            ));
        }
        Ok(())
    }

    /// Only checked on submission; dates may lapse before approval or publish.
    pub fn validate_milestone_dates(&self) -> Result<()> {
        validate_milestone_dates_at(&self.milestones, Utc::now())
    }
}
