use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{truncate, Proposal};
use crate::effects::TransitionEffects;
use crate::errors::{GrantError, Result};
use crate::ids::{EntityKind, Id, IdGenerator};
use crate::notifications::{is_email, NotificationEvent, Recipient, SiteLink};
use crate::user::User;

/// Pending team invitation keyed by email address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamInvite {
    pub id: Id,
    pub proposal_id: Id,
    pub address: String,
    /// `None` until answered
    pub accepted: Option<bool>,
    pub date_created: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalUpdate {
    pub id: Id,
    pub proposal_id: Id,
    pub title: String,
    pub content: String,
    pub date_created: DateTime<Utc>,
}

impl Proposal {
    /// Idempotent follow / unfollow.
    pub fn follow(&mut self, user: &User, is_follow: bool) {
        let following = self.followers.iter().any(|f| f.id == user.id);
        if is_follow && !following {
            self.followers.push(user.clone());
        } else if !is_follow && following {
            self.followers.retain(|f| f.id != user.id);
        }
    }

    pub fn is_followed_by(&self, user_id: Id) -> bool {
        self.followers.iter().any(|f| f.id == user_id)
    }

    pub fn invite(
        &mut self,
        address: &str,
        inviter: &User,
        ids: &mut dyn IdGenerator,
        effects: &mut TransitionEffects,
    ) -> Result<Id> {
        let address = truncate(address.trim(), 255);
        if self.team.iter().any(|u| u.email_address == address) {
            return Err(GrantError::validation(
                "Cannot invite members already on the team",
            ));
        }
        if self.invites.iter().any(|i| i.address == address) {
            return Err(GrantError::validation(format!(
                "You've already invited {}",
                address
            )));
        }

        let invite = TeamInvite {
            id: ids.next_id(EntityKind::TeamInvite),
            proposal_id: self.id,
            address: address.clone(),
            accepted: None,
            date_created: Utc::now(),
        };
        let invite_id = invite.id;
        self.invites.push(invite);

        if is_email(&address) {
            let context = self
                .public_context("")
                .with_message(format!("{} has invited you to a project", inviter.display_name))
                .with_link(SiteLink::Invites);
            effects.notify(NotificationEvent::TeamInvite, Recipient::Address(address), context);
        }
        info!(proposal.id = self.id, invite.id = invite_id, "Team invite created");
        Ok(invite_id)
    }

    /// Accepting joins the team. An accepted invite can never change again.
    pub fn respond_to_invite(&mut self, invite_id: Id, user: &User, accept: bool) -> Result<()> {
        let proposal_id = self.id;
        let invite = self
            .invites
            .iter_mut()
            .find(|i| i.id == invite_id)
            .ok_or_else(|| GrantError::not_found(format!("No invite {} on proposal {}", invite_id, proposal_id)))?;
        if invite.accepted == Some(true) {
            return Err(GrantError::invalid_state(
                format!("Invite {}", invite_id),
                "ACCEPTED",
                "unanswered",
            ));
        }
        if !user.has_email(&invite.address) {
            return Err(GrantError::validation("Invite is addressed to someone else"));
        }

        invite.accepted = Some(accept);
        if accept && !self.is_team_member(user.id) {
            self.team.push(user.clone());
        }
        info!(proposal.id = self.id, invite.id = invite_id, accept, "Team invite answered");
        Ok(())
    }

    /// Remove an unanswered or declined invite by id or address.
    pub fn remove_invite(&mut self, id_or_address: &str) -> Result<()> {
        let position = self
            .invites
            .iter()
            .position(|i| i.id.to_string() == id_or_address || i.address == id_or_address)
            .ok_or_else(|| GrantError::not_found(format!("No invite found given {}", id_or_address)))?;
        if self.invites[position].accepted == Some(true) {
            return Err(GrantError::invalid_state(
                format!("Invite {}", self.invites[position].id),
                "ACCEPTED",
                "unanswered",
            ));
        }
        self.invites.remove(position);
        Ok(())
    }

    pub fn post_update(
        &mut self,
        title: &str,
        content: &str,
        ids: &mut dyn IdGenerator,
        effects: &mut TransitionEffects,
    ) -> Result<Id> {
        let title_len = title.chars().count();
        if !(3..=60).contains(&title_len) {
            return Err(GrantError::validation(
                "Update title must be between 3 and 60 characters",
            ));
        }
        let content_len = content.chars().count();
        if !(5..=10_000).contains(&content_len) {
            return Err(GrantError::validation(
                "Update content must be between 5 and 10,000 characters",
            ));
        }

        let update = ProposalUpdate {
            id: ids.next_id(EntityKind::ProposalUpdate),
            proposal_id: self.id,
            title: title.to_string(),
            content: content.to_string(),
            date_created: Utc::now(),
        };
        let update_id = update.id;
        self.updates.push(update);

        let context = self.public_context("?tab=updates");
        effects.notify_each(
            NotificationEvent::FollowedProposalUpdate,
            self.follower_recipients(),
            &context,
        );
        Ok(update_id)
    }
}
