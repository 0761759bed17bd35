//! Notification boundary.
//!
//! Transitions only describe who should hear about what. Address resolution,
//! subscription filtering and delivery happen in [`NotificationDispatcher`]
//! after the unit of work has been committed.

pub mod dispatcher;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

#[cfg(any(test, feature = "testing"))]
use mockall::automock;

use crate::config::SiteConfig;
use crate::ids::Id;
use crate::user::User;

pub use dispatcher::NotificationDispatcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationEvent {
    AdminApproval,
    AdminPayout,
    ProposalApproved,
    ProposalRejected,
    ProposalCanceled,
    MilestoneReject,
    MilestonePaid,
    FollowedProposalMilestone,
    FollowedProposalUpdate,
    TeamInvite,
    AdminWorkerRequest,
    AdminWorkMilestoneClaim,
    WorkerApproved,
    WorkerRejected,
    WorkMilestoneAccepted,
    WorkMilestoneRejected,
}

impl NotificationEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            NotificationEvent::AdminApproval => "admin_approval",
            NotificationEvent::AdminPayout => "admin_payout",
            NotificationEvent::ProposalApproved => "proposal_approved",
            NotificationEvent::ProposalRejected => "proposal_rejected",
            NotificationEvent::ProposalCanceled => "proposal_canceled",
            NotificationEvent::MilestoneReject => "milestone_reject",
            NotificationEvent::MilestonePaid => "milestone_paid",
            NotificationEvent::FollowedProposalMilestone => "followed_proposal_milestone",
            NotificationEvent::FollowedProposalUpdate => "followed_proposal_update",
            NotificationEvent::TeamInvite => "team_invite",
            NotificationEvent::AdminWorkerRequest => "admin_worker_request",
            NotificationEvent::AdminWorkMilestoneClaim => "admin_work_milestone_claim",
            NotificationEvent::WorkerApproved => "worker_approved",
            NotificationEvent::WorkerRejected => "worker_rejected",
            NotificationEvent::WorkMilestoneAccepted => "work_milestone_accepted",
            NotificationEvent::WorkMilestoneRejected => "work_milestone_rejected",
        }
    }

    /// Preference category a recipient can opt out of. `None` means always sent.
    pub fn subscription(&self) -> Option<EmailSubscription> {
        use NotificationEvent::*;
        match self {
            AdminApproval => Some(EmailSubscription::AdminApproval),
            AdminPayout => Some(EmailSubscription::AdminPayout),
            ProposalApproved | ProposalRejected | MilestoneReject | MilestonePaid => {
                Some(EmailSubscription::MyProposalApproval)
            }
            FollowedProposalMilestone | FollowedProposalUpdate => {
                Some(EmailSubscription::FollowedProposal)
            }
            AdminWorkerRequest => Some(EmailSubscription::AdminWorkReview),
            AdminWorkMilestoneClaim => Some(EmailSubscription::AdminWorkMilestoneReview),
            WorkerApproved | WorkerRejected | WorkMilestoneAccepted | WorkMilestoneRejected => {
                Some(EmailSubscription::WorkReview)
            }
            ProposalCanceled | TeamInvite => None,
        }
    }
}

impl std::fmt::Display for NotificationEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.event_type())
    }
}

/// Email preference categories. Bit positions are persisted and must not move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailSubscription {
    MyCommentReply,
    MyProposalApproval,
    MyProposalComment,
    FollowedProposal,
    WorkReview,
    AdminWorkReview,
    AdminWorkMilestoneReview,
    AdminApproval,
    AdminPayout,
}

impl EmailSubscription {
    pub const ALL: &'static [EmailSubscription] = &[
        EmailSubscription::MyCommentReply,
        EmailSubscription::MyProposalApproval,
        EmailSubscription::MyProposalComment,
        EmailSubscription::FollowedProposal,
        EmailSubscription::WorkReview,
        EmailSubscription::AdminWorkReview,
        EmailSubscription::AdminWorkMilestoneReview,
        EmailSubscription::AdminApproval,
        EmailSubscription::AdminPayout,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            EmailSubscription::MyCommentReply => "my_comment_reply",
            EmailSubscription::MyProposalApproval => "my_proposal_approval",
            EmailSubscription::MyProposalComment => "my_proposal_comment",
            EmailSubscription::FollowedProposal => "followed_proposal",
            EmailSubscription::WorkReview => "work_review",
            EmailSubscription::AdminWorkReview => "admin_work_review",
            EmailSubscription::AdminWorkMilestoneReview => "admin_work_milestone_review",
            EmailSubscription::AdminApproval => "admin_approval",
            EmailSubscription::AdminPayout => "admin_payout",
        }
    }

    pub fn bit(&self) -> u32 {
        match self {
            EmailSubscription::MyCommentReply => 0,
            EmailSubscription::MyProposalApproval => 1,
            EmailSubscription::MyProposalComment => 2,
            EmailSubscription::FollowedProposal => 3,
            EmailSubscription::WorkReview => 4,
            EmailSubscription::AdminWorkReview => 5,
            EmailSubscription::AdminWorkMilestoneReview => 6,
            EmailSubscription::AdminApproval => 7,
            EmailSubscription::AdminPayout => 8,
        }
    }

    pub fn is_set(&self, bits: u32) -> bool {
        bits & (1 << self.bit()) != 0
    }

    /// Every category enabled, the setting new accounts start with.
    pub fn default_bits() -> u32 {
        Self::ALL.iter().fold(0, |acc, sub| acc | (1 << sub.bit()))
    }
}

/// Who a notification is addressed to, resolved at delivery time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Recipient {
    Admins,
    User(User),
    UserId(Id),
    Address(String),
}

/// Page a notification links to. Resolved against [`SiteConfig`] by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SiteLink {
    Public(String),
    Admin(String),
    /// Invite inbox of the recipient when they have an account, else the sign-in page
    Invites,
}

impl SiteLink {
    pub fn resolve(&self, site: &SiteConfig, recipient: Option<&User>) -> String {
        match self {
            SiteLink::Public(path) => site.public_url(path),
            SiteLink::Admin(path) => site.admin_url(path),
            SiteLink::Invites => match recipient {
                Some(user) => site.public_url(&format!("/profile/{}?tab=invites", user.id)),
                None => site.public_url("/auth"),
            },
        }
    }
}

/// Entity references needed for templating.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NotificationContext {
    pub proposal_id: Option<Id>,
    pub proposal_title: Option<String>,
    pub milestone_id: Option<Id>,
    pub milestone_title: Option<String>,
    pub rfw_id: Option<Id>,
    pub rfw_title: Option<String>,
    pub worker_id: Option<Id>,
    pub claim_id: Option<Id>,
    pub amount: Option<String>,
    /// Reason, admin note or status message
    pub message: Option<String>,
    #[serde(skip)]
    pub link: Option<SiteLink>,
    /// Filled by the dispatcher from `link`
    pub url: Option<String>,
}

impl NotificationContext {
    pub fn proposal(id: Id, title: impl Into<String>) -> Self {
        Self {
            proposal_id: Some(id),
            proposal_title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn rfw(id: Id, title: impl Into<String>) -> Self {
        Self {
            rfw_id: Some(id),
            rfw_title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn with_milestone(mut self, id: Id, title: impl Into<String>) -> Self {
        self.milestone_id = Some(id);
        self.milestone_title = Some(title.into());
        self
    }

    pub fn with_amount(mut self, amount: impl Into<String>) -> Self {
        self.amount = Some(amount.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_link(mut self, link: SiteLink) -> Self {
        self.link = Some(link);
        self
    }
}

/// A notification queued by a transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub event: NotificationEvent,
    pub recipient: Recipient,
    pub context: NotificationContext,
}

/// One resolved message handed to the delivery collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Delivery {
    pub to: String,
    pub event_type: &'static str,
    pub user: Option<User>,
    pub context: NotificationContext,
}

/// Email (or other channel) delivery. Errors are reported, never propagated.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, delivery: Delivery) -> anyhow::Result<()>;
}

#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user(&self, id: Id) -> anyhow::Result<Option<User>>;

    async fn find_by_email(&self, address: &str) -> anyhow::Result<Option<User>>;

    async fn admins(&self) -> anyhow::Result<Vec<User>>;
}

/// Email preference lookup.
pub trait SubscriptionCheck: Send + Sync {
    fn is_subscribed(&self, user: &User, subscription: EmailSubscription) -> bool;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysSubscribed;

impl SubscriptionCheck for AlwaysSubscribed {
    fn is_subscribed(&self, _user: &User, _subscription: EmailSubscription) -> bool {
        true
    }
}

/// Error-tracking collaborator for swallowed delivery failures.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, error: &anyhow::Error, event_type: &str);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingErrorReporter;

impl ErrorReporter for TracingErrorReporter {
    fn report(&self, error: &anyhow::Error, event_type: &str) {
        tracing::error!(event_type, error = %error, "Notification delivery failed");
    }
}

/// Notifier that only writes a log line per delivery.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn notify(&self, delivery: Delivery) -> anyhow::Result<()> {
        tracing::info!(
            to = %delivery.to,
            event_type = delivery.event_type,
            url = delivery.context.url.as_deref().unwrap_or(""),
            "Notification sent"
        );
        Ok(())
    }
}

static EMAIL_PATTERN: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^[^@]+@[^@]+\.[^@]+"));

/// Loose address check used before mailing an invite.
pub fn is_email(address: &str) -> bool {
    match EMAIL_PATTERN.as_ref() {
        Ok(pattern) => pattern.is_match(address),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_types() {
        assert_eq!(NotificationEvent::AdminPayout.event_type(), "admin_payout");
        assert_eq!(
            NotificationEvent::FollowedProposalMilestone.to_string(),
            "followed_proposal_milestone"
        );
        assert_eq!(
            NotificationEvent::AdminWorkMilestoneClaim.event_type(),
            "admin_work_milestone_claim"
        );
    }

    #[test]
    fn test_subscription_mapping() {
        assert_eq!(
            NotificationEvent::MilestonePaid.subscription(),
            Some(EmailSubscription::MyProposalApproval)
        );
        assert_eq!(
            NotificationEvent::WorkMilestoneRejected.subscription(),
            Some(EmailSubscription::WorkReview)
        );
        assert_eq!(NotificationEvent::ProposalCanceled.subscription(), None);
        assert_eq!(NotificationEvent::TeamInvite.subscription(), None);
    }

    #[test]
    fn test_subscription_bits() {
        let bits = EmailSubscription::default_bits();
        assert_eq!(bits, 0b1_1111_1111);
        for sub in EmailSubscription::ALL {
            assert!(sub.is_set(bits));
        }
        let without_payout = bits & !(1 << EmailSubscription::AdminPayout.bit());
        assert!(!EmailSubscription::AdminPayout.is_set(without_payout));
        assert!(EmailSubscription::AdminApproval.is_set(without_payout));
    }

    #[test]
    fn test_site_link_resolution() {
        let site = SiteConfig::default();
        let user = User::new(100_123, "bob", "bob@example.com");
        assert_eq!(
            SiteLink::Admin("/proposals/5".into()).resolve(&site, None),
            format!("{}/proposals/5", site.admin_site_url)
        );
        assert_eq!(
            SiteLink::Invites.resolve(&site, Some(&user)),
            format!("{}/profile/100123?tab=invites", site.site_url)
        );
        assert_eq!(
            SiteLink::Invites.resolve(&site, None),
            format!("{}/auth", site.site_url)
        );
    }

    #[test]
    fn test_is_email() {
        assert!(is_email("someone@example.com"));
        assert!(!is_email("someone"));
        assert!(!is_email("someone@localhost"));
        assert!(!is_email("@example.com"));
    }
}
