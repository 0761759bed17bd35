//! Shared fixtures: users, proposal drafts and a service harness over the in-memory store
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::{Arc, Mutex};

use stars_grants::config::{HistoryConfig, SiteConfig};
use stars_grants::milestone::{FinalMilestoneRule, MilestoneDraft};
use stars_grants::notifications::{Delivery, NotificationDispatcher, Notifier};
use stars_grants::proposal::NewProposal;
use stars_grants::services::{HistoryService, Lifecycle, ProposalService, RfwService};
use stars_grants::store::InMemoryStore;
use stars_grants::user::User;

pub const ADMIN_ID: u32 = 100_001;
pub const AUTHOR_ID: u32 = 100_002;
pub const WORKER_ID: u32 = 100_003;
pub const FOLLOWER_ID: u32 = 100_004;

pub fn admin() -> User {
    User::new(ADMIN_ID, "Admin", "admin@example.com").admin()
}

pub fn author() -> User {
    User::new(AUTHOR_ID, "Ada", "ada@example.com")
}

pub fn worker() -> User {
    User::new(WORKER_ID, "Wes", "wes@example.com")
}

pub fn follower() -> User {
    User::new(FOLLOWER_ID, "Fay", "fay@example.com")
}

pub fn milestone_draft(title: &str, amount: &str, immediate: bool) -> MilestoneDraft {
    MilestoneDraft {
        title: title.to_string(),
        content: format!("{} content", title),
        date_estimated: Utc::now() + Duration::days(90),
        payout_amount: amount.to_string(),
        immediate_payout: immediate,
    }
}

/// Publishable draft: target 5 split into an immediate 2 and a later 3
pub fn publishable_proposal() -> NewProposal {
    NewProposal {
        title: "Urbit wallet".to_string(),
        brief: "A wallet for everyone".to_string(),
        content: "The full plan".to_string(),
        category: Some("COMMUNITY".to_string()),
        target: "5".to_string(),
        milestones: vec![
            milestone_draft("Kickoff", "2", true),
            milestone_draft("Ship", "3", false),
        ],
        ..Default::default()
    }
}

/// Notifier that keeps every delivery for inspection
#[derive(Default)]
pub struct RecordingNotifier {
    deliveries: Mutex<Vec<Delivery>>,
}

impl RecordingNotifier {
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().map(|d| d.clone()).unwrap_or_default()
    }

    pub fn event_types_to(&self, address: &str) -> Vec<&'static str> {
        self.deliveries()
            .into_iter()
            .filter(|d| d.to == address)
            .map(|d| d.event_type)
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, delivery: Delivery) -> anyhow::Result<()> {
        self.deliveries
            .lock()
            .map_err(|_| anyhow::anyhow!("recording lock poisoned"))?
            .push(delivery);
        Ok(())
    }
}

pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub dispatcher: Arc<NotificationDispatcher>,
    pub proposals: ProposalService,
    pub rfws: RfwService,
    pub history: HistoryService,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_rule(FinalMilestoneRule::default()).await
    }

    pub async fn with_rule(rule: FinalMilestoneRule) -> Self {
        let store = Arc::new(InMemoryStore::new());
        for user in [admin(), author(), worker(), follower()] {
            store.add_user(user).await;
        }
        let notifier = Arc::new(RecordingNotifier::default());
        let site = SiteConfig::default();
        let dispatcher = Arc::new(NotificationDispatcher::new(
            notifier.clone(),
            store.clone(),
            site.clone(),
        ));
        let lifecycle = Lifecycle::new(store.clone(), dispatcher.clone());
        let proposals = ProposalService::new(lifecycle.clone()).with_history_config(&HistoryConfig {
            final_milestone_rule: rule,
        });
        let rfws = RfwService::new(lifecycle, store.clone());
        let history = HistoryService::new(store.clone(), store.clone(), site);
        Self {
            store,
            notifier,
            dispatcher,
            proposals,
            rfws,
            history,
        }
    }

    /// Wait for background notification delivery
    pub async fn settle(&self) {
        self.dispatcher.flush().await;
    }
}
