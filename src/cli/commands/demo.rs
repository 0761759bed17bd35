use anyhow::Result;
use chrono::{Duration, Utc};
use std::sync::Arc;

use super::Command;
use crate::config::GrantsConfig;
use crate::milestone::MilestoneDraft;
use crate::notifications::{LoggingNotifier, NotificationDispatcher};
use crate::observability::lifecycle_metrics;
use crate::proposal::NewProposal;
use crate::rfw::{NewRfw, RfwMilestoneInput};
use crate::services::{HistoryService, Lifecycle, ProposalService, RfwService};
use crate::store::InMemoryStore;
use crate::user::User;

/// Proposal and RFW happy paths against an in-memory store.
pub struct DemoCommand {
    config: GrantsConfig,
}

impl DemoCommand {
    pub fn new(config: GrantsConfig) -> Self {
        Self { config }
    }
}

impl Command for DemoCommand {
    async fn execute(&self) -> Result<()> {
        let store = Arc::new(InMemoryStore::new());
        let admin = User::new(100_001, "Admin", "admin@example.com").admin();
        let author = User::new(100_002, "Ada", "ada@example.com");
        let worker = User::new(100_003, "Wes", "wes@example.com");
        for user in [&admin, &author, &worker] {
            store.add_user(user.clone()).await;
        }

        let dispatcher = Arc::new(
            NotificationDispatcher::new(Arc::new(LoggingNotifier), store.clone(), self.config.site.clone())
                .with_config(&self.config.notifications),
        );
        let lifecycle = Lifecycle::new(store.clone(), dispatcher.clone());
        let proposals = ProposalService::new(lifecycle.clone()).with_history_config(&self.config.history);
        let rfws = RfwService::new(lifecycle, store.clone());
        let history = HistoryService::new(store.clone(), store.clone(), self.config.site.clone());

        println!("📝 PROPOSAL");
        println!("───────────");
        let due = Utc::now() + Duration::days(60);
        let proposal = proposals
            .create(
                NewProposal {
                    title: "Urbit wallet".to_string(),
                    brief: "A wallet for everyone".to_string(),
                    content: "Full plan".to_string(),
                    category: Some("APP_DEV_OTHER".to_string()),
                    target: "5".to_string(),
                    milestones: vec![
                        MilestoneDraft {
                            title: "Kickoff".to_string(),
                            content: "Start".to_string(),
                            date_estimated: due,
                            payout_amount: "2".to_string(),
                            immediate_payout: true,
                        },
                        MilestoneDraft {
                            title: "Ship".to_string(),
                            content: "Release".to_string(),
                            date_estimated: due,
                            payout_amount: "3".to_string(),
                            immediate_payout: false,
                        },
                    ],
                    ..Default::default()
                },
                author.clone(),
            )
            .await?;
        let id = proposal.id;
        println!("   🆕 Created proposal {}", id);

        proposals.submit_for_approval(id).await?;
        proposals.approve_pending(id, true, None).await?;
        let proposal = proposals.publish(id).await?;
        println!("   🚀 Published: {} / {}", proposal.status, proposal.stage);

        let last = proposal.milestones[1].id;
        proposals.request_milestone_payout(id, last, author.id).await?;
        proposals.accept_milestone_payout(id, last).await?;
        proposals.mark_milestone_paid(id, proposal.milestones[0].id, Some("tx-1")).await?;
        let proposal = proposals.mark_milestone_paid(id, last, Some("tx-2")).await?;
        println!("   💸 All milestones paid: {} / {}", proposal.status, proposal.stage);

        for event in history.list(Some(id)).await? {
            println!("   📜 {}", event.title);
        }

        println!();
        println!("🧰 REQUEST FOR WORK");
        println!("───────────────────");
        let tag = rfws.create_tag("docs", "Documentation", "#3da5d9").await?;
        let rfw = rfws
            .create(NewRfw {
                title: "Write the guide".to_string(),
                milestones: Some(vec![
                    RfwMilestoneInput::at_index(0).with_bounty(10).with_effort(1, 2),
                    RfwMilestoneInput::at_index(1).with_bounty(15).with_effort(2, 4),
                ]),
                tags: vec![tag.id],
                ..Default::default()
            })
            .await?;
        let rfw_id = rfw.id;
        rfws.publish(rfw_id).await?;
        let worker_id = rfws.request_work(rfw_id, worker.id, "I write docs").await?;
        rfws.accept_worker(rfw_id, worker_id, "Welcome aboard").await?;
        let milestone_id = rfw.ordered_milestones()[0].id;
        let claim_id = rfws
            .request_milestone_claim(rfw_id, worker_id, milestone_id, "Done", "https://example.com/pr/1")
            .await?;
        let rfw = rfws
            .accept_milestone_claim(rfw_id, milestone_id, claim_id, "Thanks")
            .await?;
        println!("   🆕 RFW {} is {} with bounty {}", rfw.id, rfw.status, rfw.bounty());
        println!("   ✅ Claim {} accepted for worker {}", claim_id, worker_id);

        dispatcher.flush().await;
        let stats = lifecycle_metrics().get_stats();
        println!();
        println!("📊 METRICS");
        println!("──────────");
        println!("   ✅ Committed: {}", stats.transitions_committed);
        println!("   ✉️  Notifications sent: {}", stats.notifications_sent);
        println!("   ⏭️  Skipped: {}", stats.notifications_skipped);
        println!("   ❌ Failed: {}", stats.notifications_failed);
        Ok(())
    }
}
