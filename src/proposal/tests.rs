use super::*;
use crate::ids::SequentialIds;
use chrono::{Duration, TimeZone};

fn creator() -> User {
    User::new(100_001, "alice", "alice@example.com")
}

fn draft(amount: &str, immediate: bool) -> MilestoneDraft {
    MilestoneDraft {
        title: "Ship it".to_string(),
        content: "Working code".to_string(),
        date_estimated: Utc::now() + Duration::days(90),
        payout_amount: amount.to_string(),
        immediate_payout: immediate,
    }
}

fn proposal_with(target: &str, milestones: Vec<MilestoneDraft>) -> Proposal {
    Proposal::create(
        NewProposal {
            title: "Better wallets".to_string(),
            brief: "Wallet UX".to_string(),
            content: "Long form".to_string(),
            category: Some("DEV_TOOL".to_string()),
            stage: None,
            target: target.to_string(),
            milestones,
        },
        creator(),
        &mut SequentialIds::new(),
    )
    .unwrap()
}

fn scenario_a() -> Proposal {
    proposal_with("5", vec![draft("2", true), draft("3", false)])
}

fn live_proposal() -> Proposal {
    let mut p = proposal_with("5", vec![draft("2", false), draft("3", false)]);
    let mut effects = TransitionEffects::new();
    p.submit_for_approval(&mut effects).unwrap();
    p.approve_pending(true, None, &mut effects).unwrap();
    p.publish(FinalMilestoneRule::default(), &mut effects).unwrap();
    p
}

#[test]
fn test_create_defaults() {
    let p = scenario_a();
    assert_eq!(p.status, ProposalStatus::Draft);
    assert_eq!(p.stage, ProposalStage::Preview);
    assert_eq!(p.team[0].id, 100_001);
    assert_eq!(p.category, Some(Category::DevTool));
    assert_eq!(p.milestones.len(), 2);
}

#[test]
fn test_create_rejects_unknown_category() {
    let err = Proposal::create(
        NewProposal {
            category: Some("GARDENING".to_string()),
            ..Default::default()
        },
        creator(),
        &mut SequentialIds::new(),
    )
    .unwrap_err();
    assert_eq!(err.code(), "VALIDATION");
    assert!(err.to_string().contains("GARDENING"));
}

#[test]
fn test_create_rejects_unknown_stage() {
    let err = Proposal::create(
        NewProposal {
            stage: Some("SHIPPED".to_string()),
            ..Default::default()
        },
        creator(),
        &mut SequentialIds::new(),
    )
    .unwrap_err();
    assert!(err.to_string().contains("SHIPPED"));
}

#[test]
fn test_payout_sum_matches_target() {
    let p = proposal_with("5", vec![draft("2", false), draft("3", false)]);
    assert!(p.validate_publishable_milestones().is_ok());

    let p = proposal_with("6", vec![draft("2", false), draft("3", false)]);
    let err = p.validate_publishable_milestones().unwrap_err();
    assert!(err.to_string().contains("must add up to proposal target"));
}

#[test]
fn test_payout_must_be_whole_positive_number() {
    let p = proposal_with("5", vec![draft("2.5", false), draft("2.5", false)]);
    assert!(p
        .validate_publishable_milestones()
        .unwrap_err()
        .to_string()
        .contains("whole numbers"));

    let p = proposal_with("5", vec![draft("0", false), draft("5", false)]);
    assert!(p
        .validate_publishable_milestones()
        .unwrap_err()
        .to_string()
        .contains("greater than zero"));

    let p = proposal_with("5", vec![draft("five", false)]);
    assert!(p
        .validate_publishable_milestones()
        .unwrap_err()
        .to_string()
        .contains("must be a number"));
}

#[test]
fn test_immediate_payout_only_on_first_milestone() {
    let p = proposal_with("5", vec![draft("2", false), draft("3", true)]);
    let err = p.validate_publishable().unwrap_err();
    assert!(err.to_string().contains("Only the first milestone"));
}

#[test]
fn test_milestone_text_limits() {
    let mut long_title = draft("5", false);
    long_title.title = "t".repeat(61);
    let p = proposal_with("5", vec![long_title]);
    assert!(p.validate_publishable().is_err());

    let mut long_content = draft("5", false);
    long_content.content = "c".repeat(201);
    let p = proposal_with("5", vec![long_content]);
    assert!(p.validate_publishable().is_err());
}

#[test]
fn test_publishable_field_limits() {
    let mut p = scenario_a();
    p.title = "t".repeat(61);
    assert!(p.validate_publishable().unwrap_err().to_string().contains("title"));

    let mut p = scenario_a();
    p.brief = "b".repeat(141);
    assert!(p.validate_publishable().unwrap_err().to_string().contains("Brief"));

    let mut p = scenario_a();
    p.category = None;
    assert!(p.validate_publishable().unwrap_err().to_string().contains("category"));
}

#[test]
fn test_milestone_date_threshold_is_start_of_month() {
    let now = Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap();
    let mut p = scenario_a();

    p.milestones[0].date_estimated = Utc.with_ymd_and_hms(2026, 10, 2, 0, 0, 0).unwrap();
    assert!(validate_milestone_dates_at(&p.milestones, now).is_ok());

    p.milestones[0].date_estimated = Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap();
    assert!(validate_milestone_dates_at(&p.milestones, now).is_ok());

    p.milestones[0].date_estimated = Utc.with_ymd_and_hms(2026, 9, 30, 23, 59, 59).unwrap();
    let err = validate_milestone_dates_at(&p.milestones, now).unwrap_err();
    assert!(err.to_string().contains("in the future"));
}

#[test]
fn test_submit_rejects_past_milestones() {
    let mut past = draft("5", false);
    past.date_estimated = Utc::now() - Duration::days(400);
    let mut p = proposal_with("5", vec![past]);
    let mut effects = TransitionEffects::new();
    assert!(p.submit_for_approval(&mut effects).is_err());
    assert_eq!(p.status, ProposalStatus::Draft);
    assert!(effects.is_empty());
}

#[test]
fn test_scenario_a_full_lifecycle() {
    let mut p = scenario_a();
    let mut effects = TransitionEffects::new();

    p.submit_for_approval(&mut effects).unwrap();
    assert_eq!(p.status, ProposalStatus::Pending);
    assert_eq!(effects.events(), vec![NotificationEvent::AdminApproval]);

    p.approve_pending(true, None, &mut effects).unwrap();
    assert_eq!(p.status, ProposalStatus::Approved);
    assert!(p.date_approved.is_some());

    p.publish(FinalMilestoneRule::default(), &mut effects).unwrap();
    assert_eq!(p.status, ProposalStatus::Live);
    assert_eq!(p.stage, ProposalStage::Wip);
    assert!(p.date_published.is_some());
    assert_eq!(p.milestones[0].stage, MilestoneStage::Accepted);
    assert_eq!(p.milestones[1].stage, MilestoneStage::Idle);

    assert_eq!(effects.history.len(), 1);
    assert!(effects.history[0]
        .title
        .contains("received 2 STARS to start working"));
    assert_eq!(effects.history[0].user_id, Some(100_001));
    assert_eq!(effects.history[0].proposal_id, Some(p.id));
}

#[test]
fn test_submit_requires_draft_or_rejected() {
    let mut p = scenario_a();
    let mut effects = TransitionEffects::new();
    p.submit_for_approval(&mut effects).unwrap();
    let err = p.submit_for_approval(&mut effects).unwrap_err();
    assert!(matches!(err, GrantError::InvalidState { .. }));
    assert!(err.to_string().contains("PENDING"));
}

#[test]
fn test_rejected_proposal_can_be_resubmitted() {
    let mut p = scenario_a();
    let mut effects = TransitionEffects::new();
    p.submit_for_approval(&mut effects).unwrap();
    p.approve_pending(false, Some("Needs detail"), &mut effects)
        .unwrap();
    assert_eq!(p.status, ProposalStatus::Rejected);
    assert_eq!(p.reject_reason.as_deref(), Some("Needs detail"));

    p.submit_for_approval(&mut effects).unwrap();
    assert_eq!(p.status, ProposalStatus::Pending);
}

#[test]
fn test_reject_requires_reason() {
    let mut p = scenario_a();
    let mut effects = TransitionEffects::new();
    p.submit_for_approval(&mut effects).unwrap();
    assert!(p.approve_pending(false, None, &mut effects).is_err());
    assert!(p.approve_pending(false, Some("   "), &mut effects).is_err());
    assert_eq!(p.status, ProposalStatus::Pending);
}

#[test]
fn test_decision_emails_every_team_member() {
    let mut p = scenario_a();
    p.team.push(User::new(100_002, "bob", "bob@example.com"));
    let mut effects = TransitionEffects::new();
    p.submit_for_approval(&mut effects).unwrap();
    let mut decision = TransitionEffects::new();
    p.approve_pending(false, Some("Too vague"), &mut decision)
        .unwrap();

    assert_eq!(decision.notifications.len(), 2);
    for n in &decision.notifications {
        assert_eq!(n.event, NotificationEvent::ProposalRejected);
        assert_eq!(n.context.message.as_deref(), Some("Too vague"));
    }
}

#[test]
fn test_approve_requires_pending() {
    let mut p = scenario_a();
    let mut effects = TransitionEffects::new();
    let err = p.approve_pending(true, None, &mut effects).unwrap_err();
    assert!(err.to_string().contains("DRAFT"));
    assert!(err.to_string().contains("PENDING"));
}

#[test]
fn test_publish_requires_approved() {
    let mut p = scenario_a();
    let mut effects = TransitionEffects::new();
    p.submit_for_approval(&mut effects).unwrap();
    assert!(p.publish(FinalMilestoneRule::default(), &mut effects).is_err());
    assert_eq!(p.status, ProposalStatus::Pending);
}

#[test]
fn test_cancel_only_when_live() {
    let mut p = scenario_a();
    let mut effects = TransitionEffects::new();
    assert!(p.cancel(&mut effects).is_err());

    let mut p = live_proposal();
    let mut effects = TransitionEffects::new();
    p.cancel(&mut effects).unwrap();
    assert_eq!(p.stage, ProposalStage::Canceled);
    assert_eq!(effects.events(), vec![NotificationEvent::ProposalCanceled]);
    assert!(p.is_failed());
}

#[test]
fn test_deletable_statuses() {
    let p = scenario_a();
    assert!(p.ensure_deletable().is_ok());
    let p = live_proposal();
    assert_eq!(p.ensure_deletable().unwrap_err().code(), "INVALID_STATE");
}

#[test]
fn test_is_failed_requires_live_and_published() {
    let mut p = scenario_a();
    p.stage = ProposalStage::Failed;
    assert!(!p.is_failed());
    let mut p = live_proposal();
    assert!(!p.is_failed());
    p.stage = ProposalStage::Failed;
    assert!(p.is_failed());
}

#[test]
fn test_current_milestone() {
    let mut p = scenario_a();
    assert_eq!(p.current_milestone().map(|m| m.index), Some(0));
    p.milestones[0].stage = MilestoneStage::Paid;
    assert_eq!(p.current_milestone().map(|m| m.index), Some(1));
    p.milestones[1].stage = MilestoneStage::Paid;
    assert_eq!(p.current_milestone().map(|m| m.index), Some(1));
    p.milestones.clear();
    assert!(p.current_milestone().is_none());
}

#[test]
fn test_follow_is_idempotent() {
    let mut p = scenario_a();
    let bob = User::new(100_002, "bob", "bob@example.com");
    p.follow(&bob, true);
    p.follow(&bob, true);
    assert_eq!(p.followers.len(), 1);
    assert!(p.is_followed_by(bob.id));
    p.follow(&bob, false);
    p.follow(&bob, false);
    assert!(p.followers.is_empty());
}

#[test]
fn test_update_truncates_and_defaults_target() {
    let mut p = scenario_a();
    let mut ids = SequentialIds::starting_at(900_000);
    p.update(
        ProposalEdit {
            title: "t".repeat(300),
            brief: "b".repeat(300),
            category: Some("SECURITY".to_string()),
            content: "c".to_string(),
            target: String::new(),
            milestones: Vec::new(),
        },
        &mut ids,
    )
    .unwrap();
    assert_eq!(p.title.chars().count(), 255);
    assert_eq!(p.brief.chars().count(), 255);
    assert_eq!(p.target, "0");
    assert_eq!(p.category, Some(Category::Security));
    assert_eq!(p.milestones.len(), 2);
}

#[test]
fn test_update_replaces_milestones() {
    let mut p = scenario_a();
    let old_ids: Vec<Id> = p.milestones.iter().map(|m| m.id).collect();
    let mut ids = SequentialIds::starting_at(900_000);
    p.update(
        ProposalEdit {
            target: "9".to_string(),
            category: Some("DESIGN".to_string()),
            milestones: vec![draft("4", false), draft("4", false), draft("1", false)],
            ..Default::default()
        },
        &mut ids,
    )
    .unwrap();
    assert_eq!(p.milestones.len(), 3);
    assert!(p.milestones.iter().all(|m| !old_ids.contains(&m.id)));
    assert_eq!(
        p.milestones.iter().map(|m| m.index).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
}

#[test]
fn test_update_refused_once_submitted() {
    let mut p = scenario_a();
    let mut effects = TransitionEffects::new();
    p.submit_for_approval(&mut effects).unwrap();
    let err = p
        .update(ProposalEdit::default(), &mut SequentialIds::new())
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_STATE");
}

#[test]
fn test_milestone_payout_flow_completes_proposal() {
    let mut p = live_proposal();
    p.follow(&User::new(100_009, "fan", "fan@example.com"), true);
    let first = p.milestones[0].id;
    let second = p.milestones[1].id;
    let mut effects = TransitionEffects::new();

    p.request_milestone_payout(first, 100_001, &mut effects)
        .unwrap();
    p.accept_milestone_payout(first, FinalMilestoneRule::default(), &mut effects)
        .unwrap();
    p.mark_milestone_paid(first, Some("tx-1"), &mut effects)
        .unwrap();
    assert_eq!(p.stage, ProposalStage::Wip);

    p.request_milestone_payout(second, 100_001, &mut effects)
        .unwrap();
    p.mark_milestone_paid(second, None, &mut effects).unwrap();
    assert_eq!(p.stage, ProposalStage::Completed);

    let events = effects.events();
    assert_eq!(
        events
            .iter()
            .filter(|e| **e == NotificationEvent::MilestonePaid)
            .count(),
        2
    );
    assert_eq!(
        events
            .iter()
            .filter(|e| **e == NotificationEvent::FollowedProposalMilestone)
            .count(),
        2
    );
    assert_eq!(effects.history.len(), 1);
}

#[test]
fn test_mark_paid_requires_live_proposal() {
    let mut p = scenario_a();
    let id = p.milestones[1].id;
    p.milestones[1].stage = MilestoneStage::Accepted;
    let err = p
        .mark_milestone_paid(id, None, &mut TransitionEffects::new())
        .unwrap_err();
    assert!(err.to_string().contains("LIVE"));
}

#[test]
fn test_reject_payout_notifies_team() {
    let mut p = live_proposal();
    let id = p.milestones[1].id;
    let mut effects = TransitionEffects::new();
    p.request_milestone_payout(id, 100_001, &mut effects).unwrap();
    p.reject_milestone_payout(id, "Not done", &mut effects)
        .unwrap();
    assert_eq!(
        effects.events(),
        vec![NotificationEvent::AdminPayout, NotificationEvent::MilestoneReject]
    );
    assert_eq!(p.milestones[1].stage, MilestoneStage::Rejected);
}

#[test]
fn test_unknown_milestone_is_not_found() {
    let mut p = live_proposal();
    let err = p
        .request_milestone_payout(1, 100_001, &mut TransitionEffects::new())
        .unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
}

#[test]
fn test_invites() {
    let mut p = scenario_a();
    let mut ids = SequentialIds::starting_at(800_000);
    let mut effects = TransitionEffects::new();
    let alice = creator();

    assert!(p
        .invite("alice@example.com", &alice, &mut ids, &mut effects)
        .is_err());

    let invite_id = p
        .invite("bob@example.com", &alice, &mut ids, &mut effects)
        .unwrap();
    assert!(p
        .invite("bob@example.com", &alice, &mut ids, &mut effects)
        .unwrap_err()
        .to_string()
        .contains("already invited"));
    assert_eq!(effects.events(), vec![NotificationEvent::TeamInvite]);

    p.invite("not-an-email", &alice, &mut ids, &mut effects)
        .unwrap();
    assert_eq!(effects.notifications.len(), 1);

    let bob = User::new(100_002, "bob", "Bob@Example.com");
    p.respond_to_invite(invite_id, &bob, true).unwrap();
    assert!(p.is_team_member(bob.id));
    assert!(p.respond_to_invite(invite_id, &bob, false).is_err());
    assert!(p.remove_invite("bob@example.com").is_err());
    p.remove_invite("not-an-email").unwrap();
    assert_eq!(p.invites.len(), 1);
}

#[test]
fn test_invite_for_someone_else_is_refused() {
    let mut p = scenario_a();
    let invite_id = p
        .invite(
            "bob@example.com",
            &creator(),
            &mut SequentialIds::starting_at(800_000),
            &mut TransitionEffects::new(),
        )
        .unwrap();
    let carol = User::new(100_003, "carol", "carol@example.com");
    assert!(p.respond_to_invite(invite_id, &carol, true).is_err());
    assert!(!p.is_team_member(carol.id));
}

#[test]
fn test_post_update_notifies_followers() {
    let mut p = live_proposal();
    p.follow(&User::new(100_009, "fan", "fan@example.com"), true);
    let mut effects = TransitionEffects::new();
    let mut ids = SequentialIds::starting_at(700_000);

    assert!(p.post_update("Hi", "Too short title", &mut ids, &mut effects).is_err());
    let id = p
        .post_update("Progress", "Halfway there", &mut ids, &mut effects)
        .unwrap();
    assert_eq!(id, 700_000);
    assert_eq!(p.updates.len(), 1);
    assert_eq!(effects.events(), vec![NotificationEvent::FollowedProposalUpdate]);
    assert!(matches!(
        effects.notifications[0].context.link,
        Some(SiteLink::Public(ref path)) if path.ends_with("?tab=updates")
    ));
}
