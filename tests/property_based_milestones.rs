// Property-based checks for milestone invariants
// Payout totals against the target, and RFW index contiguity under edits

use chrono::{Duration, Utc};
use proptest::prelude::*;
use proptest_derive::Arbitrary;

use stars_grants::ids::SequentialIds;
use stars_grants::milestone::MilestoneDraft;
use stars_grants::proposal::{NewProposal, Proposal};
use stars_grants::rfw::{NewRfw, Rfw, RfwMilestoneInput};
use stars_grants::User;

#[derive(Debug, Clone, Arbitrary)]
enum MilestoneEdit {
    Append(#[proptest(strategy = "0u64..=500")] u64),
    Delete(#[proptest(strategy = "0usize..8")] usize),
}

fn proposal_with_payouts(payouts: &[u32], target: String) -> Proposal {
    let due = Utc::now() + Duration::days(30);
    let milestones = payouts
        .iter()
        .enumerate()
        .map(|(i, amount)| MilestoneDraft {
            title: format!("Milestone {}", i),
            content: "Work".to_string(),
            date_estimated: due,
            payout_amount: amount.to_string(),
            immediate_payout: i == 0,
        })
        .collect();
    let new = NewProposal {
        title: "Property".to_string(),
        category: Some("CORE_DEV".to_string()),
        target,
        milestones,
        ..Default::default()
    };
    Proposal::create(new, User::new(100_002, "Ada", "ada@example.com"), &mut SequentialIds::new()).unwrap()
}

proptest! {
    #[test]
    fn prop_payouts_must_sum_to_target(payouts in prop::collection::vec(1u32..=1000, 1..6), delta in 1u32..50) {
        let total: u32 = payouts.iter().sum();

        let exact = proposal_with_payouts(&payouts, total.to_string());
        prop_assert!(exact.validate_publishable().is_ok());

        let off = proposal_with_payouts(&payouts, (total + delta).to_string());
        let err = off.validate_publishable().unwrap_err();
        prop_assert_eq!(err.code(), "VALIDATION");
    }

    #[test]
    fn prop_rfw_indexes_stay_contiguous(edits in prop::collection::vec(any::<MilestoneEdit>(), 0..20)) {
        let mut ids = SequentialIds::new();
        let mut rfw = Rfw::create(
            NewRfw { title: "Property".to_string(), ..Default::default() },
            &[],
            &mut ids,
        ).unwrap();
        let mut expected_bounty = 0u64;

        for edit in edits {
            match edit {
                MilestoneEdit::Append(bounty) => {
                    let id = rfw
                        .create_next_milestone(&RfwMilestoneInput::default().with_bounty(bounty), &mut ids)
                        .unwrap();
                    prop_assert_eq!(rfw.get_milestone_by_id(id).unwrap().index, rfw.milestones.len() - 1);
                    expected_bounty += bounty;
                }
                MilestoneEdit::Delete(position) => {
                    if rfw.milestones.is_empty() {
                        continue;
                    }
                    let ordered: Vec<_> = rfw.ordered_milestones().iter().map(|m| (m.id, m.bounty)).collect();
                    let (id, bounty) = ordered[position % ordered.len()];
                    rfw.delete_milestone_by_id(id).unwrap();
                    expected_bounty -= bounty;
                }
            }
            prop_assert!(rfw.check_milestone_integrity().is_ok());
        }
        prop_assert_eq!(rfw.bounty(), expected_bounty);
    }
}
