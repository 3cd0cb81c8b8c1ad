//! Property-Based Tests for the review scheduler and selector
//!
//! Tests the following invariants:
//! - Stage range: advance never leaves 0..=8
//! - Remember monotonicity: next stage is exactly min(stage + 1, 8)
//! - Forgot reset: next stage is 1 from every starting stage
//! - Fuzzy fixpoint: stage never changes, interval never grows
//! - Selector: due records always precede not-due records

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

use beici_algo::{advance, Feedback, ReviewCandidate, ReviewSelector, INTERVALS_MS, MAX_STAGE};

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
}

fn arb_stage() -> impl Strategy<Value = u8> {
    0u8..=MAX_STAGE
}

fn arb_feedback() -> impl Strategy<Value = Feedback> {
    prop_oneof![
        Just(Feedback::Remember),
        Just(Feedback::Fuzzy),
        Just(Feedback::Forgot),
    ]
}

fn arb_candidate() -> impl Strategy<Value = ReviewCandidate> {
    (
        "[a-z]{8}",           // id
        0i16..=8i16,          // stage
        0i32..=50i32,         // wrong_count
        -10_000i64..=10_000i64, // due offset in seconds
    )
        .prop_map(|(id, stage, wrong_count, offset)| ReviewCandidate {
            id,
            stage,
            wrong_count,
            next_review_at: base_time() + Duration::seconds(offset),
        })
}

// ============================================================================
// Scheduler properties
// ============================================================================

proptest! {
    #[test]
    fn advance_stays_within_ladder(stage in arb_stage(), feedback in arb_feedback()) {
        let schedule = advance(stage, feedback, base_time());
        prop_assert!(schedule.next_stage <= MAX_STAGE);
        prop_assert!(schedule.next_review_at >= base_time());
    }

    #[test]
    fn remember_climbs_exactly_one(stage in arb_stage()) {
        let schedule = advance(stage, Feedback::Remember, base_time());
        prop_assert_eq!(schedule.next_stage, (stage + 1).min(MAX_STAGE));
    }

    #[test]
    fn forgot_always_resets_to_one(stage in arb_stage()) {
        let schedule = advance(stage, Feedback::Forgot, base_time());
        prop_assert_eq!(schedule.next_stage, 1);
        prop_assert_eq!(
            schedule.next_review_at,
            base_time() + Duration::milliseconds(INTERVALS_MS[1])
        );
    }

    #[test]
    fn fuzzy_never_moves_the_stage(stage in arb_stage()) {
        let schedule = advance(stage, Feedback::Fuzzy, base_time());
        prop_assert_eq!(schedule.next_stage, stage);
        // Half interval never exceeds the full one
        prop_assert!(
            schedule.next_review_at
                <= base_time() + Duration::milliseconds(INTERVALS_MS[stage as usize])
        );
    }
}

// ============================================================================
// Selector properties
// ============================================================================

proptest! {
    #[test]
    fn selector_never_empty_for_nonempty_input(
        records in prop::collection::vec(arb_candidate(), 1..20),
        seed in any::<u32>(),
        limit in 1usize..=10,
    ) {
        let excluded = records[0].id.clone();
        let mut selector = ReviewSelector::with_seed(seed);
        let queue = selector.select(&records, base_time(), Some(&excluded), limit);
        prop_assert!(!queue.is_empty());
    }

    #[test]
    fn due_records_precede_not_due(
        records in prop::collection::vec(arb_candidate(), 0..25),
        seed in any::<u32>(),
    ) {
        let mut selector = ReviewSelector::with_seed(seed);
        let queue = selector.select(&records, base_time(), None, records.len());
        let mut seen_not_due = false;
        for entry in &queue {
            if entry.is_due(base_time()) {
                prop_assert!(!seen_not_due, "due record after a not-due record");
            } else {
                seen_not_due = true;
            }
        }
    }

    #[test]
    fn selector_respects_limit(
        records in prop::collection::vec(arb_candidate(), 0..25),
        seed in any::<u32>(),
        limit in 0usize..=30,
    ) {
        let mut selector = ReviewSelector::with_seed(seed);
        let queue = selector.select(&records, base_time(), None, limit);
        prop_assert!(queue.len() <= limit);
        prop_assert!(queue.len() <= records.len());
    }
}
