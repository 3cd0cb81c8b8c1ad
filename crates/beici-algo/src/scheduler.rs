//! Ebbinghaus stage state machine.
//!
//! `advance` is pure: the evaluation time is a parameter and the function
//! performs no I/O, so every (stage, feedback) combination can be tested
//! exhaustively without a store.

use chrono::{DateTime, Duration, Utc};

use crate::types::{Feedback, INTERVALS_MS, MAX_STAGE, RESET_STAGE};

/// Outcome of one feedback submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub next_stage: u8,
    pub next_review_at: DateTime<Utc>,
}

/// Advance the ladder position for one feedback signal.
///
/// - `Remember` climbs one rung (capped at stage 8) and waits the full
///   interval of the new stage.
/// - `Fuzzy` stays on the current rung and halves its interval (floor).
/// - `Forgot` falls back to stage 1, regardless of how high the word was.
///
/// `current_stage` must already be within 0..=8; callers clamp stored
/// values with [`clamp_stage`] before calling.
pub fn advance(current_stage: u8, feedback: Feedback, now: DateTime<Utc>) -> Schedule {
    let current = current_stage.min(MAX_STAGE);

    let (next_stage, interval_ms) = match feedback {
        Feedback::Remember => {
            let next = (current + 1).min(MAX_STAGE);
            (next, INTERVALS_MS[next as usize])
        }
        Feedback::Fuzzy => (current, INTERVALS_MS[current as usize] / 2),
        Feedback::Forgot => (RESET_STAGE, INTERVALS_MS[RESET_STAGE as usize]),
    };

    Schedule {
        next_stage,
        next_review_at: now + Duration::milliseconds(interval_ms),
    }
}

/// Clamp a stored stage value into the valid ladder range.
///
/// The persisted invariant keeps stages inside 0..=8 already; this guards
/// against corrupted rows reaching the ladder index.
pub fn clamp_stage(stage: i32) -> u8 {
    stage.clamp(0, MAX_STAGE as i32) as u8
}

/// Whether a feedback submission graduates the word to mastered.
///
/// Reaching the top rung is not enough on its own: the word must arrive
/// there (or be confirmed there) by a `Remember`. A `Fuzzy` at stage 8
/// leaves the word in learning.
pub fn masters(next_stage: u8, feedback: Feedback) -> bool {
    next_stage >= MAX_STAGE && feedback == Feedback::Remember
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_remember_climbs_one_stage() {
        for stage in 0..MAX_STAGE {
            let schedule = advance(stage, Feedback::Remember, t0());
            assert_eq!(schedule.next_stage, stage + 1);
            assert_eq!(
                schedule.next_review_at,
                t0() + Duration::milliseconds(INTERVALS_MS[(stage + 1) as usize])
            );
        }
    }

    #[test]
    fn test_remember_caps_at_top_stage() {
        let schedule = advance(MAX_STAGE, Feedback::Remember, t0());
        assert_eq!(schedule.next_stage, MAX_STAGE);
        assert_eq!(
            schedule.next_review_at,
            t0() + Duration::milliseconds(INTERVALS_MS[MAX_STAGE as usize])
        );
    }

    #[test]
    fn test_forgot_resets_to_stage_one_from_anywhere() {
        for stage in 0..=MAX_STAGE {
            let schedule = advance(stage, Feedback::Forgot, t0());
            assert_eq!(schedule.next_stage, RESET_STAGE);
            assert_eq!(schedule.next_review_at, t0() + Duration::minutes(5));
        }
    }

    #[test]
    fn test_fuzzy_keeps_stage_and_halves_interval() {
        // Stage 3 interval is 12h; fuzzy reschedules at 6h
        let schedule = advance(3, Feedback::Fuzzy, t0());
        assert_eq!(schedule.next_stage, 3);
        assert_eq!(schedule.next_review_at, t0() + Duration::hours(6));
    }

    #[test]
    fn test_fuzzy_at_stage_zero_is_immediate() {
        let schedule = advance(0, Feedback::Fuzzy, t0());
        assert_eq!(schedule.next_stage, 0);
        assert_eq!(schedule.next_review_at, t0());
    }

    #[test]
    fn test_first_remember_waits_five_minutes() {
        let schedule = advance(0, Feedback::Remember, t0());
        assert_eq!(schedule.next_stage, 1);
        assert_eq!(schedule.next_review_at, t0() + Duration::minutes(5));
    }

    #[test]
    fn test_forgot_from_middle_of_ladder() {
        let schedule = advance(4, Feedback::Forgot, t0());
        assert_eq!(schedule.next_stage, 1);
        assert_eq!(schedule.next_review_at, t0() + Duration::minutes(5));
    }

    #[test]
    fn test_intervals_strictly_increase_from_stage_one() {
        for stage in 1..INTERVALS_MS.len() - 1 {
            assert!(INTERVALS_MS[stage] < INTERVALS_MS[stage + 1]);
        }
    }

    #[test]
    fn test_mastery_requires_remember_at_top() {
        assert!(masters(8, Feedback::Remember));
        assert!(!masters(8, Feedback::Fuzzy));
        assert!(!masters(8, Feedback::Forgot));
        assert!(!masters(7, Feedback::Remember));
    }

    #[test]
    fn test_clamp_stage() {
        assert_eq!(clamp_stage(-3), 0);
        assert_eq!(clamp_stage(0), 0);
        assert_eq!(clamp_stage(5), 5);
        assert_eq!(clamp_stage(99), 8);
    }
}
