//! Review queue ordering.
//!
//! Given the learning-progress records of one user, produce the next batch
//! to show: due words first, then harder words (higher wrong count), then
//! less consolidated words (lower stage), with a small randomized
//! perturbation so repeated calls do not always return the identical order.

use chrono::{DateTime, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::types::ReviewCandidate;

/// Due-word selector with an owned, seedable RNG.
pub struct ReviewSelector {
    rng: ChaCha8Rng,
}

impl ReviewSelector {
    /// Create a selector seeded from the system clock.
    pub fn new() -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u32)
            .unwrap_or(42);
        Self::with_seed(seed)
    }

    /// Create a selector with a specific seed (for testing).
    pub fn with_seed(seed: u32) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed as u64),
        }
    }

    /// Rank `candidates` and return at most `limit` of them.
    ///
    /// `exclude_id` drops the word that was just reviewed so it does not
    /// repeat back-to-back — unless it is the only learning word left, in
    /// which case it is kept: a request over a non-empty record set never
    /// yields an empty queue.
    pub fn select(
        &mut self,
        candidates: &[ReviewCandidate],
        now: DateTime<Utc>,
        exclude_id: Option<&str>,
        limit: usize,
    ) -> Vec<ReviewCandidate> {
        let mut pool: Vec<&ReviewCandidate> = match exclude_id {
            Some(excluded) => {
                let filtered: Vec<&ReviewCandidate> = candidates
                    .iter()
                    .filter(|c| c.id != excluded)
                    .collect();
                if filtered.is_empty() {
                    candidates.iter().collect()
                } else {
                    filtered
                }
            }
            None => candidates.iter().collect(),
        };

        // Stable sort: due before not-due, then wrong count descending,
        // then stage ascending.
        pool.sort_by(|a, b| {
            b.is_due(now)
                .cmp(&a.is_due(now))
                .then_with(|| b.wrong_count.cmp(&a.wrong_count))
                .then_with(|| a.stage.cmp(&b.stage))
        });

        let mut ordered: Vec<ReviewCandidate> = pool.into_iter().cloned().collect();
        self.perturb(&mut ordered, now);
        ordered.truncate(limit);
        ordered
    }

    /// Local window swap for variety: each position may trade places with
    /// one of its up to two nearest predecessors, and only when both ends
    /// share the same due-ness. A not-due record can therefore never move
    /// ahead of a due one.
    fn perturb(&mut self, ordered: &mut [ReviewCandidate], now: DateTime<Utc>) {
        for i in (1..ordered.len()).rev() {
            let offset = self.rng.gen_range(0..3usize);
            if offset == 0 {
                continue;
            }
            let j = i.saturating_sub(offset);
            if ordered[i].is_due(now) == ordered[j].is_due(now) {
                ordered.swap(i, j);
            }
        }
    }
}

impl Default for ReviewSelector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
    }

    fn candidate(id: &str, stage: i16, wrong_count: i32, due_in_minutes: i64) -> ReviewCandidate {
        ReviewCandidate {
            id: id.to_string(),
            stage,
            wrong_count,
            next_review_at: t0() + Duration::minutes(due_in_minutes),
        }
    }

    #[test]
    fn test_empty_input_yields_empty_queue() {
        let mut selector = ReviewSelector::with_seed(1);
        assert!(selector.select(&[], t0(), None, 10).is_empty());
    }

    #[test]
    fn test_due_word_always_first() {
        // One due word among records with higher wrong counts and lower stages
        let records = vec![
            candidate("a", 0, 9, 30),
            candidate("b", 6, 0, -5),
            candidate("c", 1, 4, 60),
        ];
        for seed in 0..50 {
            let mut selector = ReviewSelector::with_seed(seed);
            let queue = selector.select(&records, t0(), None, 10);
            assert_eq!(queue[0].id, "b", "seed {seed}");
        }
    }

    #[test]
    fn test_due_block_never_trails_not_due() {
        let records = vec![
            candidate("d1", 2, 1, -10),
            candidate("d2", 0, 3, -1),
            candidate("d3", 5, 0, 0),
            candidate("n1", 1, 8, 10),
            candidate("n2", 3, 2, 120),
        ];
        for seed in 0..200 {
            let mut selector = ReviewSelector::with_seed(seed);
            let queue = selector.select(&records, t0(), None, 10);
            assert_eq!(queue.len(), 5);
            for (index, entry) in queue.iter().enumerate() {
                if index < 3 {
                    assert!(entry.is_due(t0()), "seed {seed}: position {index}");
                } else {
                    assert!(!entry.is_due(t0()), "seed {seed}: position {index}");
                }
            }
        }
    }

    #[test]
    fn test_wrong_count_orders_within_due_block() {
        let records = vec![
            candidate("low", 2, 0, -5),
            candidate("high", 2, 7, -5),
        ];
        // Window swaps may flip adjacent entries; check the sort itself by
        // looking across seeds that leave the pair untouched at least once.
        let mut high_seen_first = false;
        for seed in 0..20 {
            let mut selector = ReviewSelector::with_seed(seed);
            let queue = selector.select(&records, t0(), None, 10);
            if queue[0].id == "high" {
                high_seen_first = true;
            }
        }
        assert!(high_seen_first);
    }

    #[test]
    fn test_lower_stage_breaks_wrong_count_tie() {
        let records = vec![
            candidate("late", 7, 2, 15),
            candidate("early", 1, 2, 15),
        ];
        let mut early_seen_first = false;
        for seed in 0..20 {
            let mut selector = ReviewSelector::with_seed(seed);
            let queue = selector.select(&records, t0(), None, 10);
            if queue[0].id == "early" {
                early_seen_first = true;
            }
        }
        assert!(early_seen_first);
    }

    #[test]
    fn test_exclusion_drops_the_reviewed_word() {
        let records = vec![
            candidate("a", 1, 0, -5),
            candidate("b", 1, 0, -5),
        ];
        let mut selector = ReviewSelector::with_seed(3);
        let queue = selector.select(&records, t0(), Some("a"), 10);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].id, "b");
    }

    #[test]
    fn test_exclusion_falls_back_when_it_would_empty_the_queue() {
        let records = vec![candidate("only", 2, 1, -5)];
        let mut selector = ReviewSelector::with_seed(3);
        let queue = selector.select(&records, t0(), Some("only"), 10);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].id, "only");
    }

    #[test]
    fn test_limit_truncates() {
        let records: Vec<ReviewCandidate> = (0..30)
            .map(|i| candidate(&format!("w{i}"), 1, 0, -1))
            .collect();
        let mut selector = ReviewSelector::with_seed(9);
        let queue = selector.select(&records, t0(), None, 10);
        assert_eq!(queue.len(), 10);
    }

    #[test]
    fn test_boundary_record_due_exactly_now_counts_as_due() {
        let records = vec![
            candidate("exact", 1, 0, 0),
            candidate("future", 1, 5, 1),
        ];
        let mut selector = ReviewSelector::with_seed(11);
        let queue = selector.select(&records, t0(), None, 10);
        assert_eq!(queue[0].id, "exact");
    }
}
