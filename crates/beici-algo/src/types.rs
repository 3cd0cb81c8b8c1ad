//! Common Types and Constants
//!
//! Shared data structures used by the scheduler and the review selector.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==================== Constants ====================

/// Highest rung on the review ladder (long-term retained)
pub const MAX_STAGE: u8 = 8;

/// Stage a word falls back to after a failed recall (not 0: the word has
/// been seen before, so it re-enters the short-interval end of the ladder)
pub const RESET_STAGE: u8 = 1;

/// Ebbinghaus forgetting curve intervals in milliseconds, indexed by stage.
/// `INTERVALS_MS[0]` is 0 (immediate); values are strictly increasing from
/// stage 1 onward.
pub const INTERVALS_MS: [i64; 9] = [
    0,                      // Stage 0: immediate
    5 * 60 * 1000,          // Stage 1: 5 minutes
    30 * 60 * 1000,         // Stage 2: 30 minutes
    12 * 60 * 60 * 1000,    // Stage 3: 12 hours
    24 * 60 * 60 * 1000,    // Stage 4: 1 day
    2 * 24 * 60 * 60 * 1000, // Stage 5: 2 days
    4 * 24 * 60 * 60 * 1000, // Stage 6: 4 days
    7 * 24 * 60 * 60 * 1000, // Stage 7: 7 days
    15 * 24 * 60 * 60 * 1000, // Stage 8: 15 days
];

// ==================== Feedback ====================

/// Self-reported recall confidence submitted at review time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feedback {
    /// Recalled without hesitation
    Remember,
    /// Recognized the word but recall was shaky
    Fuzzy,
    /// Failed to recall
    Forgot,
}

// ==================== Selector input ====================

/// One learning-progress record as seen by the review selector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewCandidate {
    /// Progress record id
    pub id: String,
    /// Current ladder stage, 0..=8
    pub stage: i16,
    /// Accumulated failed-recall count
    pub wrong_count: i32,
    /// Scheduled next review time; the record is due once this has passed
    pub next_review_at: DateTime<Utc>,
}

impl ReviewCandidate {
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review_at <= now
    }
}
