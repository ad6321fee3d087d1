use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::rating::UserId;

/// A candidate user and their distance to the ranking's target
///
/// The score is a distance: 0 means identical ratings on every shared item,
/// larger means less similar.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SimilarityEntry {
    pub user_id: UserId,
    pub score: f64,
}

impl SimilarityEntry {
    pub fn new(user_id: UserId, score: f64) -> Self {
        Self { user_id, score }
    }

    /// Guard entry stored at heap index 0; sorts below every real entry
    pub fn sentinel() -> Self {
        Self {
            user_id: 0,
            score: f64::NEG_INFINITY,
        }
    }
}

/// Outcome of one ranking run for a target user
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RankSummary {
    pub target_user_id: UserId,
    /// Users compared against the target
    pub candidates: usize,
    /// Entries pushed into the ranking
    pub inserted: usize,
    /// Candidates with no rated item in common with the target
    pub skipped_no_overlap: usize,
}

/// Outcome of replacing a user's stored ratings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncSummary {
    pub user_id: UserId,
    pub rating_count: usize,
    pub synced_at: DateTime<Utc>,
}

/// Non-destructive view over a ranking
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankingView {
    pub ranking_id: UserId,
    pub length: usize,
    pub entries: Vec<SimilarityEntry>,
}
