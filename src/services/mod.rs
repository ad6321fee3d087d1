pub mod ingestion;
pub mod providers;
pub mod ranking;
pub mod ranking_store;
pub mod ratings;
pub mod similarity;

pub use ranking::{rank_similar_users_to, rebuild_ranking_for, RankOptions};
pub use ranking_store::{HeapBackend, HeapRegistry, HeapTransaction, RankingStore};
pub use ratings::{RatingRepository, RatingSource};
