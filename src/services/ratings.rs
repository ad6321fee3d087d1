use crate::{
    error::AppResult,
    models::{RatingVector, SyncSummary, UserId},
};

/// Read access to stored ratings, as consumed by the ranking orchestrator
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RatingSource: Send + Sync {
    /// Ratings of `user_id`, possibly empty. Unknown users are `NotFound`.
    async fn rating_vector(&self, user_id: UserId) -> AppResult<RatingVector>;

    /// Every known user id in ascending order, freshly read on each call
    async fn user_ids(&self) -> AppResult<Vec<UserId>>;
}

/// Stored ratings that can also be written
#[async_trait::async_trait]
pub trait RatingRepository: RatingSource {
    /// Replaces everything stored for `user_id` with `ratings`
    async fn replace_ratings(&self, user_id: UserId, ratings: &RatingVector)
        -> AppResult<SyncSummary>;
}
