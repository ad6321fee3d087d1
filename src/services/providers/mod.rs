use crate::{
    error::AppResult,
    models::{ProviderUser, RatingVector, UserId},
};

pub mod anilist;

/// Whether a fetch may be answered from the response cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Serve a cached list when one is still live
    PreferCache,
    /// Always ask the provider; the fresh list replaces any cached one
    Refresh,
}

/// Source of users' rating lists outside this service
///
/// Implementations return raw scores as reported upstream; range checks happen
/// at ingestion.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RatingProvider: Send + Sync {
    /// Fetches every scored title on the user's list
    async fn fetch_user_ratings(
        &self,
        user_id: UserId,
        mode: FetchMode,
    ) -> AppResult<RatingVector>;

    /// One page of the provider's user directory, with list sizes.
    /// Pages are numbered from 1; an empty page means the end.
    async fn list_users(&self, page: u32) -> AppResult<Vec<ProviderUser>>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}
