pub mod anilist;
pub mod discovery;
pub mod rating;
pub mod similarity;

pub use anilist::{
    AnimeStatistics, GraphQlError, GraphQlRequest, GraphQlResponse, MediaListCollection,
    MediaListCollectionData, MediaListEntry, MediaListGroup, MediaRef, PageData, PageUser,
    UserPage, UserStatistics,
};
pub use discovery::{DiscoverySummary, ProviderUser};
pub use rating::{ItemId, RatingEntry, RatingVector, UserId};
pub use similarity::{RankSummary, RankingView, SimilarityEntry, SyncSummary};
