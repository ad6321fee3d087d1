use std::sync::Arc;

use crate::{
    db::{MemoryHeapRegistry, MemoryRatingRepository},
    services::{providers::RatingProvider, ranking_store::HeapRegistry, ratings::RatingRepository},
    services::RankOptions,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub ratings: Arc<dyn RatingRepository>,
    pub heaps: Arc<dyn HeapRegistry>,
    pub provider: Arc<dyn RatingProvider>,
    pub settings: RankingSettings,
}

/// Request-independent knobs taken from configuration
#[derive(Debug, Clone, Copy)]
pub struct RankingSettings {
    pub max_rating: f64,
    pub rank_options: RankOptions,
    /// Directory users need more anime than this to be imported
    pub discovery_min_anime_count: u32,
}

impl Default for RankingSettings {
    fn default() -> Self {
        Self {
            max_rating: 10.0,
            rank_options: RankOptions::default(),
            discovery_min_anime_count: 50,
        }
    }
}

impl AppState {
    pub fn new(
        ratings: Arc<dyn RatingRepository>,
        heaps: Arc<dyn HeapRegistry>,
        provider: Arc<dyn RatingProvider>,
        settings: RankingSettings,
    ) -> Self {
        Self {
            ratings,
            heaps,
            provider,
            settings,
        }
    }

    /// State backed by fresh in-process stores
    pub fn in_memory(provider: Arc<dyn RatingProvider>, settings: RankingSettings) -> Self {
        Self::new(
            Arc::new(MemoryRatingRepository::new()),
            Arc::new(MemoryHeapRegistry::new()),
            provider,
            settings,
        )
    }
}
