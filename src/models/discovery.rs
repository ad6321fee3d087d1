use serde::{Deserialize, Serialize};

use super::rating::UserId;

/// A user listed by a provider's user directory
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderUser {
    pub user_id: UserId,
    /// Anime on the user's list, as counted by the provider
    pub anime_count: u32,
}

/// Outcome of importing one page of a provider's user directory
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiscoverySummary {
    pub page: u32,
    /// Users on the page
    pub listed: usize,
    /// Users above the anime count threshold
    pub eligible: usize,
    /// Eligible users whose ratings were stored
    pub synced: usize,
    /// Eligible users whose list was missing, private or unusable
    pub skipped: usize,
}
