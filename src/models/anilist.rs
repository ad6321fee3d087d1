use serde::{Deserialize, Serialize};

// ============================================================================
// AniList GraphQL Types
// ============================================================================

/// Request body of a GraphQL call
#[derive(Debug, Serialize)]
pub struct GraphQlRequest<'a, V: Serialize> {
    pub query: &'a str,
    pub variables: V,
}

/// Envelope of every GraphQL response
#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlError {
    pub message: String,
    #[serde(default)]
    pub status: Option<u16>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MediaListCollectionData {
    pub media_list_collection: Option<MediaListCollection>,
}

#[derive(Debug, Deserialize)]
pub struct MediaListCollection {
    #[serde(default)]
    pub lists: Vec<MediaListGroup>,
}

#[derive(Debug, Deserialize)]
pub struct MediaListGroup {
    #[serde(default)]
    pub entries: Vec<MediaListEntry>,
}

#[derive(Debug, Deserialize)]
pub struct MediaListEntry {
    pub media: MediaRef,
    /// Zero or absent when the user has not scored the title
    #[serde(default)]
    pub score: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct MediaRef {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PageData {
    pub page: Option<UserPage>,
}

#[derive(Debug, Deserialize)]
pub struct UserPage {
    #[serde(default)]
    pub users: Vec<PageUser>,
}

#[derive(Debug, Deserialize)]
pub struct PageUser {
    pub id: i64,
    pub statistics: Option<UserStatistics>,
}

#[derive(Debug, Deserialize)]
pub struct UserStatistics {
    pub anime: Option<AnimeStatistics>,
}

#[derive(Debug, Deserialize)]
pub struct AnimeStatistics {
    #[serde(default)]
    pub count: u32,
}
