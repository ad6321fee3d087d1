use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    error::AppResult,
    middleware::request_id::RequestId,
    models::{
        DiscoverySummary, RankSummary, RankingView, RatingEntry, SimilarityEntry, SyncSummary,
        UserId,
    },
    services::{ingestion, rank_similar_users_to, rebuild_ranking_for, RankingStore},
};

use super::AppState;

const DEFAULT_TOP_LIMIT: usize = 10;
const MAX_TOP_LIMIT: usize = 500;
const MAX_EXTRACT_COUNT: usize = 500;

#[derive(Debug, Deserialize)]
pub struct RankQuery {
    /// Replace the ranking with a fresh one instead of adding to it
    #[serde(default)]
    pub reset: bool,
}

#[derive(Debug, Deserialize)]
pub struct DiscoverQuery {
    pub page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct TopQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ExtractQuery {
    pub count: Option<usize>,
}

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Stored ratings of a user
pub async fn get_ratings(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> AppResult<Json<Vec<RatingEntry>>> {
    let ratings = state.ratings.rating_vector(user_id).await?;
    Ok(Json(ratings.to_entries()))
}

/// Replace a user's ratings with the request body
pub async fn put_ratings(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Extension(request_id): Extension<RequestId>,
    Json(entries): Json<Vec<RatingEntry>>,
) -> AppResult<Json<SyncSummary>> {
    tracing::info!(
        request_id = %request_id,
        user_id = user_id,
        ratings = entries.len(),
        "Storing submitted ratings"
    );

    let summary = ingestion::ingest_ratings(
        state.ratings.as_ref(),
        user_id,
        &entries,
        state.settings.max_rating,
    )
    .await?;

    Ok(Json(summary))
}

/// Refresh a user's ratings from the external provider
pub async fn sync_ratings(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Extension(request_id): Extension<RequestId>,
) -> AppResult<Json<SyncSummary>> {
    tracing::info!(
        request_id = %request_id,
        user_id = user_id,
        provider = state.provider.name(),
        "Syncing ratings from provider"
    );

    let summary = ingestion::sync_from_provider(
        state.ratings.as_ref(),
        state.provider.as_ref(),
        user_id,
        state.settings.max_rating,
    )
    .await?;

    Ok(Json(summary))
}

/// Import one page of the provider's user directory
pub async fn discover_users(
    State(state): State<AppState>,
    Query(query): Query<DiscoverQuery>,
    Extension(request_id): Extension<RequestId>,
) -> AppResult<Json<DiscoverySummary>> {
    let page = query.page.unwrap_or(1).max(1);
    tracing::info!(
        request_id = %request_id,
        page = page,
        provider = state.provider.name(),
        "Importing provider users"
    );

    let summary = ingestion::discover_users(
        state.ratings.as_ref(),
        state.provider.as_ref(),
        page,
        state.settings.discovery_min_anime_count,
        state.settings.max_rating,
    )
    .await?;

    Ok(Json(summary))
}

/// Score every known user against the target and add them to its ranking
pub async fn rank(
    State(state): State<AppState>,
    Path(target): Path<UserId>,
    Query(query): Query<RankQuery>,
    Extension(request_id): Extension<RequestId>,
) -> AppResult<Json<RankSummary>> {
    tracing::info!(
        request_id = %request_id,
        target_user_id = target,
        reset = query.reset,
        "Processing ranking request"
    );

    let store = RankingStore::open(state.heaps.as_ref(), target).await?;
    let summary = if query.reset {
        rebuild_ranking_for(
            state.ratings.as_ref(),
            &store,
            target,
            state.settings.rank_options,
        )
        .await?
    } else {
        rank_similar_users_to(
            state.ratings.as_ref(),
            &store,
            target,
            state.settings.rank_options,
        )
        .await?
    };

    Ok(Json(summary))
}

/// Most similar users of the target, leaving the ranking intact
pub async fn get_ranking(
    State(state): State<AppState>,
    Path(target): Path<UserId>,
    Query(query): Query<TopQuery>,
) -> AppResult<Json<RankingView>> {
    let limit = query.limit.unwrap_or(DEFAULT_TOP_LIMIT).min(MAX_TOP_LIMIT);

    let store = RankingStore::open(state.heaps.as_ref(), target).await?;
    let length = store.len().await?;
    let entries = store.top(limit).await?;

    Ok(Json(RankingView {
        ranking_id: target,
        length,
        entries,
    }))
}

/// Remove and return the most similar users, closest first
pub async fn extract(
    State(state): State<AppState>,
    Path(target): Path<UserId>,
    Query(query): Query<ExtractQuery>,
) -> AppResult<Json<Vec<SimilarityEntry>>> {
    let count = query.count.unwrap_or(1).min(MAX_EXTRACT_COUNT);

    let store = RankingStore::open(state.heaps.as_ref(), target).await?;
    let mut extracted = Vec::with_capacity(count);
    while extracted.len() < count {
        match store.extract_min().await? {
            Some(entry) => extracted.push(entry),
            None => break,
        }
    }

    Ok(Json(extracted))
}
