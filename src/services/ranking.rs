use tracing::instrument;

use crate::{
    error::AppResult,
    models::{RankSummary, SimilarityEntry, UserId},
    services::{ranking_store::RankingStore, ratings::RatingSource, similarity},
};

/// Knobs for a ranking run
#[derive(Debug, Clone, Copy, Default)]
pub struct RankOptions {
    /// Leave the target out of its own ranking; otherwise it is scored
    /// against itself like any other user and ranks with distance 0
    pub skip_target: bool,
}

/// Scores every known user against `target` and pushes each one that shares
/// at least one rated item into `store`
///
/// Candidates are visited in the order the source lists them and inserted one
/// at a time. Users with no overlap are skipped. Any source or storage error
/// stops the run and is returned; entries inserted before the failure stay.
#[instrument(skip(source, store, options), fields(ranking_id = store.ranking_id()))]
pub async fn rank_similar_users_to<S>(
    source: &S,
    store: &RankingStore,
    target: UserId,
    options: RankOptions,
) -> AppResult<RankSummary>
where
    S: RatingSource + ?Sized,
{
    let target_ratings = source.rating_vector(target).await?;
    let candidates = source.user_ids().await?;

    let mut summary = RankSummary {
        target_user_id: target,
        ..RankSummary::default()
    };

    for candidate in candidates {
        if options.skip_target && candidate == target {
            continue;
        }
        summary.candidates += 1;

        let candidate_ratings = source.rating_vector(candidate).await?;
        match similarity::score(&target_ratings, &candidate_ratings) {
            Some(score) => {
                store.insert(SimilarityEntry::new(candidate, score)).await?;
                summary.inserted += 1;
            }
            None => {
                tracing::trace!(candidate = candidate, "No shared ratings, skipping");
                summary.skipped_no_overlap += 1;
            }
        }
    }

    tracing::info!(
        target_user_id = target,
        candidates = summary.candidates,
        inserted = summary.inserted,
        skipped = summary.skipped_no_overlap,
        "Ranking completed"
    );

    Ok(summary)
}

/// Scores every candidate like [`rank_similar_users_to`], then swaps the
/// results in for the target's current ranking in one step
///
/// Nothing is written until every candidate is scored, so a failed run leaves
/// the previous ranking untouched and concurrent readers never see a partly
/// built one.
#[instrument(skip(source, store, options), fields(ranking_id = store.ranking_id()))]
pub async fn rebuild_ranking_for<S>(
    source: &S,
    store: &RankingStore,
    target: UserId,
    options: RankOptions,
) -> AppResult<RankSummary>
where
    S: RatingSource + ?Sized,
{
    let target_ratings = source.rating_vector(target).await?;
    let candidates = source.user_ids().await?;

    let mut summary = RankSummary {
        target_user_id: target,
        ..RankSummary::default()
    };
    let mut entries = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        if options.skip_target && candidate == target {
            continue;
        }
        summary.candidates += 1;

        let candidate_ratings = source.rating_vector(candidate).await?;
        match similarity::score(&target_ratings, &candidate_ratings) {
            Some(score) => entries.push(SimilarityEntry::new(candidate, score)),
            None => summary.skipped_no_overlap += 1,
        }
    }

    store.rebuild(&entries).await?;
    summary.inserted = entries.len();

    tracing::info!(
        target_user_id = target,
        candidates = summary.candidates,
        inserted = summary.inserted,
        skipped = summary.skipped_no_overlap,
        "Ranking rebuilt"
    );

    Ok(summary)
}
