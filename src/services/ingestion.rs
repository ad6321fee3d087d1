use crate::{
    error::{AppError, AppResult},
    models::{DiscoverySummary, RatingEntry, RatingVector, SyncSummary, UserId},
    services::{
        providers::{FetchMode, RatingProvider},
        ratings::RatingRepository,
    },
};

/// Builds a rating vector from API input
///
/// Scores must be finite and within `[0, max_rating]`; an item may appear
/// only once.
pub fn validate_ratings(entries: &[RatingEntry], max_rating: f64) -> AppResult<RatingVector> {
    let mut ratings = RatingVector::new();
    for entry in entries {
        check_score(entry.item_id, entry.score, max_rating)?;
        if ratings.insert(entry.item_id, entry.score).is_some() {
            return Err(AppError::InvalidInput(format!(
                "item {} is rated more than once",
                entry.item_id
            )));
        }
    }
    Ok(ratings)
}

fn check_score(item_id: i64, score: f64, max_rating: f64) -> AppResult<()> {
    if !score.is_finite() || !(0.0..=max_rating).contains(&score) {
        return Err(AppError::InvalidScore(format!(
            "score {} for item {} is outside [0, {}]",
            score, item_id, max_rating
        )));
    }
    Ok(())
}

/// Validates and stores a user's full rating list
pub async fn ingest_ratings<R>(
    repository: &R,
    user_id: UserId,
    entries: &[RatingEntry],
    max_rating: f64,
) -> AppResult<SyncSummary>
where
    R: RatingRepository + ?Sized,
{
    let ratings = validate_ratings(entries, max_rating)?;
    repository.replace_ratings(user_id, &ratings).await
}

/// Pulls a user's current list from `provider`, bypassing any cached copy,
/// and stores it in place of what was there
pub async fn sync_from_provider<R, P>(
    repository: &R,
    provider: &P,
    user_id: UserId,
    max_rating: f64,
) -> AppResult<SyncSummary>
where
    R: RatingRepository + ?Sized,
    P: RatingProvider + ?Sized,
{
    store_provider_ratings(repository, provider, user_id, FetchMode::Refresh, max_rating).await
}

/// Imports one page of the provider's user directory
///
/// Every listed user with more than `min_anime_count` anime is fetched and
/// stored, growing the pool of ranking candidates. A user whose list is gone,
/// private or off the rating scale is skipped; any other error stops the page
/// and users stored before it stay stored.
pub async fn discover_users<R, P>(
    repository: &R,
    provider: &P,
    page: u32,
    min_anime_count: u32,
    max_rating: f64,
) -> AppResult<DiscoverySummary>
where
    R: RatingRepository + ?Sized,
    P: RatingProvider + ?Sized,
{
    let users = provider.list_users(page).await?;
    let mut summary = DiscoverySummary {
        page,
        listed: users.len(),
        ..DiscoverySummary::default()
    };

    for user in users.iter().filter(|u| u.anime_count > min_anime_count) {
        summary.eligible += 1;
        let result = store_provider_ratings(
            repository,
            provider,
            user.user_id,
            FetchMode::PreferCache,
            max_rating,
        )
        .await;

        match result {
            Ok(_) => summary.synced += 1,
            Err(e @ (AppError::NotFound(_) | AppError::InvalidScore(_))) => {
                tracing::warn!(user_id = user.user_id, error = %e, "Skipping discovered user");
                summary.skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    tracing::info!(
        page = page,
        provider = provider.name(),
        listed = summary.listed,
        eligible = summary.eligible,
        synced = summary.synced,
        skipped = summary.skipped,
        "Imported user directory page"
    );

    Ok(summary)
}

async fn store_provider_ratings<R, P>(
    repository: &R,
    provider: &P,
    user_id: UserId,
    mode: FetchMode,
    max_rating: f64,
) -> AppResult<SyncSummary>
where
    R: RatingRepository + ?Sized,
    P: RatingProvider + ?Sized,
{
    let ratings = provider.fetch_user_ratings(user_id, mode).await?;
    for (item_id, score) in ratings.iter() {
        check_score(item_id, score, max_rating)?;
    }

    let summary = repository.replace_ratings(user_id, &ratings).await?;

    tracing::info!(
        user_id = user_id,
        provider = provider.name(),
        ratings = summary.rating_count,
        "Synced user ratings"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::memory::MemoryRatingRepository, models::ProviderUser,
        services::providers::MockRatingProvider, services::ratings::RatingSource,
    };
    use mockall::predicate::eq;

    fn entry(item_id: i64, score: f64) -> RatingEntry {
        RatingEntry { item_id, score }
    }

    #[test]
    fn test_validate_accepts_bounds() {
        let ratings = validate_ratings(&[entry(1, 0.0), entry(2, 10.0)], 10.0).unwrap();
        assert_eq!(ratings.len(), 2);
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        assert!(matches!(
            validate_ratings(&[entry(1, 10.5)], 10.0),
            Err(AppError::InvalidScore(_))
        ));
        assert!(matches!(
            validate_ratings(&[entry(1, -1.0)], 10.0),
            Err(AppError::InvalidScore(_))
        ));
        assert!(matches!(
            validate_ratings(&[entry(1, f64::NAN)], 10.0),
            Err(AppError::InvalidScore(_))
        ));
    }

    #[test]
    fn test_validate_rejects_duplicate_items() {
        assert!(matches!(
            validate_ratings(&[entry(1, 3.0), entry(1, 4.0)], 10.0),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_ingest_stores_valid_ratings() {
        let repository = MemoryRatingRepository::new();
        let summary = ingest_ratings(&repository, 5, &[entry(1, 7.0), entry(2, 3.5)], 10.0)
            .await
            .unwrap();

        assert_eq!(summary.rating_count, 2);
        assert_eq!(repository.rating_vector(5).await.unwrap().get(2), Some(3.5));
    }

    #[tokio::test]
    async fn test_ingest_rejects_without_storing() {
        let repository = MemoryRatingRepository::new();
        let result = ingest_ratings(&repository, 5, &[entry(1, 70.0)], 10.0).await;

        assert!(result.is_err());
        assert!(repository.user_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sync_stores_provider_ratings() {
        let mut provider = MockRatingProvider::new();
        provider
            .expect_fetch_user_ratings()
            .with(eq(12), eq(FetchMode::Refresh))
            .times(1)
            .returning(|_, _| Ok(vec![(100, 8.0), (200, 6.5)].into_iter().collect()));
        provider.expect_name().return_const("mock");

        let repository = MemoryRatingRepository::new();
        let summary = sync_from_provider(&repository, &provider, 12, 10.0)
            .await
            .unwrap();

        assert_eq!(summary.rating_count, 2);
        assert_eq!(repository.user_ids().await.unwrap(), vec![12]);
    }

    #[tokio::test]
    async fn test_sync_rejects_scores_above_scale() {
        let mut provider = MockRatingProvider::new();
        provider
            .expect_fetch_user_ratings()
            .returning(|_, _| Ok(vec![(100, 85.0)].into_iter().collect()));
        provider.expect_name().return_const("mock");

        let repository = MemoryRatingRepository::new();
        let result = sync_from_provider(&repository, &provider, 12, 10.0).await;

        assert!(matches!(result, Err(AppError::InvalidScore(_))));
        assert!(repository.user_ids().await.unwrap().is_empty());
    }

    fn directory(users: &[(UserId, u32)]) -> Vec<ProviderUser> {
        users
            .iter()
            .map(|&(user_id, anime_count)| ProviderUser {
                user_id,
                anime_count,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_discovery_imports_only_users_above_threshold() {
        let mut provider = MockRatingProvider::new();
        provider
            .expect_list_users()
            .with(eq(2))
            .times(1)
            .returning(|_| Ok(directory(&[(1, 51), (2, 50), (3, 7), (4, 300)])));
        provider
            .expect_fetch_user_ratings()
            .with(eq(1), eq(FetchMode::PreferCache))
            .times(1)
            .returning(|_, _| Ok(vec![(10, 6.0)].into_iter().collect()));
        provider
            .expect_fetch_user_ratings()
            .with(eq(4), eq(FetchMode::PreferCache))
            .times(1)
            .returning(|_, _| Ok(vec![(10, 9.0), (20, 2.5)].into_iter().collect()));
        provider.expect_name().return_const("mock");

        let repository = MemoryRatingRepository::new();
        let summary = discover_users(&repository, &provider, 2, 50, 10.0)
            .await
            .unwrap();

        assert_eq!(
            summary,
            DiscoverySummary {
                page: 2,
                listed: 4,
                eligible: 2,
                synced: 2,
                skipped: 0,
            }
        );
        assert_eq!(repository.user_ids().await.unwrap(), vec![1, 4]);
    }

    #[tokio::test]
    async fn test_discovery_skips_missing_lists() {
        let mut provider = MockRatingProvider::new();
        provider
            .expect_list_users()
            .returning(|_| Ok(directory(&[(1, 80), (2, 80)])));
        provider
            .expect_fetch_user_ratings()
            .with(eq(1), eq(FetchMode::PreferCache))
            .returning(|id, _| Err(AppError::NotFound(format!("list of {}", id))));
        provider
            .expect_fetch_user_ratings()
            .with(eq(2), eq(FetchMode::PreferCache))
            .returning(|_, _| Ok(vec![(10, 4.0)].into_iter().collect()));
        provider.expect_name().return_const("mock");

        let repository = MemoryRatingRepository::new();
        let summary = discover_users(&repository, &provider, 1, 50, 10.0)
            .await
            .unwrap();

        assert_eq!(summary.synced, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(repository.user_ids().await.unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn test_discovery_stops_on_provider_failure() {
        let mut provider = MockRatingProvider::new();
        provider
            .expect_list_users()
            .returning(|_| Ok(directory(&[(1, 80), (2, 80)])));
        provider
            .expect_fetch_user_ratings()
            .with(eq(1), eq(FetchMode::PreferCache))
            .returning(|_, _| Err(AppError::ExternalApi("rate limit".to_string())));
        provider
            .expect_fetch_user_ratings()
            .with(eq(2), eq(FetchMode::PreferCache))
            .never();
        provider.expect_name().return_const("mock");

        let repository = MemoryRatingRepository::new();
        let result = discover_users(&repository, &provider, 1, 50, 10.0).await;

        assert!(matches!(result, Err(AppError::ExternalApi(_))));
    }

    #[tokio::test]
    async fn test_discovery_of_empty_page() {
        let mut provider = MockRatingProvider::new();
        provider.expect_list_users().returning(|_| Ok(Vec::new()));
        provider.expect_fetch_user_ratings().never();
        provider.expect_name().return_const("mock");

        let repository = MemoryRatingRepository::new();
        let summary = discover_users(&repository, &provider, 9, 50, 10.0)
            .await
            .unwrap();

        assert_eq!(summary.listed, 0);
        assert_eq!(summary.eligible, 0);
    }
}
