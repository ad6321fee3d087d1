/// AniList rating provider
///
/// Reads a user's anime list through the public GraphQL API. Scores are
/// requested in `POINT_10_DECIMAL` format so every user is on the same 0-10
/// scale regardless of their profile setting; unscored entries come back as 0
/// and are dropped.
///
/// Fetched lists are cached in Redis when a cache is configured. Requests are
/// not retried. A rate-limited call surfaces as an external API error and the
/// caller decides when to try again.
use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{
        GraphQlRequest, GraphQlResponse, MediaListCollection, MediaListCollectionData, PageData,
        ProviderUser, RatingVector, UserId, UserPage,
    },
    services::providers::{FetchMode, RatingProvider},
};
use reqwest::Client as HttpClient;
use serde::{de::DeserializeOwned, Serialize};
use tracing::instrument;

const MEDIA_LIST_QUERY: &str = r#"
query ($userId: Int) {
  MediaListCollection(userId: $userId, type: ANIME) {
    lists {
      entries {
        media { id }
        score(format: POINT_10_DECIMAL)
      }
    }
  }
}
"#;

const USER_PAGE_QUERY: &str = r#"
query ($page: Int, $perPage: Int) {
  Page(page: $page, perPage: $perPage) {
    users(sort: WATCHED_TIME_DESC) {
      id
      statistics {
        anime { count }
      }
    }
  }
}
"#;

/// Largest page AniList serves
const USERS_PER_PAGE: u32 = 50;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MediaListVariables {
    user_id: UserId,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UserPageVariables {
    page: u32,
    per_page: u32,
}

#[derive(Clone)]
pub struct AnilistProvider {
    http_client: HttpClient,
    api_url: String,
    cache: Option<Cache>,
    cache_ttl: u64,
}

impl AnilistProvider {
    /// Without a cache every fetch goes to AniList
    pub fn new(cache: Option<Cache>, api_url: String, cache_ttl: u64) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_url,
            cache,
            cache_ttl,
        }
    }

    /// Posts a GraphQL query and unwraps the `data` member of the response
    async fn post_query<V, T>(&self, query: &str, variables: V) -> AppResult<T>
    where
        V: Serialize + Send,
        T: DeserializeOwned + Send,
    {
        let response = self
            .http_client
            .post(&self.api_url)
            .header("Accept", "application/json")
            .json(&GraphQlRequest { query, variables })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        match serde_json::from_str::<GraphQlResponse<T>>(&body) {
            Ok(envelope) => Self::into_data(envelope),
            Err(e) if status.is_success() => {
                tracing::error!(error = %e, response = %body, "Failed to deserialize AniList response");
                Err(AppError::ExternalApi(format!(
                    "Failed to parse AniList response: {}",
                    e
                )))
            }
            Err(_) => Err(AppError::ExternalApi(format!(
                "AniList API returned status {}: {}",
                status, body
            ))),
        }
    }

    /// GraphQL reports failures in `errors`, often alongside a null `data`
    fn into_data<T>(envelope: GraphQlResponse<T>) -> AppResult<T> {
        if let Some(error) = envelope.errors.first() {
            return Err(match error.status {
                Some(404) => AppError::NotFound(error.message.clone()),
                Some(429) => AppError::ExternalApi("AniList rate limit reached".to_string()),
                _ => AppError::ExternalApi(format!("AniList error: {}", error.message)),
            });
        }

        envelope
            .data
            .ok_or_else(|| AppError::ExternalApi("AniList response has no data".to_string()))
    }

    /// Flattens every list into one vector. A title listed twice keeps the
    /// score it has in the first list; unscored titles are skipped.
    fn collect_ratings(collection: MediaListCollection) -> RatingVector {
        let mut ratings = RatingVector::new();
        for entry in collection.lists.into_iter().flat_map(|list| list.entries) {
            let score = match entry.score {
                Some(score) if score > 0.0 => score,
                _ => continue,
            };
            if !ratings.contains(entry.media.id) {
                ratings.insert(entry.media.id, score);
            }
        }
        ratings
    }

    /// Users without statistics count as having an empty list
    fn collect_users(page: UserPage) -> Vec<ProviderUser> {
        page.users
            .into_iter()
            .map(|user| ProviderUser {
                user_id: user.id,
                anime_count: user
                    .statistics
                    .and_then(|stats| stats.anime)
                    .map(|anime| anime.count)
                    .unwrap_or(0),
            })
            .collect()
    }

    async fn request_user_ratings(&self, user_id: UserId) -> AppResult<RatingVector> {
        let data: MediaListCollectionData = self
            .post_query(MEDIA_LIST_QUERY, MediaListVariables { user_id })
            .await?;

        let collection = data
            .media_list_collection
            .ok_or_else(|| AppError::NotFound(format!("AniList list for user {}", user_id)))?;
        let ratings = Self::collect_ratings(collection);

        tracing::info!(
            user_id = user_id,
            ratings = ratings.len(),
            provider = "anilist",
            "Fetched user ratings"
        );

        Ok(ratings)
    }
}

#[async_trait::async_trait]
impl RatingProvider for AnilistProvider {
    #[instrument(skip(self))]
    async fn fetch_user_ratings(
        &self,
        user_id: UserId,
        mode: FetchMode,
    ) -> AppResult<RatingVector> {
        match (&self.cache, mode) {
            (Some(cache), FetchMode::PreferCache) => cached!(
                cache,
                CacheKey::UserRatings(user_id),
                self.cache_ttl,
                self.request_user_ratings(user_id)
            ),
            (cache, _) => {
                let ratings = self.request_user_ratings(user_id).await?;
                if let Some(cache) = cache {
                    cache.set_in_background(
                        &CacheKey::UserRatings(user_id),
                        &ratings,
                        self.cache_ttl,
                    );
                }
                Ok(ratings)
            }
        }
    }

    #[instrument(skip(self))]
    async fn list_users(&self, page: u32) -> AppResult<Vec<ProviderUser>> {
        let data: PageData = self
            .post_query(
                USER_PAGE_QUERY,
                UserPageVariables {
                    page,
                    per_page: USERS_PER_PAGE,
                },
            )
            .await?;

        let users = data.page.map(Self::collect_users).unwrap_or_default();
        tracing::info!(page = page, users = users.len(), "Fetched AniList user page");

        Ok(users)
    }

    fn name(&self) -> &'static str {
        "anilist"
    }
}
