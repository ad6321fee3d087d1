use chrono::Utc;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::{ItemId, RatingVector, SyncSummary, UserId},
    services::ratings::{RatingRepository, RatingSource},
};

/// Rows per multi-row INSERT
const INSERT_CHUNK: usize = 500;

/// Ratings stored in `rating_users` and `user_ratings`
#[derive(Clone)]
pub struct PgRatingRepository {
    pool: PgPool,
}

impl PgRatingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl RatingSource for PgRatingRepository {
    async fn rating_vector(&self, user_id: UserId) -> AppResult<RatingVector> {
        let known: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM rating_users WHERE user_id = $1)")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;
        if !known {
            return Err(AppError::NotFound(format!("user {}", user_id)));
        }

        let rows: Vec<(ItemId, f64)> =
            sqlx::query_as("SELECT item_id, score FROM user_ratings WHERE user_id = $1")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().collect())
    }

    async fn user_ids(&self) -> AppResult<Vec<UserId>> {
        let ids = sqlx::query_scalar("SELECT user_id FROM rating_users ORDER BY user_id")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }
}

#[async_trait::async_trait]
impl RatingRepository for PgRatingRepository {
    async fn replace_ratings(
        &self,
        user_id: UserId,
        ratings: &RatingVector,
    ) -> AppResult<SyncSummary> {
        let synced_at = Utc::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO rating_users (user_id, synced_at)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET synced_at = EXCLUDED.synced_at
            "#,
        )
        .bind(user_id)
        .bind(synced_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM user_ratings WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let rows: Vec<(ItemId, f64)> = ratings.iter().collect();
        for chunk in rows.chunks(INSERT_CHUNK) {
            let mut builder: QueryBuilder<Postgres> =
                QueryBuilder::new("INSERT INTO user_ratings (user_id, item_id, score) ");
            builder.push_values(chunk, |mut row, (item_id, score)| {
                row.push_bind(user_id).push_bind(*item_id).push_bind(*score);
            });
            builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;

        tracing::info!(
            user_id = user_id,
            ratings = rows.len(),
            "Replaced stored ratings"
        );

        Ok(SyncSummary {
            user_id,
            rating_count: rows.len(),
            synced_at,
        })
    }
}
