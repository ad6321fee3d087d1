use std::sync::Arc;

use anirank::{
    api::{create_router, AppState, RankingSettings},
    config::{Config, StorageBackend},
    db::{self, Cache, CacheWriterHandle, PgHeapRegistry, PgRatingRepository},
    services::{providers::anilist::AnilistProvider, RankOptions},
};
use sqlx::PgPool;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Connections closed after the server stops
struct Resources {
    pool: PgPool,
    cache_handle: CacheWriterHandle,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "anirank=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let settings = RankingSettings {
        max_rating: config.max_rating,
        rank_options: RankOptions {
            skip_target: config.skip_target_in_ranking,
        },
        discovery_min_anime_count: config.discovery_min_anime_count,
    };

    let (state, resources) = match config.storage_backend {
        StorageBackend::Postgres => {
            let pool = db::create_pool(&config.database_url).await?;
            db::run_migrations(&pool).await?;

            let redis_client = db::create_redis_client(&config.redis_url)?;
            let (cache, cache_handle) = Cache::new(redis_client);

            let provider = AnilistProvider::new(
                Some(cache),
                config.anilist_api_url.clone(),
                config.anilist_cache_ttl,
            );

            let state = AppState::new(
                Arc::new(PgRatingRepository::new(pool.clone())),
                Arc::new(PgHeapRegistry::new(pool.clone())),
                Arc::new(provider),
                settings,
            );
            (state, Some(Resources { pool, cache_handle }))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on shutdown");
            let provider = AnilistProvider::new(
                None,
                config.anilist_api_url.clone(),
                config.anilist_cache_ttl,
            );
            (AppState::in_memory(Arc::new(provider), settings), None)
        }
    };

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    tracing::info!(
        address = %config.bind_address(),
        storage = ?config.storage_backend,
        "Server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(Resources { pool, cache_handle }) = resources {
        cache_handle.shutdown().await;
        pool.close().await;
    }
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
