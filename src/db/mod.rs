pub mod heap;
pub mod memory;
pub mod postgres;
pub mod ratings;
pub mod redis;

pub use heap::PgHeapRegistry;
pub use memory::{MemoryHeapBackend, MemoryHeapRegistry, MemoryRatingRepository};
pub use postgres::{create_pool, run_migrations};
pub use ratings::PgRatingRepository;
pub use redis::create_redis_client;
pub use redis::Cache;
pub use redis::CacheKey;
pub use redis::CacheWriterHandle;
