//! In-process storage used by tests and by `STORAGE_BACKEND=memory` runs.
//!
//! Both stores honour the same contracts as their Postgres counterparts:
//! heap transactions are exclusive and all-or-nothing, and unknown users are
//! reported as `NotFound`.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::{
    error::{AppError, AppResult},
    models::{RatingVector, SimilarityEntry, SyncSummary, UserId},
    services::{
        ranking_store::{HeapBackend, HeapRegistry, HeapTransaction},
        ratings::{RatingRepository, RatingSource},
    },
};

/// Heap slots held in memory; slot 0 is the sentinel
#[derive(Clone)]
pub struct MemoryHeapBackend {
    slots: Arc<Mutex<Vec<SimilarityEntry>>>,
}

impl Default for MemoryHeapBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHeapBackend {
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(vec![SimilarityEntry::sentinel()])),
        }
    }

    /// Copy of every slot, sentinel included
    pub async fn snapshot(&self) -> Vec<SimilarityEntry> {
        self.slots.lock().await.clone()
    }
}

/// Works on a private copy of the slots and publishes it on commit.
/// The guard keeps other transactions out until this one is dropped.
struct MemoryHeapTransaction {
    guard: OwnedMutexGuard<Vec<SimilarityEntry>>,
    working: Vec<SimilarityEntry>,
}

#[async_trait::async_trait]
impl HeapBackend for MemoryHeapBackend {
    async fn begin(&self) -> AppResult<Box<dyn HeapTransaction>> {
        let guard = self.slots.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryHeapTransaction { guard, working }))
    }
}

#[async_trait::async_trait]
impl HeapTransaction for MemoryHeapTransaction {
    async fn read_length(&mut self) -> AppResult<usize> {
        Ok(self.working.len() - 1)
    }

    async fn read_entry(&mut self, index: usize) -> AppResult<SimilarityEntry> {
        self.working
            .get(index)
            .copied()
            .ok_or_else(|| AppError::NotFound(format!("heap index {}", index)))
    }

    async fn write_entry(&mut self, index: usize, entry: SimilarityEntry) -> AppResult<()> {
        if index == 0 {
            return Err(AppError::Internal(
                "heap sentinel slot is read-only".to_string(),
            ));
        }

        match index.cmp(&self.working.len()) {
            std::cmp::Ordering::Less => self.working[index] = entry,
            std::cmp::Ordering::Equal => self.working.push(entry),
            std::cmp::Ordering::Greater => {
                return Err(AppError::NotFound(format!("heap index {}", index)))
            }
        }
        Ok(())
    }

    async fn append_entry(&mut self, entry: SimilarityEntry) -> AppResult<usize> {
        self.working.push(entry);
        Ok(self.working.len() - 1)
    }

    async fn truncate_after(&mut self, index: usize) -> AppResult<()> {
        self.working.truncate(index + 1);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let MemoryHeapTransaction { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}

/// One in-memory heap per ranking id
#[derive(Default)]
pub struct MemoryHeapRegistry {
    heaps: Mutex<HashMap<UserId, MemoryHeapBackend>>,
}

impl MemoryHeapRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl HeapRegistry for MemoryHeapRegistry {
    async fn open(&self, ranking_id: UserId) -> AppResult<Arc<dyn HeapBackend>> {
        let mut heaps = self.heaps.lock().await;
        let backend = heaps.entry(ranking_id).or_default().clone();
        Ok(Arc::new(backend))
    }
}

/// Ratings keyed by user, kept in user id order
#[derive(Default)]
pub struct MemoryRatingRepository {
    users: RwLock<BTreeMap<UserId, RatingVector>>,
}

impl MemoryRatingRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl RatingSource for MemoryRatingRepository {
    async fn rating_vector(&self, user_id: UserId) -> AppResult<RatingVector> {
        self.users
            .read()
            .await
            .get(&user_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("user {}", user_id)))
    }

    async fn user_ids(&self) -> AppResult<Vec<UserId>> {
        Ok(self.users.read().await.keys().copied().collect())
    }
}

#[async_trait::async_trait]
impl RatingRepository for MemoryRatingRepository {
    async fn replace_ratings(
        &self,
        user_id: UserId,
        ratings: &RatingVector,
    ) -> AppResult<SyncSummary> {
        self.users.write().await.insert(user_id, ratings.clone());
        Ok(SyncSummary {
            user_id,
            rating_count: ratings.len(),
            synced_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_uncommitted_transaction_is_discarded() {
        let backend = MemoryHeapBackend::new();
        {
            let mut tx = backend.begin().await.unwrap();
            tx.append_entry(SimilarityEntry::new(1, 1.0)).await.unwrap();
            assert_eq!(tx.read_length().await.unwrap(), 1);
        }
        assert_eq!(backend.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn test_committed_transaction_is_visible() {
        let backend = MemoryHeapBackend::new();
        let mut tx = backend.begin().await.unwrap();
        assert_eq!(tx.append_entry(SimilarityEntry::new(1, 1.0)).await.unwrap(), 1);
        assert_eq!(tx.append_entry(SimilarityEntry::new(2, 2.0)).await.unwrap(), 2);
        tx.commit().await.unwrap();

        let mut tx = backend.begin().await.unwrap();
        assert_eq!(tx.read_length().await.unwrap(), 2);
        assert_eq!(tx.read_entry(2).await.unwrap(), SimilarityEntry::new(2, 2.0));
    }

    #[tokio::test]
    async fn test_sentinel_is_readable_but_not_writable() {
        let backend = MemoryHeapBackend::new();
        let mut tx = backend.begin().await.unwrap();
        assert_eq!(tx.read_entry(0).await.unwrap(), SimilarityEntry::sentinel());
        assert!(tx.write_entry(0, SimilarityEntry::new(1, 1.0)).await.is_err());
    }

    #[tokio::test]
    async fn test_read_past_end_is_not_found() {
        let backend = MemoryHeapBackend::new();
        let mut tx = backend.begin().await.unwrap();
        assert!(matches!(
            tx.read_entry(1).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_registry_returns_same_heap_per_ranking() {
        let registry = MemoryHeapRegistry::new();
        let first = registry.open(7).await.unwrap();
        let mut tx = first.begin().await.unwrap();
        tx.append_entry(SimilarityEntry::new(3, 0.5)).await.unwrap();
        tx.commit().await.unwrap();

        let again = registry.open(7).await.unwrap();
        assert_eq!(again.begin().await.unwrap().read_length().await.unwrap(), 1);

        let other = registry.open(8).await.unwrap();
        assert_eq!(other.begin().await.unwrap().read_length().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_found() {
        let repository = MemoryRatingRepository::new();
        assert!(matches!(
            repository.rating_vector(42).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_replace_ratings_overwrites_previous_vector() {
        let repository = MemoryRatingRepository::new();
        let first: RatingVector = vec![(1, 5.0), (2, 6.0)].into_iter().collect();
        let second: RatingVector = vec![(3, 7.0)].into_iter().collect();

        repository.replace_ratings(9, &first).await.unwrap();
        let summary = repository.replace_ratings(9, &second).await.unwrap();

        assert_eq!(summary.rating_count, 1);
        assert_eq!(repository.rating_vector(9).await.unwrap(), second);
        assert_eq!(repository.user_ids().await.unwrap(), vec![9]);
    }
}
