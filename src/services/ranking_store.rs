/// Persisted similarity ranking
///
/// A binary min-heap of [`SimilarityEntry`] values laid out in numbered storage
/// slots. Slot 0 always holds a sentinel scoring `-inf`, real entries occupy
/// slots `1..=len`, and the children of slot `i` are `2i` and `2i + 1`.
///
/// Every public operation runs inside a single [`HeapTransaction`]. The heap
/// length is read from storage inside that transaction rather than cached, and
/// a failure at any step rolls the whole operation back, so readers never see
/// a half-finished sift.
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{SimilarityEntry, UserId},
};

/// One exclusive unit of work against a heap's storage
///
/// Dropping a transaction without calling [`HeapTransaction::commit`] discards
/// every write made through it.
#[async_trait::async_trait]
pub trait HeapTransaction: Send {
    /// Number of real entries, sentinel excluded
    async fn read_length(&mut self) -> AppResult<usize>;

    /// Entry stored at `index`; index 0 yields the sentinel
    async fn read_entry(&mut self, index: usize) -> AppResult<SimilarityEntry>;

    /// Upserts the entry at `index`. Index 0 is read-only.
    async fn write_entry(&mut self, index: usize, entry: SimilarityEntry) -> AppResult<()>;

    /// Stores `entry` in the slot after the last one and returns that index
    async fn append_entry(&mut self, entry: SimilarityEntry) -> AppResult<usize>;

    /// Drops every slot above `index`
    async fn truncate_after(&mut self, index: usize) -> AppResult<()>;

    async fn commit(self: Box<Self>) -> AppResult<()>;
}

/// Durable storage for one heap
#[async_trait::async_trait]
pub trait HeapBackend: Send + Sync {
    /// Opens a transaction; concurrent callers wait until it ends
    async fn begin(&self) -> AppResult<Box<dyn HeapTransaction>>;
}

/// Resolves the storage of each target user's ranking
#[async_trait::async_trait]
pub trait HeapRegistry: Send + Sync {
    /// Returns the backend for `ranking_id`, creating the heap and its
    /// sentinel on first use
    async fn open(&self, ranking_id: UserId) -> AppResult<Arc<dyn HeapBackend>>;
}

/// Min-heap of candidate users ordered by ascending distance
#[derive(Clone)]
pub struct RankingStore {
    ranking_id: UserId,
    backend: Arc<dyn HeapBackend>,
}

impl RankingStore {
    pub fn new(ranking_id: UserId, backend: Arc<dyn HeapBackend>) -> Self {
        Self {
            ranking_id,
            backend,
        }
    }

    /// Opens the ranking kept for `ranking_id`
    pub async fn open(registry: &dyn HeapRegistry, ranking_id: UserId) -> AppResult<Self> {
        let backend = registry.open(ranking_id).await?;
        Ok(Self::new(ranking_id, backend))
    }

    pub fn ranking_id(&self) -> UserId {
        self.ranking_id
    }

    /// Number of entries currently ranked
    pub async fn len(&self) -> AppResult<usize> {
        let mut tx = self.backend.begin().await?;
        let len = tx.read_length().await?;
        tx.commit().await?;
        Ok(len)
    }

    pub async fn is_empty(&self) -> AppResult<bool> {
        Ok(self.len().await? == 0)
    }

    /// Adds a candidate and restores heap order
    pub async fn insert(&self, entry: SimilarityEntry) -> AppResult<()> {
        if entry.score.is_nan() {
            return Err(AppError::InvalidScore(format!(
                "similarity score for user {} is NaN",
                entry.user_id
            )));
        }

        let mut tx = self.backend.begin().await?;
        let index = tx.append_entry(entry).await?;
        let position = sift_up(tx.as_mut(), index, entry).await?;
        tx.commit().await?;

        tracing::debug!(
            ranking_id = self.ranking_id,
            user_id = entry.user_id,
            score = entry.score,
            position = position,
            "Inserted similarity entry"
        );

        Ok(())
    }

    /// Removes and returns the entry with the smallest score
    pub async fn extract_min(&self) -> AppResult<Option<SimilarityEntry>> {
        let mut tx = self.backend.begin().await?;
        let len = tx.read_length().await?;
        if len == 0 {
            return Ok(None);
        }

        let min = tx.read_entry(1).await?;
        let last = tx.read_entry(len).await?;
        tx.truncate_after(len - 1).await?;

        let remaining = len - 1;
        if remaining > 0 {
            sift_down(tx.as_mut(), last, remaining).await?;
        }
        tx.commit().await?;

        tracing::debug!(
            ranking_id = self.ranking_id,
            user_id = min.user_id,
            score = min.score,
            remaining = remaining,
            "Extracted minimum similarity entry"
        );

        Ok(Some(min))
    }

    /// Smallest entry without removing it
    pub async fn peek_min(&self) -> AppResult<Option<SimilarityEntry>> {
        let mut tx = self.backend.begin().await?;
        let min = if tx.read_length().await? == 0 {
            None
        } else {
            Some(tx.read_entry(1).await?)
        };
        tx.commit().await?;
        Ok(min)
    }

    /// The `limit` smallest entries in ascending order, heap left untouched
    ///
    /// Walks the heap best-first: a slot is only read once its parent has
    /// been emitted, so at most `2 * limit + 1` slots are read.
    pub async fn top(&self, limit: usize) -> AppResult<Vec<SimilarityEntry>> {
        let mut tx = self.backend.begin().await?;
        let len = tx.read_length().await?;

        let mut ranked = Vec::with_capacity(limit.min(len));
        let mut frontier = BinaryHeap::new();
        if len > 0 && limit > 0 {
            frontier.push(Frontier {
                index: 1,
                entry: tx.read_entry(1).await?,
            });
        }

        while let Some(Frontier { index, entry }) = frontier.pop() {
            ranked.push(entry);
            if ranked.len() == limit {
                break;
            }
            for child in [2 * index, 2 * index + 1] {
                if child <= len {
                    frontier.push(Frontier {
                        index: child,
                        entry: tx.read_entry(child).await?,
                    });
                }
            }
        }
        tx.commit().await?;

        Ok(ranked)
    }

    /// Drops every entry, keeping the sentinel. Returns how many were removed.
    pub async fn clear(&self) -> AppResult<usize> {
        let mut tx = self.backend.begin().await?;
        let len = tx.read_length().await?;
        tx.truncate_after(0).await?;
        tx.commit().await?;

        tracing::info!(
            ranking_id = self.ranking_id,
            removed = len,
            "Cleared ranking"
        );

        Ok(len)
    }

    /// Replaces every entry with `entries` inside one transaction, so readers
    /// see either the previous ranking or the complete new one. Returns how
    /// many entries were replaced.
    pub async fn rebuild(&self, entries: &[SimilarityEntry]) -> AppResult<usize> {
        if let Some(entry) = entries.iter().find(|e| e.score.is_nan()) {
            return Err(AppError::InvalidScore(format!(
                "similarity score for user {} is NaN",
                entry.user_id
            )));
        }

        let mut tx = self.backend.begin().await?;
        let replaced = tx.read_length().await?;
        tx.truncate_after(0).await?;
        for entry in entries {
            let index = tx.append_entry(*entry).await?;
            sift_up(tx.as_mut(), index, *entry).await?;
        }
        tx.commit().await?;

        tracing::info!(
            ranking_id = self.ranking_id,
            replaced = replaced,
            inserted = entries.len(),
            "Rebuilt ranking"
        );

        Ok(replaced)
    }
}

/// Moves `entry`, already stored at `index`, up until its parent is no larger.
/// The sentinel at slot 0 stops the walk at the root. Returns the final slot.
async fn sift_up(
    tx: &mut dyn HeapTransaction,
    mut index: usize,
    entry: SimilarityEntry,
) -> AppResult<usize> {
    let start = index;
    loop {
        let parent_index = index / 2;
        let parent = tx.read_entry(parent_index).await?;
        if parent.score <= entry.score {
            break;
        }
        tx.write_entry(index, parent).await?;
        index = parent_index;
    }

    if index != start {
        tx.write_entry(index, entry).await?;
    }
    Ok(index)
}

/// Places `entry` at the root of a heap of `len` entries and moves it down
/// while it is larger than its smaller child. Ties go to the left child.
async fn sift_down(
    tx: &mut dyn HeapTransaction,
    entry: SimilarityEntry,
    len: usize,
) -> AppResult<usize> {
    let mut index = 1;
    loop {
        let left = 2 * index;
        if left > len {
            break;
        }

        let mut child_index = left;
        let mut child = tx.read_entry(left).await?;
        let right = left + 1;
        if right <= len {
            let right_child = tx.read_entry(right).await?;
            if right_child.score < child.score {
                child_index = right;
                child = right_child;
            }
        }

        if entry.score <= child.score {
            break;
        }
        tx.write_entry(index, child).await?;
        index = child_index;
    }

    tx.write_entry(index, entry).await?;
    Ok(index)
}

/// Candidate slot in the best-first walk of [`RankingStore::top`]
struct Frontier {
    index: usize,
    entry: SimilarityEntry,
}

/// Reversed so that `BinaryHeap` pops the smallest score first; equal scores
/// come out in slot order.
fn cmp_reverse(a: &Frontier, b: &Frontier) -> Ordering {
    b.entry
        .score
        .total_cmp(&a.entry.score)
        .then_with(|| b.index.cmp(&a.index))
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        cmp_reverse(self, other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_reverse(self, other)
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(cmp_reverse(self, other))
    }
}
