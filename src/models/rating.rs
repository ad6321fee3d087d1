use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identifier of a user, as assigned by AniList
pub type UserId = i64;

/// Identifier of a catalog item (an AniList media id)
pub type ItemId = i64;

/// A single rating as accepted over the API
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RatingEntry {
    pub item_id: ItemId,
    pub score: f64,
}

/// A user's sparse mapping from item to score
///
/// Keys are kept ordered so that iteration, and therefore floating point
/// accumulation over shared items, is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RatingVector(BTreeMap<ItemId, f64>);

impl RatingVector {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Sets the score for an item, returning the previous score if any
    pub fn insert(&mut self, item_id: ItemId, score: f64) -> Option<f64> {
        self.0.insert(item_id, score)
    }

    pub fn get(&self, item_id: ItemId) -> Option<f64> {
        self.0.get(&item_id).copied()
    }

    pub fn contains(&self, item_id: ItemId) -> bool {
        self.0.contains_key(&item_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates `(item_id, score)` pairs in ascending item order
    pub fn iter(&self) -> impl Iterator<Item = (ItemId, f64)> + '_ {
        self.0.iter().map(|(item_id, score)| (*item_id, *score))
    }

    /// Flattens the vector into API entries
    pub fn to_entries(&self) -> Vec<RatingEntry> {
        self.iter()
            .map(|(item_id, score)| RatingEntry { item_id, score })
            .collect()
    }
}

impl FromIterator<(ItemId, f64)> for RatingVector {
    fn from_iter<I: IntoIterator<Item = (ItemId, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_replaces_existing_score() {
        let mut ratings = RatingVector::new();
        assert_eq!(ratings.insert(10, 7.0), None);
        assert_eq!(ratings.insert(10, 8.5), Some(7.0));
        assert_eq!(ratings.get(10), Some(8.5));
        assert_eq!(ratings.len(), 1);
    }

    #[test]
    fn test_iteration_is_ordered_by_item() {
        let ratings: RatingVector = vec![(30, 1.0), (10, 2.0), (20, 3.0)].into_iter().collect();
        let items: Vec<ItemId> = ratings.iter().map(|(item, _)| item).collect();
        assert_eq!(items, vec![10, 20, 30]);
    }

    #[test]
    fn test_serializes_as_plain_map() {
        let ratings: RatingVector = vec![(10, 7.0)].into_iter().collect();
        let json = serde_json::to_string(&ratings).unwrap();
        assert_eq!(json, r#"{"10":7.0}"#);
    }

    #[test]
    fn test_to_entries() {
        let ratings: RatingVector = vec![(20, 4.0), (10, 7.0)].into_iter().collect();
        assert_eq!(
            ratings.to_entries(),
            vec![
                RatingEntry { item_id: 10, score: 7.0 },
                RatingEntry { item_id: 20, score: 4.0 },
            ]
        );
    }
}
