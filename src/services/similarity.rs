use crate::models::RatingVector;

/// Distance between two users' rating vectors
///
/// Only items rated by both users count. Returns `None` when there is no
/// such item, which callers treat as "skip this candidate". Otherwise the
/// result is the sum of squared score differences divided by the square root
/// of the number of shared items, so 0 means identical shared ratings.
///
/// Note the divisor is `sqrt(n)`, not `n` under the root.
pub fn score(a: &RatingVector, b: &RatingVector) -> Option<f64> {
    let (smaller, larger) = if a.len() <= b.len() { (a, b) } else { (b, a) };

    let mut shared = 0usize;
    let mut sum_squares = 0.0;

    for (item_id, left) in smaller.iter() {
        if let Some(right) = larger.get(item_id) {
            let diff = left - right;
            sum_squares += diff * diff;
            shared += 1;
        }
    }

    if shared == 0 {
        return None;
    }

    Some(sum_squares / (shared as f64).sqrt())
}
