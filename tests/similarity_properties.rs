use proptest::prelude::*;

use anirank::{models::RatingVector, services::similarity::score};

fn rating_vector() -> impl Strategy<Value = RatingVector> {
    prop::collection::btree_map(0i64..500, 0.0f64..=10.0, 0..40)
        .prop_map(|ratings| ratings.into_iter().collect())
}

proptest! {
    #[test]
    fn identical_vectors_score_zero(v in rating_vector()) {
        let expected = if v.is_empty() { None } else { Some(0.0) };
        prop_assert_eq!(score(&v, &v.clone()), expected);
    }

    #[test]
    fn scoring_is_symmetric_and_non_negative(a in rating_vector(), b in rating_vector()) {
        let forward = score(&a, &b);
        prop_assert_eq!(forward, score(&b, &a));
        if let Some(distance) = forward {
            prop_assert!(distance >= 0.0 && distance.is_finite());
        }
    }

    #[test]
    fn disjoint_vectors_have_no_score(
        left in prop::collection::vec(0.0f64..=10.0, 1..20),
        right in prop::collection::vec(0.0f64..=10.0, 1..20),
    ) {
        // even item ids on one side, odd on the other
        let a: RatingVector = left.iter().enumerate().map(|(i, s)| (2 * i as i64, *s)).collect();
        let b: RatingVector = right.iter().enumerate().map(|(i, s)| (2 * i as i64 + 1, *s)).collect();
        prop_assert_eq!(score(&a, &b), None);
    }
}
