use std::sync::Arc;

use proptest::prelude::*;

use anirank::{
    db::MemoryHeapBackend,
    models::{SimilarityEntry, UserId},
    services::RankingStore,
};

#[derive(Debug, Clone)]
enum Op {
    Insert(UserId, f64),
    Extract,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (1i64..1_000, 0.0f64..500.0).prop_map(|(user_id, score)| Op::Insert(user_id, score)),
        1 => Just(Op::Extract),
    ]
}

fn assert_heap_ordered(slots: &[SimilarityEntry]) {
    assert_eq!(slots[0].score, f64::NEG_INFINITY);
    for idx in 2..slots.len() {
        assert!(
            slots[idx / 2].score <= slots[idx].score,
            "slot {} ({}) is smaller than its parent ({})",
            idx,
            slots[idx].score,
            slots[idx / 2].score
        );
    }
}

proptest! {
    #[test]
    fn heap_order_holds_after_every_operation(ops in prop::collection::vec(op_strategy(), 1..60)) {
        tokio_test::block_on(async {
            let backend = MemoryHeapBackend::new();
            let store = RankingStore::new(1, Arc::new(backend.clone()));
            let mut model: Vec<f64> = Vec::new();

            for op in ops {
                match op {
                    Op::Insert(user_id, score) => {
                        store.insert(SimilarityEntry::new(user_id, score)).await.unwrap();
                        model.push(score);
                    }
                    Op::Extract => {
                        let extracted = store.extract_min().await.unwrap();
                        let expected = model
                            .iter()
                            .enumerate()
                            .min_by(|a, b| a.1.total_cmp(b.1))
                            .map(|(i, _)| i);
                        match (extracted, expected) {
                            (Some(entry), Some(i)) => {
                                assert_eq!(entry.score, model.swap_remove(i));
                            }
                            (None, None) => {}
                            (got, _) => panic!("unexpected extract result {:?}", got),
                        }
                    }
                }

                let slots = backend.snapshot().await;
                assert_eq!(slots.len() - 1, model.len());
                assert_eq!(store.len().await.unwrap(), model.len());
                assert_heap_ordered(&slots);
            }
        });
    }

    #[test]
    fn draining_yields_non_decreasing_scores(scores in prop::collection::vec(0.0f64..100.0, 0..80)) {
        tokio_test::block_on(async {
            let store = RankingStore::new(1, Arc::new(MemoryHeapBackend::new()));
            for (i, score) in scores.iter().enumerate() {
                store.insert(SimilarityEntry::new(i as UserId + 1, *score)).await.unwrap();
            }

            let top = store.top(scores.len()).await.unwrap();
            let mut drained = Vec::with_capacity(scores.len());
            while let Some(entry) = store.extract_min().await.unwrap() {
                drained.push(entry.score);
            }

            let mut expected = scores.clone();
            expected.sort_by(f64::total_cmp);
            assert_eq!(drained, expected);
            assert_eq!(top.iter().map(|e| e.score).collect::<Vec<_>>(), expected);
            assert!(store.is_empty().await.unwrap());
        });
    }
}
