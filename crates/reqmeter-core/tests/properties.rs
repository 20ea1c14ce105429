//! Property tests for aggregation invariants.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use proptest::prelude::*;

use reqmeter_core::{Buckets, LabelSet, Registry};

proptest! {
    #[test]
    fn counter_total_is_sum_of_deltas(deltas in proptest::collection::vec(0i64..1_000, 0..64)) {
        let registry = Registry::new();
        let c = registry.register_counter("c_total", "", &[]).unwrap();
        for d in &deltas {
            c.inc_by(&LabelSet::empty(), *d).unwrap();
        }
        let expected: i64 = deltas.iter().sum();
        prop_assert_eq!(c.get(&LabelSet::empty()).unwrap_or(0), expected as u64);
    }

    #[test]
    fn histogram_buckets_stay_cumulative(values in proptest::collection::vec(0.0f64..500.0, 1..64)) {
        let registry = Registry::new();
        let bounds = vec![1.0, 10.0, 50.0, 100.0, 250.0];
        let h = registry
            .register_histogram("h_ms", "", &[], Buckets::new(bounds.clone()).unwrap())
            .unwrap();
        for v in &values {
            h.observe(&LabelSet::empty(), *v).unwrap();
        }

        let s = h.get(&LabelSet::empty()).unwrap();
        prop_assert_eq!(s.count, values.len() as u64);
        prop_assert!(s.buckets.windows(2).all(|w| w[0].1 <= w[1].1));
        for (bound, count) in &s.buckets {
            let expected = values.iter().filter(|v| **v <= *bound).count() as u64;
            prop_assert_eq!(*count, expected);
        }
        let sum: f64 = values.iter().sum();
        prop_assert!((s.sum - sum).abs() <= 1e-6 * sum.max(1.0));
    }

    #[test]
    fn label_order_never_matters(mut pairs in proptest::collection::btree_map("[a-z]{1,6}", "[ -~]{0,8}", 1..6)
        .prop_map(|m| m.into_iter().collect::<Vec<_>>()), rotate in 0usize..6) {
        let forward = LabelSet::new(pairs.clone());
        let n = pairs.len();
        pairs.rotate_left(rotate % n);
        pairs.reverse();
        let shuffled = LabelSet::new(pairs);
        prop_assert_eq!(forward.canonical(), shuffled.canonical());
        prop_assert_eq!(forward, shuffled);
    }
}
