//! Multi-writer / concurrent-scrape consistency.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use reqmeter_core::{Buckets, LabelSet, Registry, SampleValue};

const WRITERS: usize = 8;
const PER_WRITER: usize = 125;
const OBSERVED: f64 = 2.0;

fn labels() -> LabelSet {
    LabelSet::new([("method", "GET"), ("status", "200")])
}

#[test]
fn concurrent_increments_sum_exactly() {
    let registry = Registry::new();
    let c = registry.register_counter("hits_total", "", &["method", "status"]).unwrap();

    thread::scope(|s| {
        for w in 0..WRITERS {
            let c = Arc::clone(&c);
            s.spawn(move || {
                for i in 0..PER_WRITER {
                    c.inc_by(&labels(), ((w + i) % 3) as i64).unwrap();
                }
            });
        }
    });

    let expected: u64 = (0..WRITERS)
        .flat_map(|w| (0..PER_WRITER).map(move |i| ((w + i) % 3) as u64))
        .sum();
    assert_eq!(c.get(&labels()), Some(expected));
}

#[test]
fn first_time_creation_race_yields_one_entry() {
    let registry = Registry::new();
    let c = registry.register_counter("race_total", "", &["k"]).unwrap();

    thread::scope(|s| {
        for _ in 0..WRITERS {
            let c = Arc::clone(&c);
            s.spawn(move || {
                let fresh = LabelSet::new([("k", "same")]);
                c.inc(&fresh).unwrap();
            });
        }
    });

    let snap = registry.snapshot();
    let family = snap.family("race_total").unwrap();
    assert_eq!(family.samples.len(), 1);
    assert_eq!(family.samples[0].value, SampleValue::Counter(WRITERS as u64));
}

#[test]
fn scrape_during_writes_never_sees_torn_state() {
    let registry = Arc::new(Registry::new());
    let counter = registry.register_counter("req_total", "", &["method", "status"]).unwrap();
    let hist = registry
        .register_histogram(
            "req_ms",
            "",
            &["method", "status"],
            Buckets::new(vec![1.0, 2.0, 3.0]).unwrap(),
        )
        .unwrap();
    let done = AtomicBool::new(false);

    thread::scope(|s| {
        let reader = s.spawn(|| {
            let mut last_counter = 0u64;
            let mut last_count = 0u64;
            let mut reads = 0usize;
            loop {
                let finished = done.load(Ordering::Acquire);
                let snap = registry.snapshot();

                if let Some(SampleValue::Counter(v)) =
                    snap.family("req_total").and_then(|f| f.sample(&labels()))
                {
                    assert!(*v >= last_counter, "counter went backwards");
                    last_counter = *v;
                }
                if let Some(SampleValue::Histogram(h)) =
                    snap.family("req_ms").and_then(|f| f.sample(&labels()))
                {
                    assert!(h.count >= last_count, "count went backwards");
                    last_count = h.count;
                    assert!(
                        h.buckets.windows(2).all(|w| w[0].1 <= w[1].1),
                        "buckets not monotonic: {:?}",
                        h.buckets
                    );
                    assert!(h.buckets.iter().all(|(_, c)| *c <= h.count));
                    // Every observation is OBSERVED, which lands in le=2 and le=3.
                    assert_eq!(h.buckets[0].1, 0);
                    assert_eq!(h.buckets[1].1, h.count, "bucket/count torn");
                    assert_eq!(h.sum, OBSERVED * h.count as f64, "sum/count torn");
                }
                reads += 1;
                if finished {
                    break;
                }
            }
            reads
        });

        let writers: Vec<_> = (0..WRITERS)
            .map(|_| {
                let counter = Arc::clone(&counter);
                let hist = Arc::clone(&hist);
                s.spawn(move || {
                    let c = counter.get_or_create(&labels()).unwrap();
                    let h = hist.get_or_create(&labels()).unwrap();
                    for _ in 0..PER_WRITER {
                        c.inc().unwrap();
                        h.observe(OBSERVED).unwrap();
                    }
                })
            })
            .collect();
        for w in writers {
            w.join().unwrap();
        }
        done.store(true, Ordering::Release);
        assert!(reader.join().unwrap() > 0);
    });

    let total = (WRITERS * PER_WRITER) as u64;
    assert_eq!(counter.get(&labels()), Some(total));
    let h = hist.get(&labels()).unwrap();
    assert_eq!(h.count, total);
    assert_eq!(h.buckets, vec![(1.0, 0), (2.0, total), (3.0, total)]);
    assert_eq!(h.sum, OBSERVED * total as f64);
}
