//! Table-driven tests for weight-triggered flushes.

use super::common::{wait_until, Harness, DEFAULT_MAX_ITEMS};
use batcher::count_items;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

struct SizeCase {
    name: &'static str,
    max_weight: usize,
    weight_fn: fn(&i64) -> usize,
    items: Vec<i64>,
    expected_batches: Vec<Vec<i64>>,
}

async fn run_size_case(case: SizeCase) {
    println!("Running test: {}", case.name);

    let harness = Harness::start(case.max_weight, case.weight_fn);
    harness.send_all(case.items).await;
    harness
        .results
        .wait_for_batches(case.expected_batches.len())
        .await;
    assert_eq!(
        harness.results.batches(),
        case.expected_batches,
        "Wrong batches for test: {}",
        case.name
    );
    assert_eq!(harness.stats.buffered(), 0, "buffer drained for: {}", case.name);
    harness.shutdown().await;
}

#[tokio::test]
async fn weight_trigger_table_driven() {
    let cases = vec![
        SizeCase {
            name: "counts_items",
            max_weight: DEFAULT_MAX_ITEMS,
            weight_fn: count_items,
            items: (1..=6).collect(),
            expected_batches: vec![vec![1, 2, 3], vec![4, 5, 6]],
        },
        SizeCase {
            name: "each_item_weighs_two",
            max_weight: DEFAULT_MAX_ITEMS,
            weight_fn: |_| 2,
            items: (1..=6).collect(),
            expected_batches: vec![vec![1, 2], vec![3, 4], vec![5, 6]],
        },
        SizeCase {
            name: "weight_is_item_value",
            max_weight: 5,
            weight_fn: |item| *item as usize,
            items: vec![1, 2, 3, 4, 1],
            expected_batches: vec![vec![1, 2, 3], vec![4, 1]],
        },
        SizeCase {
            name: "single_item_over_threshold",
            max_weight: DEFAULT_MAX_ITEMS,
            weight_fn: |_| 10,
            items: vec![7, 8],
            expected_batches: vec![vec![7], vec![8]],
        },
        SizeCase {
            name: "zero_weight_items_ride_along",
            max_weight: 2,
            weight_fn: |item| if *item < 0 { 0 } else { 1 },
            items: vec![-1, 1, -2, 2],
            expected_batches: vec![vec![-1, 1, -2, 2]],
        },
    ];

    for case in cases {
        run_size_case(case).await;
    }
}

#[tokio::test]
async fn kth_batch_holds_kth_group_of_n() {
    for n in 1..=4usize {
        let harness = Harness::start(n, count_items);
        let total = (n * 4) as i64;
        harness.send_all(1..=total).await;
        harness.results.wait_for_batches(4).await;

        let expected: Vec<Vec<i64>> = (1..=total)
            .collect::<Vec<_>>()
            .chunks(n)
            .map(|chunk| chunk.to_vec())
            .collect();
        assert_eq!(harness.results.batches(), expected, "max_weight = {n}");

        let snapshot = harness.stats.snapshot();
        assert_eq!(snapshot.weight_flushes, 4);
        assert_eq!(snapshot.quiet_period_flushes, 0);
        assert_eq!(snapshot.items_out, total as u64);
        harness.shutdown().await;
    }
}

#[tokio::test]
async fn buffered_count_never_exceeds_max_items() {
    let max_items = 4;
    let harness = Harness::start(max_items, count_items);
    let observed_max = Arc::new(AtomicUsize::new(0));
    let done = Arc::new(AtomicBool::new(false));

    let observer = {
        let stats = harness.stats.clone();
        let observed_max = observed_max.clone();
        let done = done.clone();
        tokio::spawn(async move {
            while !done.load(Ordering::Relaxed) {
                observed_max.fetch_max(stats.buffered(), Ordering::Relaxed);
                tokio::task::yield_now().await;
            }
        })
    };

    harness.send_all(1..=40).await;
    harness.results.wait_for_batches(10).await;
    done.store(true, Ordering::Relaxed);
    observer.await.expect("observer task");

    assert!(observed_max.load(Ordering::Relaxed) <= max_items);
    wait_until(|| harness.stats.buffered() == 0, "empty buffer").await;
    harness.shutdown().await;
}
