// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use job_pool_core::{run, RunConfig};

#[test]
fn test_results_simple() {
    let job_count = 10;
    let result = run(
        |(x,): (u64,)| Ok::<_, String>(2 * x),
        (0..job_count).map(|i| (i,)),
        &RunConfig::new(4).collect_results(true),
    )
    .unwrap();
    assert!(result.success);

    let results = result.job_results.expect("Results should be collected");
    assert_eq!(results.len(), job_count as usize);
    for i in 0..job_count {
        assert_eq!(results[&(i as usize)], 2 * i);
    }
}

#[test]
fn test_results_large() {
    let job_count = 200;
    let result_length = 10_000;
    let result = run(
        move |(x,): (usize,)| Ok::<_, String>(vec![x; result_length]),
        (0..job_count).map(|i| (i,)),
        &RunConfig::new(2).collect_results(true),
    )
    .unwrap();
    assert!(result.success);

    let results = result.job_results.unwrap();
    for i in 0..job_count {
        let output = &results[&i];
        assert_eq!(output.len(), result_length);
        assert!(output.iter().all(|v| *v == i));
    }
}

#[test]
fn test_results_not_collected_by_default() {
    let result = run(
        |(x,): (u64,)| Ok::<_, String>(x),
        (0..5).map(|i| (i,)),
        &RunConfig::new(2),
    )
    .unwrap();
    assert!(result.success);
    assert!(result.job_results.is_none());
}

#[test]
fn test_results_only_for_successful_jobs() {
    let result = run(
        |(x,): (u64,)| {
            if x % 2 == 0 {
                Ok(x * 10)
            } else {
                Err("odd")
            }
        },
        (0..8).map(|i| (i,)),
        &RunConfig::new(2).fail_early(false).trace(false).collect_results(true),
    )
    .unwrap();
    assert!(!result.success);

    let results = result.job_results.unwrap();
    let mut ids: Vec<_> = results.keys().copied().collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![0, 2, 4, 6]);
    assert_eq!(results[&4], 40);
    assert_eq!(result.job_errors.keys().copied().collect::<Vec<_>>(), vec![1, 3, 5, 7]);
    assert_eq!(result.job_errors[&5], "odd");
}
