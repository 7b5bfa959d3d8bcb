use std::hint::black_box;
use std::time::Instant;

use pageflow::{parse_markup, partition, rejoin_continuations};
use pageflow_render::{Repaginator, RepaginatorOptions};

#[allow(dead_code)]
#[path = "../tests/common/budget_alloc.rs"]
mod budget_alloc;
#[allow(dead_code)]
#[path = "../tests/common/fixtures.rs"]
mod fixtures;

use budget_alloc::BudgetAlloc;
use fixtures::{generated_markup, STANDARD_SHAPES};

#[global_allocator]
static ALLOC: BudgetAlloc = BudgetAlloc::new();

const PAGE_SIZES: &[(&str, f32, f32)] = &[("a4", 794.0, 1123.0), ("phone", 390.0, 640.0)];

#[derive(Clone, Debug)]
struct CaseResult {
    fixture: String,
    case: String,
    iterations: usize,
    min_ns: u128,
    median_ns: u128,
    mean_ns: u128,
    max_ns: u128,
    median_peak_heap_bytes: usize,
    max_peak_heap_bytes: usize,
}

fn percentile<T: Copy>(sorted: &[T], percentile: f64) -> T {
    let idx = ((sorted.len().saturating_sub(1) as f64) * percentile).round() as usize;
    sorted[idx]
}

fn run_case<F>(
    fixture: &str,
    case: &str,
    warmup_iters: usize,
    measure_iters: usize,
    mut op: F,
) -> CaseResult
where
    F: FnMut() -> usize,
{
    for _ in 0..warmup_iters {
        black_box(op());
    }

    let mut time_samples = Vec::with_capacity(measure_iters);
    let mut mem_samples = Vec::with_capacity(measure_iters);
    for _ in 0..measure_iters {
        let start = Instant::now();
        let (out, usage) = ALLOC.measure(&mut op);
        time_samples.push(start.elapsed().as_nanos());
        black_box(out);
        mem_samples.push(usage.peak_extra_bytes);
    }

    time_samples.sort_unstable();
    mem_samples.sort_unstable();
    let time_sum: u128 = time_samples.iter().copied().sum();

    CaseResult {
        fixture: fixture.to_string(),
        case: case.to_string(),
        iterations: measure_iters,
        min_ns: time_samples[0],
        median_ns: percentile(&time_samples, 0.5),
        mean_ns: time_sum / time_samples.len() as u128,
        max_ns: time_samples[time_samples.len() - 1],
        median_peak_heap_bytes: percentile(&mem_samples, 0.5),
        max_peak_heap_bytes: mem_samples[mem_samples.len() - 1],
    }
}

fn main() {
    let quick = std::env::args().any(|arg| arg == "--quick");
    let warmup_iters = if quick { 1 } else { 2 };
    let measure_iters = if quick { 3 } else { 10 };

    println!("# pageflow benchmark");
    println!(
        "# mode={} warmup_iters={} measure_iters={}",
        if quick { "quick" } else { "full" },
        warmup_iters,
        measure_iters
    );
    println!(
        "fixture,case,iterations,min_ns,median_ns,mean_ns,max_ns,median_peak_heap_bytes,max_peak_heap_bytes"
    );

    let mut results = Vec::new();
    for (fixture_key, shape) in STANDARD_SHAPES {
        let markup = generated_markup(*shape);
        let doc = parse_markup(&markup).unwrap_or_else(|e| panic!("parse failed: {}", e));

        results.push(run_case(
            fixture_key,
            "parse_markup",
            warmup_iters,
            measure_iters,
            || {
                parse_markup(&markup)
                    .unwrap_or_else(|e| panic!("parse failed: {}", e))
                    .len()
            },
        ));

        results.push(run_case(
            fixture_key,
            "partition",
            warmup_iters,
            measure_iters,
            || partition(&doc).len(),
        ));

        for (size_key, width, height) in PAGE_SIZES {
            let engine = Repaginator::new(RepaginatorOptions::for_page(*width, *height));
            results.push(run_case(
                fixture_key,
                &format!("repaginate_{}", size_key),
                warmup_iters,
                measure_iters,
                || engine.repaginate(&doc).len(),
            ));
        }

        let pages = Repaginator::default().repaginate(&doc);
        results.push(run_case(
            fixture_key,
            "rejoin_pages",
            warmup_iters,
            measure_iters,
            || {
                let flowing = pages.iter().flat_map(|p| p.content.iter().cloned()).collect();
                rejoin_continuations(flowing).len()
            },
        ));
    }

    for result in &results {
        println!(
            "{},{},{},{},{},{},{},{},{}",
            result.fixture,
            result.case,
            result.iterations,
            result.min_ns,
            result.median_ns,
            result.mean_ns,
            result.max_ns,
            result.median_peak_heap_bytes,
            result.max_peak_heap_bytes
        );
    }
}
