#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::hash::BuildHasherDefault;

use criterion::measurement::WallTime;
use criterion::{
    black_box, criterion_group, criterion_main, BenchmarkGroup, BenchmarkId, Criterion, Throughput,
};
use hyperloglogplus::HyperLogLog as _;
use pprof::criterion::{Output, PProfProfiler};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sketch_engine::{CardinalityEstimator, MembershipFilter, SketchConfig};
use tabled::settings::{Settings, Style};
use tabled::{Table, Tabled};
use wyhash::WyHash;

/// Streams are benchmarked at lengths 0, 1, 2, 4, ... up to `N` (or this default).
const DEFAULT_MAX_CARDINALITY: usize = 256;
/// Estimator bucket bits, comparable to the 2^12 registers of the baselines
const BUCKET_BITS: u8 = 12;
/// False-positive rate every benchmarked filter is sized for
const TARGET_FALSE_POSITIVE_RATE: f64 = 0.01;
/// Trials averaged per relative-error measurement
const ERROR_TRIALS: usize = 100;
/// Never-inserted lookups per false-positive measurement
const FALSE_POSITIVE_LOOKUPS: usize = 10_000;

type HyperLogLogPlus = hyperloglogplus::HyperLogLogPlus<usize, BuildHasherDefault<WyHash>>;

criterion_group! {
    name = benches;
    config = Criterion::default().with_profiler(PProfProfiler::new(100, Output::Protobuf));
    targets = benchmark
}
criterion_main!(benches);

/// Distinct-count sketch under benchmark
trait Estimator: Sized {
    const NAME: &'static str;
    fn create() -> Self;
    fn feed(&mut self, item: &usize);
    fn approximate(&mut self) -> usize;

    fn from_stream(items: impl Iterator<Item = usize>) -> Self {
        let mut estimator = Self::create();
        for item in items {
            estimator.feed(&item);
        }
        estimator
    }
}

/// Membership sketch under benchmark
trait Filter: Sized {
    const NAME: &'static str;
    fn create(expected_items: usize) -> Self;
    fn add(&mut self, item: &usize);
    fn query(&self, item: &usize) -> bool;
}

/// Runs `$body` once per benchmarked estimator type, bound to `$e`
macro_rules! for_each_estimator {
    ($e:ident => $body:expr) => {{
        {
            type $e = CardinalityEstimator;
            $body
        }
        {
            type $e = amadeus_streaming::HyperLogLog<usize>;
            $body
        }
        {
            type $e = probabilistic_collections::hyperloglog::HyperLogLog<usize>;
            $body
        }
        {
            type $e = hyperloglog::HyperLogLog;
            $body
        }
        {
            type $e = HyperLogLogPlus;
            $body
        }
    }};
}

fn benchmark(c: &mut Criterion) {
    let results_dir = std::env::var("BENCH_RESULTS_PATH").unwrap_or_else(|_| "target".into());
    let max_cardinality = std::env::var("N")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_MAX_CARDINALITY);
    let cardinalities: Vec<usize> = std::iter::once(0)
        .chain((0..).map(|c| 1 << c))
        .take_while(|&c| c <= max_cardinality)
        .collect();

    let mut group = c.benchmark_group("observe");
    for &n in &cardinalities {
        group.throughput(Throughput::Elements(n.max(1) as u64));
        for_each_estimator!(E => bench_observe::<E>(&mut group, n));
    }
    group.finish();

    let mut group = c.benchmark_group("estimate");
    group.throughput(Throughput::Elements(1));
    for &n in &cardinalities {
        for_each_estimator!(E => bench_estimate::<E>(&mut group, n));
    }
    group.finish();

    let mut group = c.benchmark_group("filter");
    for &n in &cardinalities {
        group.throughput(Throughput::Elements(n.max(1) as u64));
        bench_filter::<MembershipFilter>(&mut group, n);
        bench_filter::<probabilistic_collections::bloom::BloomFilter<usize>>(&mut group, n);
    }
    group.finish();

    let mut estimator_rows = Vec::new();
    let mut filter_rows = Vec::new();
    for &n in &cardinalities {
        for_each_estimator!(E => estimator_rows.push(EstimatorRow::measure::<E>(n)));
        filter_rows.push(FilterRow::measure::<MembershipFilter>(n));
        filter_rows.push(FilterRow::measure::<probabilistic_collections::bloom::BloomFilter<usize>>(n));
    }
    write_markdown(&results_dir, "estimators.md", estimator_rows);
    write_markdown(&results_dir, "filters.md", filter_rows);
}

fn bench_observe<E: Estimator>(group: &mut BenchmarkGroup<WallTime>, n: usize) {
    group.bench_with_input(BenchmarkId::new(E::NAME, n), &n, |b, &n| {
        b.iter(|| E::from_stream(0..black_box(n)));
    });
}

fn bench_estimate<E: Estimator>(group: &mut BenchmarkGroup<WallTime>, n: usize) {
    let mut estimator = E::from_stream(0..n);
    group.bench_with_input(BenchmarkId::new(E::NAME, n), &n, |b, _| {
        b.iter(|| black_box(estimator.approximate()));
    });
}

fn bench_filter<F: Filter>(group: &mut BenchmarkGroup<WallTime>, n: usize) {
    group.bench_with_input(BenchmarkId::new(F::NAME, n), &n, |b, &n| {
        b.iter(|| {
            let mut filter = F::create(n.max(1));
            for i in 0..black_box(n) {
                filter.add(&i);
            }
            (0..n).filter(|i| filter.query(black_box(i))).count()
        });
    });
}

fn write_markdown<R: Tabled>(dir: &str, file: &str, rows: Vec<R>) {
    let markdown = Table::new(rows)
        .with(Settings::default().with(Style::markdown()))
        .to_string();
    std::fs::write(format!("{}/{}", dir, file), markdown).unwrap();
}

/// Memory and accuracy of one estimator at one cardinality
#[derive(Tabled)]
struct EstimatorRow {
    sketch: &'static str,
    cardinality: usize,
    stack_bytes: usize,
    heap_bytes: u64,
    heap_blocks: u64,
    relative_error: String,
}

impl EstimatorRow {
    fn measure<E: Estimator>(n: usize) -> Self {
        let (heap_bytes, heap_blocks) = {
            let _profiler = dhat::Profiler::builder().testing().build();
            let _estimator = E::from_stream(0..n);
            let stats = dhat::HeapStats::get();
            (stats.total_bytes, stats.total_blocks)
        };

        let mut rng = StdRng::seed_from_u64(12345);
        let total: f64 = (0..ERROR_TRIALS)
            .map(|_| {
                let mut estimator = E::from_stream((0..n).map(|_| rng.gen()));
                if n == 0 {
                    0.0
                } else {
                    (estimator.approximate() as f64 - n as f64).abs() / n as f64
                }
            })
            .sum();

        Self {
            sketch: E::NAME,
            cardinality: n,
            stack_bytes: std::mem::size_of::<E>(),
            heap_bytes,
            heap_blocks,
            relative_error: format!("{:.4}", total / ERROR_TRIALS as f64),
        }
    }
}

/// Memory and false-positive rate of one filter at one load
#[derive(Tabled)]
struct FilterRow {
    sketch: &'static str,
    inserted: usize,
    heap_bytes: u64,
    false_positive_rate: String,
}

impl FilterRow {
    fn measure<F: Filter>(n: usize) -> Self {
        let _profiler = dhat::Profiler::builder().testing().build();
        let mut filter = F::create(n.max(1));
        for i in 0..n {
            filter.add(&i);
        }
        let heap_bytes = dhat::HeapStats::get().total_bytes;
        let false_positives = (n..n + FALSE_POSITIVE_LOOKUPS)
            .filter(|i| filter.query(i))
            .count();
        Self {
            sketch: F::NAME,
            inserted: n,
            heap_bytes,
            false_positive_rate: format!(
                "{:.4}",
                false_positives as f64 / FALSE_POSITIVE_LOOKUPS as f64
            ),
        }
    }
}

impl Estimator for CardinalityEstimator {
    const NAME: &'static str = "sketch-engine";

    fn create() -> Self {
        CardinalityEstimator::new(BUCKET_BITS).unwrap()
    }

    fn feed(&mut self, item: &usize) {
        self.observe(item).unwrap();
    }

    fn approximate(&mut self) -> usize {
        self.estimate()
    }
}

impl Estimator for amadeus_streaming::HyperLogLog<usize> {
    const NAME: &'static str = "amadeus-streaming";

    fn create() -> Self {
        amadeus_streaming::HyperLogLog::new(0.01625)
    }

    fn feed(&mut self, item: &usize) {
        self.push(item);
    }

    fn approximate(&mut self) -> usize {
        self.len() as usize
    }
}

impl Estimator for probabilistic_collections::hyperloglog::HyperLogLog<usize> {
    const NAME: &'static str = "probabilistic-collections";

    fn create() -> Self {
        probabilistic_collections::hyperloglog::HyperLogLog::new(0.004)
    }

    fn feed(&mut self, item: &usize) {
        self.insert(item);
    }

    fn approximate(&mut self) -> usize {
        self.len() as usize
    }
}

impl Estimator for hyperloglog::HyperLogLog {
    const NAME: &'static str = "hyperloglog";

    fn create() -> Self {
        hyperloglog::HyperLogLog::new(0.004)
    }

    fn feed(&mut self, item: &usize) {
        self.insert(item);
    }

    fn approximate(&mut self) -> usize {
        self.len() as usize
    }
}

impl Estimator for HyperLogLogPlus {
    const NAME: &'static str = "hyperloglogplus";

    fn create() -> Self {
        HyperLogLogPlus::new(12, BuildHasherDefault::<WyHash>::default()).unwrap()
    }

    fn feed(&mut self, item: &usize) {
        self.insert(item);
    }

    fn approximate(&mut self) -> usize {
        self.count() as usize
    }
}

impl Filter for MembershipFilter {
    const NAME: &'static str = "sketch-engine";

    fn create(expected_items: usize) -> Self {
        let config =
            SketchConfig::for_expected_items(expected_items, TARGET_FALSE_POSITIVE_RATE).unwrap();
        MembershipFilter::from_config(&config).unwrap()
    }

    fn add(&mut self, item: &usize) {
        self.insert(item).unwrap();
    }

    fn query(&self, item: &usize) -> bool {
        self.contains(item).unwrap()
    }
}

impl Filter for probabilistic_collections::bloom::BloomFilter<usize> {
    const NAME: &'static str = "probabilistic-collections";

    fn create(expected_items: usize) -> Self {
        probabilistic_collections::bloom::BloomFilter::new(
            expected_items,
            TARGET_FALSE_POSITIVE_RATE,
        )
    }

    fn add(&mut self, item: &usize) {
        self.insert(item);
    }

    fn query(&self, item: &usize) -> bool {
        self.contains(item)
    }
}
