//! # Haber Diamond Benchmarks
//!
//! | Operation | Target |
//! |-----------|--------|
//! | Selector lookup | O(1) regardless of table size |
//! | Stage cut | Linear in selectors touched |
//! | Dispatch to facet | < 50µs including commit |

use std::sync::Arc;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use haber_diamond::adapters::{InMemoryFacetDeployments, InMemoryStore, TracingEventSink};
use haber_diamond::domain::entities::{DiamondCut, FacetCut};
use haber_diamond::domain::registry::FacetRegistry;
use haber_diamond::domain::services::function_selector;
use haber_diamond::domain::value_objects::{Address, Bytes, Selector};
use haber_diamond::ports::inbound::DiamondApi;
use haber_diamond::ports::outbound::Facet;
use haber_diamond::service::{DiamondConfig, DiamondService};
use haber_node::facets::CounterFacet;

const DIAMOND: Address = Address::repeat_byte(0xd1);
const FACET: Address = Address::repeat_byte(0xf1);

fn selectors(n: u32) -> Vec<Selector> {
    (1..=n).map(Selector::from_u32).collect()
}

// ============================================================================
// REGISTRY
// ============================================================================

fn bench_registry_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry");
    group.measurement_time(Duration::from_secs(5));

    for size in [16u32, 256, 4096] {
        let mut registry = FacetRegistry::new(DIAMOND).with_max_cut_selectors(size as usize);
        let staged = registry
            .stage(&[FacetCut::add(FACET, selectors(size))])
            .expect("stage");
        registry.commit(staged);

        group.bench_with_input(BenchmarkId::new("lookup", size), &size, |b, &size| {
            let probe = Selector::from_u32(size / 2);
            b.iter(|| black_box(registry.lookup(probe)))
        });
    }

    for size in [16u32, 256, 1024] {
        let registry = FacetRegistry::new(DIAMOND).with_max_cut_selectors(size as usize);
        let cut = [FacetCut::add(FACET, selectors(size))];

        group.throughput(Throughput::Elements(u64::from(size)));
        group.bench_with_input(BenchmarkId::new("stage_add", size), &cut, |b, cut| {
            b.iter(|| black_box(registry.stage(cut).is_ok()))
        });
    }

    group.bench_function("function_selector", |b| {
        b.iter(|| black_box(function_selector("transferOwnership(address)")))
    });

    group.finish();
}

// ============================================================================
// DISPATCH
// ============================================================================

fn bench_dispatch(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let mut group = c.benchmark_group("dispatch");
    group.measurement_time(Duration::from_secs(10));

    let counter = CounterFacet::new();
    let deployments = Arc::new(InMemoryFacetDeployments::new());
    deployments.deploy(FACET, Arc::new(counter.clone()));

    let config = DiamondConfig {
        persist_on_commit: false,
        ..DiamondConfig::default()
    };
    let diamond = runtime.block_on(async {
        let diamond = DiamondService::deploy(
            Address::repeat_byte(1),
            config,
            deployments,
            Arc::new(TracingEventSink),
            Arc::new(InMemoryStore::new()),
        )
        .await
        .expect("deploy");
        diamond
            .diamond_cut(
                Address::repeat_byte(1),
                DiamondCut::new(vec![FacetCut::add(FACET, counter.selectors())]),
            )
            .await
            .expect("cut");
        diamond
    });

    let increment = Selector::from_signature(CounterFacet::INCREMENT);
    let count = Selector::from_signature(CounterFacet::COUNT);

    group.bench_function("facet_write", |b| {
        b.iter(|| {
            runtime.block_on(async {
                black_box(
                    diamond
                        .dispatch(Address::repeat_byte(9), increment, Bytes::new())
                        .await
                        .is_ok(),
                )
            })
        })
    });

    group.bench_function("facet_read", |b| {
        b.iter(|| {
            runtime.block_on(async {
                black_box(
                    diamond
                        .dispatch(Address::repeat_byte(9), count, Bytes::new())
                        .await
                        .is_ok(),
                )
            })
        })
    });

    group.bench_function("loupe_facets", |b| {
        b.iter(|| runtime.block_on(async { black_box(diamond.facets().await.len()) }))
    });

    group.finish();
}

criterion_group!(benches, bench_registry_operations, bench_dispatch);

criterion_main!(benches);
