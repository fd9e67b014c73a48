//! Index build and lookup cost.
//!
//! Serializes a port-like index (few keys, long chains) and an address-like
//! index (many keys, short chains), then measures single-key lookups and a
//! two-index union through the query evaluator.
//!
//! Run: cargo bench --bench index_lookup

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use pktidx::index::serializer::serialize_to_vec;
use pktidx::query::evaluate;
use pktidx::{make_poly_index_view, Environment, IndexBuilder, Method};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const PACKETS: u32 = 200_000;

fn port_builder(method: Method) -> IndexBuilder<u16> {
    let mut b = IndexBuilder::for_method(method);
    for i in 0..PACKETS {
        b.add((i % 16) as u16 * 1000, i * 90);
    }
    b
}

fn addr_builder(method: Method) -> IndexBuilder<u32> {
    let mut b = IndexBuilder::for_method(method);
    for i in 0..PACKETS {
        b.add(0x0a00_0000 | (i.wrapping_mul(2654435761) % 50_000), i * 90);
    }
    b
}

const METHODS: [Method; 4] = [
    Method::Uncompressed128,
    Method::BitPack128,
    Method::StreamVByte128,
    Method::StreamVByteQuad256,
];

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_serialize(c: &mut Criterion) {
    let mut group = c.benchmark_group("serialize");
    group.sample_size(20);
    for method in METHODS {
        group.bench_function(BenchmarkId::new("ports", method), |b| {
            b.iter_batched(
                || port_builder(method),
                |builder| black_box(serialize_to_vec(builder, method, 0).unwrap()),
                BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup");
    for method in METHODS {
        let ports = serialize_to_vec(port_builder(method), method, 0).unwrap();
        let addrs = serialize_to_vec(addr_builder(method), method, 0).unwrap();
        let port_view = make_poly_index_view(&ports).unwrap();
        let addr_view = make_poly_index_view(&addrs).unwrap();

        group.bench_function(BenchmarkId::new("long_chain", method), |b| {
            b.iter(|| black_box(port_view.lookup_forward_16(black_box(3000)).unwrap()))
        });
        group.bench_function(BenchmarkId::new("many_keys", method), |b| {
            b.iter(|| black_box(addr_view.lookup_forward_32(black_box(0x0a00_1234)).unwrap()))
        });
        group.bench_function(BenchmarkId::new("miss", method), |b| {
            b.iter(|| black_box(addr_view.lookup_forward_32(black_box(0x0b00_0000)).unwrap()))
        });
    }
    group.finish();
}

fn bench_query(c: &mut Criterion) {
    let method = Method::BitPack128;
    let ports = serialize_to_vec(port_builder(method), method, 0).unwrap();
    let addrs = serialize_to_vec(addr_builder(method), method, 0).unwrap();
    let mut env = Environment::new();
    env.bind("ix", make_poly_index_view(&ports).unwrap());
    env.bind("i4", make_poly_index_view(&addrs).unwrap());

    c.bench_function("query/union_intersection", |b| {
        b.iter(|| black_box(evaluate(&env, "(ix(3000) + ix(4000)) & i4(167776820)").unwrap()))
    });
}

criterion_group!(benches, bench_serialize, bench_lookup, bench_query);
criterion_main!(benches);
