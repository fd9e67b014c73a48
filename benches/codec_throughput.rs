//! Block codec throughput.
//!
//! Encodes and decodes full blocks of ascending offsets with small and wide
//! gaps, for every compressed method at both block lengths.
//!
//! Run: cargo bench --bench codec_throughput

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pktidx::codec::bitpack::{BitPack128, BitPack256};
use pktidx::codec::quad::{StreamVByteQuad128, StreamVByteQuad256};
use pktidx::codec::streamvbyte::{StreamVByte128, StreamVByte256};
use pktidx::codec::uncompressed::Uncompressed128;
use pktidx::codec::BlockCodec;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Ascending block with gaps cycling below `max_gap`.
fn make_block(len: usize, max_gap: u32) -> Vec<u32> {
    let mut cur = 1000u32;
    (0..len as u32)
        .map(|i| {
            cur += 1 + (i.wrapping_mul(2654435761) % max_gap);
            cur
        })
        .collect()
}

fn bench_codec<C: BlockCodec>(c: &mut Criterion, label: &str) {
    let mut group = c.benchmark_group(format!("codec/{}", label));
    group.throughput(Throughput::Elements(C::BLOCK_LEN as u64));

    for max_gap in [64u32, 1 << 20] {
        let block = make_block(C::BLOCK_LEN, max_gap);
        let mut encoded = Vec::with_capacity(C::estimate_compressed_size());
        C::encode(&block, 0, &mut encoded);

        group.bench_with_input(BenchmarkId::new("encode", max_gap), &block, |b, block| {
            let mut out = Vec::with_capacity(C::estimate_compressed_size());
            b.iter(|| {
                out.clear();
                black_box(C::encode(black_box(block), 0, &mut out));
            })
        });

        group.bench_with_input(BenchmarkId::new("decode", max_gap), &encoded, |b, encoded| {
            let mut out = vec![0u32; C::BLOCK_LEN];
            b.iter(|| {
                black_box(C::decode(black_box(encoded), 0, &mut out).unwrap());
            })
        });
    }
    group.finish();
}

fn bench_codecs(c: &mut Criterion) {
    bench_codec::<Uncompressed128>(c, "uncompressed128");
    bench_codec::<BitPack128>(c, "bitpack128");
    bench_codec::<BitPack256>(c, "bitpack256");
    bench_codec::<StreamVByte128>(c, "streamvbyte128");
    bench_codec::<StreamVByte256>(c, "streamvbyte256");
    bench_codec::<StreamVByteQuad128>(c, "streamvbyte_quad128");
    bench_codec::<StreamVByteQuad256>(c, "streamvbyte_quad256");
}

criterion_group!(benches, bench_codecs);
criterion_main!(benches);
