//! Benchmarks for archive build, open and member reads

use assetpack::{ArchiveBuilder, ArchiveReader, CompressionConfig};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

const MEMBER_SIZE: usize = 16 * 1024;

fn member_data(i: usize) -> Vec<u8> {
    (0..MEMBER_SIZE).map(|j| ((j / 11) as u8).wrapping_add(i as u8)).collect()
}

fn codecs() -> [(&'static str, CompressionConfig); 4] {
    [
        ("none", CompressionConfig::none()),
        ("zlib", CompressionConfig::zlib()),
        ("lz4", CompressionConfig::lz4()),
        ("zstd", CompressionConfig::zstd()),
    ]
}

fn build_bytes(count: usize, compression: CompressionConfig) -> Vec<u8> {
    let mut builder = ArchiveBuilder::with_compression(compression);
    for i in 0..count {
        builder
            .add_bytes(format!("assets/member{}.bin", i), member_data(i))
            .unwrap();
    }
    let mut bytes = Vec::new();
    builder.write_to(&mut bytes).unwrap();
    bytes
}

fn benchmark_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("archive_build");
    let count = 64;
    group.throughput(Throughput::Bytes((count * MEMBER_SIZE) as u64));

    for (label, compression) in codecs() {
        group.bench_with_input(BenchmarkId::from_parameter(label), &compression, |b, &compression| {
            b.iter(|| black_box(build_bytes(count, compression)));
        });
    }

    group.finish();
}

fn benchmark_open(c: &mut Criterion) {
    let mut group = c.benchmark_group("archive_open");

    for count in [10, 100, 1000].iter() {
        let bytes = build_bytes(*count, CompressionConfig::none());
        group.bench_with_input(BenchmarkId::from_parameter(count), &bytes, |b, bytes| {
            b.iter(|| {
                let archive = ArchiveReader::from_bytes(bytes.clone()).unwrap();
                black_box(archive.len());
            });
        });
    }

    group.finish();
}

fn benchmark_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("archive_read");
    group.throughput(Throughput::Bytes(MEMBER_SIZE as u64));

    for (label, compression) in codecs() {
        let archive = ArchiveReader::from_bytes(build_bytes(64, compression)).unwrap();
        group.bench_function(label, |b| {
            let mut i = 0;
            b.iter(|| {
                let name = format!("assets/member{}.bin", i % 64);
                black_box(archive.read(&name).unwrap());
                i += 1;
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_build, benchmark_open, benchmark_read);
criterion_main!(benches);
