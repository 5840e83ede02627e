//! Benchmarks the container scanners over the synthetic fixtures.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use read_meta::{scan_auto, ContainerBlockRef};

fn scan_fixtures(c: &mut Criterion) {
    let files = meta_test_data::seed_files();
    c.bench_function("scan_auto/fixtures", |b| {
        let mut out = [ContainerBlockRef::default(); 64];
        b.iter(|| {
            for file in &files {
                black_box(scan_auto(black_box(file), &mut out));
            }
        })
    });
}

criterion_group!(benches, scan_fixtures);
criterion_main!(benches);
