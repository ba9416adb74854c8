use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use weave_core::dummy_backend::DummyBackend;
use weave_core::font::cmap::{build_cmap_table, load_cmap};
use weave_core::{EnvironmentConfig, FontEnvironment, MeasureFlags};

fn bench_measure_latin(c: &mut Criterion) {
    let mut group = c.benchmark_group("measure_latin");

    let mut env = FontEnvironment::new(DummyBackend::standard(), EnvironmentConfig::default());
    let font = env.get_font("Helvetica 12").unwrap();

    for size in [10, 100, 1000] {
        let text = "Hello world ".repeat(size / 10);

        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &text, |b, text| {
            b.iter(|| env.measure(font, black_box(text), None, MeasureFlags::empty()).unwrap());
        });
    }
    group.finish();
}

fn bench_measure_mixed_scripts(c: &mut Criterion) {
    let mut group = c.benchmark_group("measure_mixed_scripts");

    // Greek and Cyrillic resolve through fallback on the first pass only.
    let mut env = FontEnvironment::new(DummyBackend::standard(), EnvironmentConfig::default());
    let font = env.get_font("Helvetica 12").unwrap();
    let line = "Hello \u{3b1}\u{3b2}\u{3b3} \u{410}\u{411}\u{412} world\t";

    for count in [10, 100] {
        let text = line.repeat(count);

        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &text, |b, text| {
            b.iter(|| env.measure(font, black_box(text), None, MeasureFlags::empty()).unwrap());
        });
    }
    group.finish();
}

fn bench_wrapping(c: &mut Criterion) {
    let mut group = c.benchmark_group("measure_wrapping");

    let mut env = FontEnvironment::new(DummyBackend::standard(), EnvironmentConfig::default());
    let font = env.get_font("Times 14").unwrap();
    let text = "The quick brown fox jumps over the lazy dog ".repeat(20);

    for max in [50, 200, 800] {
        group.bench_with_input(BenchmarkId::from_parameter(max), &max, |b, &max| {
            b.iter(|| {
                env.measure(
                    font,
                    black_box(&text),
                    Some(max),
                    MeasureFlags::WHOLE_WORDS | MeasureFlags::AT_LEAST_ONE,
                )
                .unwrap()
            });
        });
    }
    group.finish();
}

fn bench_font_construction(c: &mut Criterion) {
    c.bench_function("construct_and_release", |b| {
        let mut env = FontEnvironment::new(DummyBackend::standard(), EnvironmentConfig::default());
        b.iter(|| {
            let font = env.get_font(black_box("Courier 10 bold")).unwrap();
            env.release(font).unwrap();
        });
    });
}

fn bench_cmap_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("cmap_parsing");

    for segments in [4u16, 64, 512] {
        let ranges: Vec<(u16, u16)> = (0..segments).map(|i| (i * 100, i * 100 + 50)).collect();
        let table = build_cmap_table(&ranges, false);

        group.throughput(Throughput::Bytes(table.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(segments), &table, |b, table| {
            b.iter(|| load_cmap(black_box(table.as_slice())).unwrap());
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_measure_latin,
    bench_measure_mixed_scripts,
    bench_wrapping,
    bench_font_construction,
    bench_cmap_parsing
);
criterion_main!(benches);
