use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use libmafsa::prelude::*;

/// Generate a sorted, deduplicated list of dictionary-like terms.
fn generate_terms(size: usize) -> Vec<String> {
    let prefixes = [
        "pre", "un", "re", "in", "dis", "en", "non", "over", "mis", "sub",
    ];
    let roots = [
        "test", "code", "data", "work", "play", "read", "write", "run", "walk", "talk",
    ];
    let suffixes = [
        "ing", "ed", "er", "est", "ly", "ness", "ment", "tion", "able", "ful",
    ];

    let mut terms = Vec::with_capacity(size);
    for i in 0..size {
        let prefix = prefixes[i % prefixes.len()];
        let root = roots[(i / prefixes.len()) % roots.len()];
        let suffix = suffixes[(i / (prefixes.len() * roots.len())) % suffixes.len()];
        terms.push(format!("{}{}{}", prefix, root, suffix));
    }

    terms.sort();
    terms.dedup();
    terms
}

fn bench_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("construction");

    for size in [100, 500, 1000].iter() {
        let terms = generate_terms(*size);
        group.throughput(Throughput::Elements(terms.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let mut builder = Builder::new();
                for term in &terms {
                    builder.insert(black_box(term)).unwrap();
                }
                builder.finish();
                black_box(builder.node_count())
            });
        });
    }
    group.finish();
}

fn bench_contains(c: &mut Criterion) {
    let mut group = c.benchmark_group("contains");

    for size in [100, 500, 1000].iter() {
        let terms = generate_terms(*size);
        let builder = Builder::from_terms(&terms).unwrap();
        let graph = decode(&builder.encode().unwrap()).unwrap();
        let queries: Vec<&str> = terms.iter().take(100).map(|s| s.as_str()).collect();

        group.throughput(Throughput::Elements(queries.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                for query in &queries {
                    black_box(graph.contains(black_box(query)));
                }
            });
        });
    }
    group.finish();
}

fn bench_index_of(c: &mut Criterion) {
    let terms = generate_terms(1000);
    let builder = Builder::from_terms(&terms).unwrap();
    let graph = decode(&builder.encode().unwrap()).unwrap();
    let queries: Vec<&str> = terms.iter().take(100).map(|s| s.as_str()).collect();

    let mut group = c.benchmark_group("index_of");
    group.throughput(Throughput::Elements(queries.len() as u64));
    group.bench_function("1000", |b| {
        b.iter(|| {
            for query in &queries {
                black_box(graph.index_of(black_box(query)));
            }
        });
    });
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    for size in [100, 500, 1000].iter() {
        let terms = generate_terms(*size);
        let bytes = Builder::from_terms(&terms).unwrap().encode().unwrap();

        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(decode(black_box(&bytes)).unwrap()));
        });
    }
    group.finish();
}

fn bench_enumeration(c: &mut Criterion) {
    let terms = generate_terms(1000);
    let builder = Builder::from_terms(&terms).unwrap();
    let graph = decode(&builder.encode().unwrap()).unwrap();

    let mut group = c.benchmark_group("enumeration");
    group.throughput(Throughput::Elements(graph.term_count() as u64));
    group.bench_function("1000", |b| {
        b.iter(|| black_box(graph.terms().count()));
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_construction,
    bench_contains,
    bench_index_of,
    bench_decode,
    bench_enumeration
);
criterion_main!(benches);
