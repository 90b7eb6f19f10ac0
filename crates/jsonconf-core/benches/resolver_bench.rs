//! Criterion benchmarks for path parsing and resolution.
//!
//! Every store operation parses one path and walks the document once, so
//! these two costs bound the in-memory part of a cycle.
//!
//! Run with:
//! ```bash
//! cargo bench --package jsonconf-core --bench resolver_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use jsonconf_core::domain::document::{assign, merge_defaults, Document};
use jsonconf_core::domain::resolver::{deep_get, deep_normalize};
use jsonconf_core::{KeyPath, Strictness};
use serde_json::{json, Value};

// ── Fixture builders ──────────────────────────────────────────────────────────

/// `{"level0": {"level1": {... {"leaf": 42}}}}` nested `depth` objects deep.
fn nested_document(depth: usize) -> (Value, KeyPath) {
    let mut value = json!({ "leaf": 42 });
    let mut segments = vec!["leaf".to_string()];
    for level in (0..depth).rev() {
        let key = format!("level{level}");
        let mut map = Document::new();
        map.insert(key.clone(), value);
        value = Value::Object(map);
        segments.insert(0, key);
    }
    (value, KeyPath::parse(&segments.join(".")))
}

fn wide_document(keys: usize) -> Document {
    (0..keys)
        .map(|i| (format!("key{i}"), json!({ "value": i, "tags": ["a", "b"] })))
        .collect()
}

// ── Benchmarks: KeyPath::parse ────────────────────────────────────────────────

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("key_path_parse");

    group.bench_function("short", |b| b.iter(|| KeyPath::parse(black_box("server.port"))));
    group.bench_function("with_indices", |b| {
        b.iter(|| KeyPath::parse(black_box("servers.12.listeners.0.address")))
    });

    group.finish();
}

// ── Benchmarks: deep_get ──────────────────────────────────────────────────────

fn bench_deep_get_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("deep_get_depth");

    for depth in [1usize, 4, 16, 64] {
        let (document, path) = nested_document(depth);
        group.bench_with_input(BenchmarkId::new("depth", depth), &path, |b, path| {
            b.iter(|| deep_get(black_box(&document), path))
        });
    }

    group.finish();
}

// ── Benchmarks: writes ────────────────────────────────────────────────────────

fn bench_deep_normalize_vivify(c: &mut Criterion) {
    let path = KeyPath::parse("a.b.c.d.e.f.g.h");
    let mut group = c.benchmark_group("deep_normalize");

    group.bench_function("vivify_8_levels", |b| {
        b.iter(|| {
            let mut document = json!({});
            deep_normalize(&mut document, black_box(&path), Strictness::Lenient).map(|_| ())
        })
    });

    group.finish();
}

fn bench_assign_and_merge(c: &mut Criterion) {
    let defaults = wide_document(100);
    let path = KeyPath::parse("key50.tags.5");
    let mut group = c.benchmark_group("document");

    group.bench_function("merge_defaults_100_keys", |b| {
        b.iter(|| merge_defaults(black_box(&defaults), wide_document(10)))
    });

    group.bench_function("assign_grows_sequence", |b| {
        b.iter(|| {
            let mut document = defaults.clone();
            assign(&mut document, black_box(&path), json!("x"), Strictness::Lenient)
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_parse,
    bench_deep_get_scaling,
    bench_deep_normalize_vivify,
    bench_assign_and_merge
);
criterion_main!(benches);
