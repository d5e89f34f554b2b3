//! Seal and scan throughput for the columnar engine
//!
//! Run with: cargo bench --bench columnar_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::collections::HashMap;
use std::sync::Arc;

use luma_columnar::{
    AggFunc, CodecConfig, ColumnChunk, ColumnarStore, DataType, EngineConfig, Filter, Query,
    QueryEngine, Value,
};

const ROWS: usize = 65_536;

fn columns() -> Vec<(&'static str, Vec<Value>)> {
    vec![
        ("constant", vec![Value::Integer(1); ROWS]),
        (
            "category",
            (0..ROWS).map(|i| Value::from(["red", "green", "blue"][i % 3])).collect(),
        ),
        (
            "timestamp",
            (0..ROWS).map(|i| Value::Integer(1_700_000_000 + i as i64 * 3)).collect(),
        ),
        (
            "random",
            (0..ROWS)
                .map(|i| Value::Integer((i as i64).wrapping_mul(0x9E37_79B9_7F4A_7C15u64 as i64)))
                .collect(),
        ),
    ]
}

fn bench_seal(c: &mut Criterion) {
    let config = CodecConfig::default();
    let mut group = c.benchmark_group("seal");
    group.throughput(Throughput::Elements(ROWS as u64));

    for (name, values) in columns() {
        group.bench_with_input(BenchmarkId::from_parameter(name), &values, |b, values| {
            b.iter(|| ColumnChunk::seal(name, black_box(values), &config).unwrap());
        });
    }

    group.finish();
}

fn setup_engine(parallel: bool) -> QueryEngine {
    let config = EngineConfig::default()
        .with_chunk_capacity(4096)
        .with_parallel(parallel);
    let store = Arc::new(ColumnarStore::new(config).unwrap());
    let table = store.create_table("bench").unwrap();
    let mut batch = HashMap::new();
    for (name, values) in columns() {
        let data_type = values[0].data_type().unwrap_or(DataType::Integer);
        table.add_column(name, data_type).unwrap();
        batch.insert(name.to_string(), values);
    }
    table.insert_batch(batch).unwrap();
    QueryEngine::new(store)
}

fn bench_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan");
    group.throughput(Throughput::Elements(ROWS as u64));

    for parallel in [false, true] {
        let engine = setup_engine(parallel);
        let label = if parallel { "parallel" } else { "sequential" };

        let sum = Query::aggregate("bench", "random", AggFunc::Sum);
        group.bench_function(BenchmarkId::new("sum", label), |b| {
            b.iter(|| engine.execute(black_box(&sum)).unwrap());
        });

        // Skips all but one chunk
        let pushdown = Query::count("bench").with_filter(Filter::lt("timestamp", 1_700_000_100));
        group.bench_function(BenchmarkId::new("pushdown_count", label), |b| {
            b.iter(|| engine.execute(black_box(&pushdown)).unwrap());
        });

        let select = Query::select("bench", ["category"]).with_filter(Filter::eq("category", "blue"));
        group.bench_function(BenchmarkId::new("select_text", label), |b| {
            b.iter(|| engine.execute(black_box(&select)).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_seal, bench_scan);

criterion_main!(benches);
