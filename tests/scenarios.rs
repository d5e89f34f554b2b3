use std::collections::HashMap;
use std::sync::Arc;

use luma_columnar::{
    AggFunc, Codec, CodecConfig, ColumnChunk, ColumnarError, ColumnarStore, ColumnarTable,
    Condition, DataType, EngineConfig, Filter, Query, QueryEngine, Value,
};

fn batch(entries: Vec<(&str, Vec<Value>)>) -> HashMap<String, Vec<Value>> {
    entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

fn text(values: &[&str]) -> Vec<Value> {
    values.iter().map(|&s| Value::from(s)).collect()
}

fn ints(values: &[i64]) -> Vec<Value> {
    values.iter().map(|&v| Value::Integer(v)).collect()
}

#[test]
fn test_batch_splits_at_capacity() {
    let table = ColumnarTable::new("sales", 2).unwrap();
    table.add_column("category", DataType::Text).unwrap();
    table.add_column("price", DataType::Integer).unwrap();

    table
        .insert_batch(batch(vec![
            ("category", text(&["A", "A", "B"])),
            ("price", ints(&[10, 20, 30])),
        ]))
        .unwrap();

    let snapshot = table.snapshot();
    let chunks = snapshot.chunks("category").unwrap();
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].read_all().unwrap(), text(&["A", "A"]));
    assert_eq!(chunks[1].read_all().unwrap(), text(&["B"]));
    assert_eq!(table.read_column("category").unwrap(), text(&["A", "A", "B"]));
}

#[test]
fn test_constant_column_uses_run_length() {
    let values = vec![Value::Integer(1); 1000];
    let chunk = ColumnChunk::seal("flag", &values, &CodecConfig::default()).unwrap();

    assert_eq!(chunk.codec(), Codec::RunLength);
    assert!(chunk.compressed_size() < 16);
    assert_eq!(chunk.metadata().uncompressed_size, 8000);
    assert_eq!(chunk.read_all().unwrap(), values);
}

#[test]
fn test_average_ignores_nulls() {
    let store = Arc::new(ColumnarStore::new(EngineConfig::default()).unwrap());
    let table = store.create_table("scores").unwrap();
    table.add_column("score", DataType::Integer).unwrap();
    table
        .insert_batch(batch(vec![(
            "score",
            vec![
                Value::Integer(10),
                Value::Integer(20),
                Value::Null,
                Value::Integer(40),
            ],
        )]))
        .unwrap();

    let engine = QueryEngine::new(store);
    let result = engine
        .execute(&Query::aggregate("scores", "score", AggFunc::Average))
        .unwrap();
    match result.value() {
        Some(Value::Float(avg)) => assert!((avg - 23.333_333).abs() < 1e-5),
        other => panic!("unexpected average {:?}", other),
    }
}

#[test]
fn test_out_of_range_chunk_is_skipped() {
    let chunk = ColumnChunk::seal("qty", &ints(&[5, 50, 20]), &CodecConfig::default()).unwrap();
    assert!(chunk.can_skip(&Condition::GreaterThan(Value::Integer(100))));

    let store = Arc::new(ColumnarStore::new(EngineConfig::default()).unwrap());
    let table = store.create_table("orders").unwrap();
    table.add_column("qty", DataType::Integer).unwrap();
    table
        .insert_batch(batch(vec![("qty", ints(&[5, 50, 20]))]))
        .unwrap();

    let engine = QueryEngine::new(store);
    let result = engine
        .execute(&Query::select("orders", ["qty"]).with_filter(Filter::gt("qty", 100)))
        .unwrap();
    assert_eq!(result.rows().unwrap()["qty"], Vec::<Value>::new());
    assert_eq!(result.stats.chunks_skipped, 1);
    assert_eq!(result.stats.chunks_scanned, 0);
}

#[test]
fn test_ragged_batch_is_rejected_atomically() {
    let table = ColumnarTable::new("sales", 2).unwrap();
    table.add_column("category", DataType::Text).unwrap();
    table.add_column("price", DataType::Integer).unwrap();
    table
        .insert_batch(batch(vec![
            ("category", text(&["A"])),
            ("price", ints(&[1])),
        ]))
        .unwrap();
    let before = table.get_stats();

    let err = table
        .insert_batch(batch(vec![
            ("category", text(&["A", "B", "C"])),
            ("price", ints(&[1, 2])),
        ]))
        .unwrap_err();

    assert!(matches!(err, ColumnarError::RowCountMismatch { .. }));
    assert_eq!(table.get_stats(), before);
    assert_eq!(table.read_column("price").unwrap(), ints(&[1]));
}
