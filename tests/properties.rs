use std::cmp::Ordering;
use std::collections::HashMap;

use luma_columnar::{
    Codec, CodecConfig, ColumnChunk, ColumnarTable, Condition, DataType, Value,
};
use proptest::prelude::*;

fn nullable(inner: impl Strategy<Value = Value>) -> impl Strategy<Value = Value> {
    prop_oneof![4 => inner, 1 => Just(Value::Null)]
}

fn integer_column() -> impl Strategy<Value = Vec<Value>> {
    let value = prop_oneof![
        (0i64..4).prop_map(Value::Integer),
        (-1_000i64..1_000).prop_map(Value::Integer),
        any::<i64>().prop_map(Value::Integer),
    ];
    prop::collection::vec(nullable(value), 0..300)
}

fn float_column() -> impl Strategy<Value = Vec<Value>> {
    let value = prop_oneof![
        (0i32..8).prop_map(|v| Value::Float(v as f64 * 0.5)),
        any::<f64>().prop_map(Value::Float),
    ];
    prop::collection::vec(nullable(value), 0..300)
}

fn text_column() -> impl Strategy<Value = Vec<Value>> {
    prop::collection::vec(nullable("[a-c]{0,3}".prop_map(Value::Text)), 0..300)
}

fn bool_column() -> impl Strategy<Value = Vec<Value>> {
    prop::collection::vec(nullable(any::<bool>().prop_map(Value::Boolean)), 0..300)
}

fn any_column() -> impl Strategy<Value = Vec<Value>> {
    prop_oneof![integer_column(), float_column(), text_column(), bool_column()]
}

fn small_codec_config() -> CodecConfig {
    CodecConfig {
        min_values: 8,
        ..CodecConfig::default()
    }
}

proptest! {
    #[test]
    fn suitable_codecs_round_trip(values in any_column()) {
        for config in [CodecConfig::default(), small_codec_config()] {
            for codec in Codec::PRIORITY {
                if !codec.is_suitable(&values, &config) {
                    continue;
                }
                let encoded = codec.compress(&values, &config).unwrap();
                prop_assert_eq!(&codec.decompress(&encoded).unwrap(), &values, "{}", codec);
            }
        }
    }

    #[test]
    fn chunk_frame_round_trips(values in any_column()) {
        let chunk = ColumnChunk::seal("c", &values, &small_codec_config()).unwrap();
        let restored = ColumnChunk::from_bytes(&chunk.to_bytes()).unwrap();
        prop_assert_eq!(restored.metadata(), chunk.metadata());
        prop_assert_eq!(restored.read_all().unwrap(), values);
    }

    #[test]
    fn min_max_are_ordered_members(values in any_column()) {
        let chunk = ColumnChunk::seal("c", &values, &CodecConfig::default()).unwrap();
        let metadata = chunk.metadata();
        match (&metadata.min, &metadata.max) {
            (Some(min), Some(max)) => {
                prop_assert_ne!(min.compare(max), Some(Ordering::Greater));
                prop_assert!(values.contains(min));
                prop_assert!(values.contains(max));
            }
            (None, None) => prop_assert!(values.iter().all(Value::is_null)),
            _ => prop_assert!(false, "min and max must be present together"),
        }
        prop_assert_eq!(metadata.row_count, values.len());
        prop_assert_eq!(metadata.null_count, values.iter().filter(|v| v.is_null()).count());
    }

    #[test]
    fn skipped_chunks_have_no_matches(values in integer_column(), target in -1_200i64..1_200) {
        let chunk = ColumnChunk::seal("n", &values, &CodecConfig::default()).unwrap();
        let target = Value::Integer(target);
        for condition in [
            Condition::Equal(target.clone()),
            Condition::GreaterThan(target.clone()),
            Condition::LessThan(target.clone()),
            Condition::Equal(Value::Float(0.5)),
        ] {
            if chunk.can_skip(&condition) {
                prop_assert!(!values.iter().any(|v| condition.matches(v)), "{:?}", condition);
            }
        }
    }

    #[test]
    fn columns_stay_aligned(
        capacity in 1usize..8,
        batches in prop::collection::vec((0usize..20, any::<bool>()), 1..6),
    ) {
        let table = ColumnarTable::new("t", capacity).unwrap();
        table.add_column("a", DataType::Integer).unwrap();
        table.add_column("b", DataType::Text).unwrap();

        let mut expected = 0;
        for (i, (rows, include_b)) in batches.into_iter().enumerate() {
            let mut batch = HashMap::new();
            batch.insert(
                "a".to_string(),
                (0..rows).map(|r| Value::Integer((i * 100 + r) as i64)).collect(),
            );
            if include_b {
                batch.insert("b".to_string(), vec![Value::from("x"); rows]);
            }
            table.insert_batch(batch).unwrap();
            expected += rows;
        }
        if expected > 0 {
            table.add_column("c", DataType::Float).unwrap();
        }

        let snapshot = table.snapshot();
        prop_assert_eq!(snapshot.row_count(), expected);
        let layout = |name: &str| -> Vec<usize> {
            snapshot.chunks(name).unwrap().iter().map(|c| c.row_count()).collect()
        };
        for name in snapshot.column_names() {
            prop_assert_eq!(table.read_column(&name).unwrap().len(), expected);
            prop_assert_eq!(layout(&name), layout("a"));
            prop_assert!(layout(&name).iter().all(|&rows| rows <= capacity));
        }
    }

    #[test]
    fn reads_are_idempotent(values in integer_column()) {
        let table = ColumnarTable::new("t", 64).unwrap();
        table.add_column("n", DataType::Integer).unwrap();
        table.insert_batch(HashMap::from([("n".to_string(), values.clone())])).unwrap();

        let first = table.read_column("n").unwrap();
        prop_assert_eq!(&first, &values);
        prop_assert_eq!(table.read_column("n").unwrap(), first);
    }
}
