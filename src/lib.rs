//! LumaDB Columnar Engine
//!
//! A single-node, in-memory columnar store with per-chunk compression and
//! statistics-driven query execution.
//!
//! # Key Features
//!
//! - **Chunked Columns**: every column is split into fixed-capacity chunks,
//!   aligned by row across columns
//! - **Adaptive Compression**: each chunk picks the smallest of run-length,
//!   dictionary, delta and lz4/zstd encodings
//! - **Predicate Pushdown**: min/max statistics rule chunks out before they
//!   are decompressed
//! - **Snapshot Reads**: writers publish immutable snapshots, readers never
//!   block on sealing work
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        QueryEngine                            │
//! │   Select / Aggregate / Count ──► skip check ──► scan/combine  │
//! ├──────────────────────────────────────────────────────────────┤
//! │                       ColumnarStore                           │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────┐  │
//! │  │ ColumnarTable  │  │ ColumnarTable  │  │      ...       │  │
//! │  │  Arc<Snapshot> │  │  Arc<Snapshot> │  │                │  │
//! │  └───────┬────────┘  └────────────────┘  └────────────────┘  │
//! │          ▼                                                    │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │ ColumnChunk: codec + bytes + ColumnMetadata (min/max)  │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │ ChunkExecutor (rayon): parallel seal and scan          │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! use luma_columnar::{
//!     AggFunc, ColumnarStore, DataType, EngineConfig, Filter, Query, QueryEngine, Value,
//! };
//!
//! let store = Arc::new(ColumnarStore::new(EngineConfig::default()).unwrap());
//! let sales = store.create_table_with_capacity("sales", 2).unwrap();
//! sales.add_column("price", DataType::Integer).unwrap();
//! sales
//!     .insert_batch(HashMap::from([(
//!         "price".to_string(),
//!         vec![Value::Integer(10), Value::Integer(20), Value::Integer(30)],
//!     )]))
//!     .unwrap();
//!
//! let engine = QueryEngine::new(store);
//! let total = engine
//!     .execute(&Query::aggregate("sales", "price", AggFunc::Sum).with_filter(Filter::gt("price", 15)))
//!     .unwrap();
//! assert_eq!(total.value(), Some(&Value::Float(50.0)));
//! ```

pub mod columnar;
pub mod config;
pub mod error;
pub mod query;
pub mod store;
pub mod types;

pub use columnar::{
    Codec, ColumnChunk, ColumnMetadata, ColumnSchema, ColumnStats, ColumnarTable, Condition,
    Filter, TableSnapshot, TableStats,
};
pub use config::{CodecConfig, EngineConfig, GenericBackend, MAX_CHUNK_ROWS};
pub use error::{ColumnarError, Result};
pub use query::{AggFunc, Query, QueryEngine, QueryKind, QueryOutput, QueryResult, ScanStats};
pub use store::ColumnarStore;
pub use types::{DataType, Value};
