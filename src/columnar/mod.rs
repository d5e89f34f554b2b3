//! Columnar Storage
//!
//! Column-at-a-time storage with:
//! - Fixed-capacity chunks aligned across columns
//! - Per-chunk codec selection (run-length, dictionary, delta, lz4/zstd)
//! - Min/max statistics for chunk skipping
//! - Snapshot publication for concurrent readers

pub mod chunk;
pub mod compression;
pub mod parallel;
pub mod predicate;
pub mod table;

pub use chunk::{ColumnChunk, ColumnMetadata, MAX_COLUMN_NAME_LEN};
pub use compression::{select_codec, Codec, CompressedData};
pub use parallel::ChunkExecutor;
pub use predicate::{Condition, Filter};
pub use table::{ColumnSchema, ColumnStats, ColumnarTable, TableSnapshot, TableStats};
