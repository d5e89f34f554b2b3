//! Columnar tables
//!
//! A table owns named columns, each an ordered list of sealed chunks.
//! Every insert seals all columns with the same chunk splits, so chunk `i`
//! of every column covers the same row range.
//!
//! Writers are serialized by a per-table mutex and build the next
//! [`TableSnapshot`] off to the side; publishing is a single pointer swap.
//! Readers clone the current `Arc<TableSnapshot>` and never see a partially
//! applied insert.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, info};

use super::chunk::{check_column_name, ColumnChunk};
use super::compression::compression_ratio;
use super::parallel::ChunkExecutor;
use crate::config::EngineConfig;
use crate::error::{ColumnarError, Result};
use crate::types::{DataType, Value};

/// Declared column
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnSchema {
    pub name: String,
    pub data_type: DataType,
}

/// Chunk list of one column; cloned on append
pub type ChunkList = Arc<Vec<Arc<ColumnChunk>>>;

/// Immutable, consistent view of a table
#[derive(Debug, Clone, Default)]
pub struct TableSnapshot {
    schema: Vec<ColumnSchema>,
    columns: HashMap<String, ChunkList>,
    row_count: usize,
}

impl TableSnapshot {
    pub fn schema(&self) -> &[ColumnSchema] {
        &self.schema
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_names(&self) -> Vec<String> {
        self.schema.iter().map(|c| c.name.clone()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn data_type(&self, name: &str) -> Result<DataType> {
        self.schema
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.data_type)
            .ok_or_else(|| ColumnarError::UnknownColumn(name.to_string()))
    }

    /// Chunks of a column, in row order
    pub fn chunks(&self, name: &str) -> Result<&[Arc<ColumnChunk>]> {
        self.columns
            .get(name)
            .map(|chunks| chunks.as_slice())
            .ok_or_else(|| ColumnarError::UnknownColumn(name.to_string()))
    }

    /// Number of chunks per column (identical for every column)
    pub fn chunk_count(&self) -> usize {
        self.schema
            .first()
            .and_then(|c| self.columns.get(&c.name))
            .map(|chunks| chunks.len())
            .unwrap_or(0)
    }

    /// Row counts of the shared chunk layout
    fn chunk_layout(&self) -> Vec<usize> {
        self.schema
            .first()
            .and_then(|c| self.columns.get(&c.name))
            .map(|chunks| chunks.iter().map(|c| c.row_count()).collect())
            .unwrap_or_default()
    }

    /// Concatenate every chunk of a column
    pub fn read_column(&self, name: &str) -> Result<Vec<Value>> {
        let chunks = self.chunks(name)?;
        let mut values = Vec::with_capacity(self.row_count);
        for chunk in chunks {
            values.extend(chunk.read_all()?);
        }
        Ok(values)
    }
}

/// Per-column storage statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStats {
    pub name: String,
    pub data_type: DataType,
    pub chunk_count: usize,
    pub null_count: usize,
    pub compressed_bytes: usize,
    pub uncompressed_bytes: usize,
    pub compression_ratio: f64,
    /// Chunks per codec name
    pub codecs: BTreeMap<String, usize>,
}

/// Table-level storage statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableStats {
    pub table: String,
    pub row_count: usize,
    pub columns: Vec<ColumnStats>,
    pub compressed_bytes: usize,
    pub uncompressed_bytes: usize,
    pub compression_ratio: f64,
}

/// Append-only columnar table
#[derive(Debug)]
pub struct ColumnarTable {
    name: String,
    config: EngineConfig,
    executor: Arc<ChunkExecutor>,
    snapshot: RwLock<Arc<TableSnapshot>>,
    writer: Mutex<()>,
}

impl ColumnarTable {
    /// Standalone table that seals on the calling thread
    pub fn new(name: impl Into<String>, chunk_capacity: usize) -> Result<Self> {
        let config = EngineConfig::default()
            .with_chunk_capacity(chunk_capacity)
            .with_parallel(false);
        Self::with_config(name, &config)
    }

    /// Create a table with its own chunk executor
    pub fn with_config(name: impl Into<String>, config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        let executor = Arc::new(ChunkExecutor::new(config)?);
        Self::with_executor(name, config, executor)
    }

    pub(crate) fn with_executor(
        name: impl Into<String>,
        config: &EngineConfig,
        executor: Arc<ChunkExecutor>,
    ) -> Result<Self> {
        config.validate()?;
        let name = name.into();
        info!(table = %name, chunk_capacity = config.chunk_capacity, "created columnar table");
        Ok(Self {
            name,
            config: config.clone(),
            executor,
            snapshot: RwLock::new(Arc::new(TableSnapshot::default())),
            writer: Mutex::new(()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn chunk_capacity(&self) -> usize {
        self.config.chunk_capacity
    }

    pub(crate) fn executor(&self) -> &ChunkExecutor {
        &self.executor
    }

    /// Current immutable view
    pub fn snapshot(&self) -> Arc<TableSnapshot> {
        self.snapshot.read().clone()
    }

    pub fn row_count(&self) -> usize {
        self.snapshot().row_count()
    }

    pub fn schema(&self) -> Vec<ColumnSchema> {
        self.snapshot().schema().to_vec()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.snapshot().column_names()
    }

    fn publish(&self, next: TableSnapshot) {
        *self.snapshot.write() = Arc::new(next);
    }

    /// Declare a column.
    ///
    /// If rows already exist, the column is back-filled with nulls using the
    /// existing chunk layout.
    pub fn add_column(&self, name: impl Into<String>, data_type: DataType) -> Result<()> {
        let name = name.into();
        check_column_name(&name)?;
        let _guard = self.writer.lock();
        let current = self.snapshot();
        if current.has_column(&name) {
            return Err(ColumnarError::DuplicateColumn(name));
        }

        let layout = current.chunk_layout();
        let codec = &self.config.codec;
        let chunks = self.executor.try_map(&layout, |&rows| {
            ColumnChunk::seal(&name, &vec![Value::Null; rows], codec).map(Arc::new)
        })?;

        let mut next = (*current).clone();
        next.schema.push(ColumnSchema {
            name: name.clone(),
            data_type,
        });
        next.columns.insert(name.clone(), Arc::new(chunks));
        self.publish(next);

        info!(table = %self.name, column = %name, data_type = %data_type, "added column");
        Ok(())
    }

    /// Append a column-aligned batch.
    ///
    /// All-or-nothing: the batch is validated and sealed before the new
    /// snapshot is published. Declared columns missing from the batch are
    /// filled with nulls.
    pub fn insert_batch(&self, batch: HashMap<String, Vec<Value>>) -> Result<()> {
        let _guard = self.writer.lock();
        let current = self.snapshot();

        let mut keys: Vec<&String> = batch.keys().collect();
        keys.sort();
        if let Some(unknown) = keys.iter().find(|k| !current.has_column(k)) {
            return Err(ColumnarError::UnknownColumn(unknown.to_string()));
        }

        // Schema order keeps the reported mismatch deterministic
        let mut rows: Option<usize> = None;
        for column in current.schema() {
            let Some(values) = batch.get(&column.name) else {
                continue;
            };
            match rows {
                None => rows = Some(values.len()),
                Some(expected) if expected != values.len() => {
                    return Err(ColumnarError::RowCountMismatch {
                        column: column.name.clone(),
                        expected,
                        actual: values.len(),
                    })
                }
                _ => {}
            }
            if let Some(bad) = values.iter().find(|v| !column.data_type.accepts(v)) {
                return Err(ColumnarError::TypeMismatch {
                    column: column.name.clone(),
                    expected: column.data_type.name().to_string(),
                    actual: bad.type_name().to_string(),
                });
            }
        }

        let batch_rows = match rows {
            Some(n) if n > 0 => n,
            _ => return Ok(()),
        };

        let nulls = vec![Value::Null; batch_rows];
        let capacity = self.config.chunk_capacity;
        let mut jobs = Vec::new();
        for (col_idx, column) in current.schema().iter().enumerate() {
            let values = batch.get(&column.name).unwrap_or(&nulls);
            let mut start = 0;
            while start < batch_rows {
                let end = (start + capacity).min(batch_rows);
                jobs.push((col_idx, &values[start..end]));
                start = end;
            }
        }

        let schema = current.schema();
        let codec = &self.config.codec;
        let sealed = self.executor.try_map(&jobs, |(col_idx, values)| {
            ColumnChunk::seal(&schema[*col_idx].name, values, codec).map(Arc::new)
        })?;

        let mut next = (*current).clone();
        let mut per_column: Vec<Vec<Arc<ColumnChunk>>> = schema
            .iter()
            .map(|c| {
                next.columns
                    .get(&c.name)
                    .map(|chunks| chunks.to_vec())
                    .unwrap_or_default()
            })
            .collect();
        for ((col_idx, _), chunk) in jobs.iter().zip(sealed) {
            per_column[*col_idx].push(chunk);
        }
        for (column, chunks) in schema.iter().zip(per_column) {
            next.columns.insert(column.name.clone(), Arc::new(chunks));
        }
        next.row_count += batch_rows;

        debug!(
            table = %self.name,
            rows = batch_rows,
            chunks = jobs.len(),
            total_rows = next.row_count,
            "inserted batch"
        );
        self.publish(next);
        Ok(())
    }

    /// Materialize a whole column in row order
    pub fn read_column(&self, name: &str) -> Result<Vec<Value>> {
        self.snapshot().read_column(name)
    }

    /// Storage statistics across all columns
    pub fn get_stats(&self) -> TableStats {
        let snapshot = self.snapshot();
        let mut columns = Vec::with_capacity(snapshot.schema().len());

        for column in snapshot.schema() {
            let chunks = snapshot.chunks(&column.name).unwrap_or(&[]);
            let mut codecs = BTreeMap::new();
            let mut compressed_bytes = 0;
            let mut uncompressed_bytes = 0;
            let mut null_count = 0;
            for chunk in chunks {
                *codecs.entry(chunk.codec().name().to_string()).or_insert(0) += 1;
                compressed_bytes += chunk.compressed_size();
                uncompressed_bytes += chunk.metadata().uncompressed_size;
                null_count += chunk.metadata().null_count;
            }
            columns.push(ColumnStats {
                name: column.name.clone(),
                data_type: column.data_type,
                chunk_count: chunks.len(),
                null_count,
                compressed_bytes,
                uncompressed_bytes,
                compression_ratio: compression_ratio(uncompressed_bytes, compressed_bytes),
                codecs,
            });
        }

        let compressed_bytes = columns.iter().map(|c| c.compressed_bytes).sum();
        let uncompressed_bytes = columns.iter().map(|c| c.uncompressed_bytes).sum();
        TableStats {
            table: self.name.clone(),
            row_count: snapshot.row_count(),
            columns,
            compressed_bytes,
            uncompressed_bytes,
            compression_ratio: compression_ratio(uncompressed_bytes, compressed_bytes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(entries: Vec<(&str, Vec<Value>)>) -> HashMap<String, Vec<Value>> {
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    fn ints(values: &[i64]) -> Vec<Value> {
        values.iter().map(|&v| Value::Integer(v)).collect()
    }

    fn table(capacity: usize) -> ColumnarTable {
        let table = ColumnarTable::new("sales", capacity).unwrap();
        table.add_column("category", DataType::Text).unwrap();
        table.add_column("price", DataType::Integer).unwrap();
        table
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = ColumnarTable::new("t", 0).unwrap_err();
        assert!(matches!(err, ColumnarError::InvalidConfig(_)));
    }

    #[test]
    fn test_duplicate_column() {
        let table = table(2);
        let err = table.add_column("price", DataType::Float).unwrap_err();
        assert!(matches!(err, ColumnarError::DuplicateColumn(name) if name == "price"));
    }

    #[test]
    fn test_column_name_must_fit_frame() {
        let table = table(2);
        let long = "c".repeat(crate::columnar::MAX_COLUMN_NAME_LEN + 1);
        let err = table.add_column(long, DataType::Integer).unwrap_err();
        assert!(matches!(err, ColumnarError::LimitExceeded(_)));
        assert_eq!(table.snapshot().schema().len(), 2);
    }

    #[test]
    fn test_splits_into_chunks() {
        let table = table(2);
        table
            .insert_batch(batch(vec![
                ("category", vec!["A".into(), "A".into(), "B".into()]),
                ("price", ints(&[10, 20, 30])),
            ]))
            .unwrap();

        let snapshot = table.snapshot();
        let chunks = snapshot.chunks("category").unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].read_all().unwrap(), vec![Value::from("A"), Value::from("A")]);
        assert_eq!(chunks[1].read_all().unwrap(), vec![Value::from("B")]);
        assert_eq!(
            table.read_column("category").unwrap(),
            vec![Value::from("A"), Value::from("A"), Value::from("B")]
        );
        assert_eq!(table.row_count(), 3);
    }

    #[test]
    fn test_missing_columns_filled_with_nulls() {
        let table = table(10);
        table
            .insert_batch(batch(vec![("price", ints(&[1, 2]))]))
            .unwrap();
        assert_eq!(table.read_column("category").unwrap(), vec![Value::Null, Value::Null]);
    }

    #[test]
    fn test_ragged_batch_leaves_table_unchanged() {
        let table = table(10);
        table
            .insert_batch(batch(vec![("category", vec!["A".into()]), ("price", ints(&[1]))]))
            .unwrap();

        let err = table
            .insert_batch(batch(vec![
                ("category", vec!["B".into(), "C".into()]),
                ("price", ints(&[1])),
            ]))
            .unwrap_err();
        assert!(matches!(err, ColumnarError::RowCountMismatch { expected: 2, actual: 1, .. }));
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.read_column("price").unwrap(), ints(&[1]));
    }

    #[test]
    fn test_unknown_column_and_type_mismatch() {
        let table = table(10);
        let err = table
            .insert_batch(batch(vec![("qty", ints(&[1]))]))
            .unwrap_err();
        assert!(matches!(err, ColumnarError::UnknownColumn(name) if name == "qty"));

        let err = table
            .insert_batch(batch(vec![("price", vec![Value::from("ten")])]))
            .unwrap_err();
        assert!(matches!(err, ColumnarError::TypeMismatch { .. }));
        assert_eq!(table.row_count(), 0);
    }

    #[test]
    fn test_empty_batch_is_noop() {
        let table = table(10);
        table.insert_batch(HashMap::new()).unwrap();
        table.insert_batch(batch(vec![("price", vec![])])).unwrap();
        assert_eq!(table.row_count(), 0);
        assert_eq!(table.snapshot().chunk_count(), 0);
    }

    #[test]
    fn test_late_column_is_backfilled() {
        let table = table(2);
        table
            .insert_batch(batch(vec![("price", ints(&[1, 2, 3]))]))
            .unwrap();
        table.add_column("qty", DataType::Integer).unwrap();

        let snapshot = table.snapshot();
        let layout: Vec<usize> = snapshot
            .chunks("qty")
            .unwrap()
            .iter()
            .map(|c| c.row_count())
            .collect();
        assert_eq!(layout, vec![2, 1]);
        assert_eq!(table.read_column("qty").unwrap(), vec![Value::Null; 3]);
    }

    #[test]
    fn test_snapshot_isolation() {
        let table = table(10);
        let before = table.snapshot();
        table
            .insert_batch(batch(vec![("price", ints(&[5]))]))
            .unwrap();
        assert_eq!(before.row_count(), 0);
        assert_eq!(table.snapshot().row_count(), 1);
    }

    #[test]
    fn test_stats() {
        let table = table(100);
        let categories: Vec<Value> = (0..250).map(|i| Value::from(["x", "y"][i % 2])).collect();
        let prices: Vec<Value> = (0..250).map(|_| Value::Integer(7)).collect();
        table
            .insert_batch(batch(vec![("category", categories), ("price", prices)]))
            .unwrap();

        let stats = table.get_stats();
        assert_eq!(stats.row_count, 250);
        assert_eq!(stats.columns.len(), 2);
        let price = &stats.columns[1];
        assert_eq!(price.chunk_count, 3);
        assert_eq!(price.uncompressed_bytes, 2000);
        assert!(price.compression_ratio > 1.0);
        assert_eq!(price.codecs.values().sum::<usize>(), 3);
        assert_eq!(
            stats.compressed_bytes,
            stats.columns.iter().map(|c| c.compressed_bytes).sum::<usize>()
        );
    }
}
