//! Query execution
//!
//! Every query runs against one table snapshot. Chunk `i` of the filter
//! column decides which rows of chunk `i` survive in every other column:
//!
//! ```text
//! filter chunk ──► can_skip? ──yes──► Skip
//!                     │no
//!                     ▼
//!              matching_positions ──► All | Positions
//!                                          │
//!              target chunk i ──► read_all | take(positions)
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use super::aggregate::Accumulator;
use super::{AggFunc, Query, QueryKind, QueryOutput, QueryResult, ScanStats};
use crate::columnar::{ColumnChunk, ColumnarTable, Condition, TableSnapshot};
use crate::error::{ColumnarError, Result};
use crate::store::ColumnarStore;
use crate::types::Value;

/// Rows of one chunk that survive the filter
#[derive(Debug, Clone, PartialEq, Eq)]
enum Selection {
    Skip,
    All,
    Positions(Vec<usize>),
}

impl Selection {
    fn stats(&self) -> ScanStats {
        let skipped = matches!(self, Selection::Skip);
        ScanStats {
            chunks_total: 1,
            chunks_scanned: usize::from(!skipped),
            chunks_skipped: usize::from(skipped),
            chunks_from_stats: 0,
        }
    }

    fn from_stats() -> ScanStats {
        ScanStats {
            chunks_total: 1,
            chunks_from_stats: 1,
            ..ScanStats::default()
        }
    }
}

/// Filter column chunks paired with the condition evaluated on them
type FilterChunks<'a> = Option<(&'a [Arc<ColumnChunk>], &'a Condition)>;

/// Executes queries against a [`ColumnarStore`]
#[derive(Debug, Clone)]
pub struct QueryEngine {
    store: Arc<ColumnarStore>,
}

impl QueryEngine {
    pub fn new(store: Arc<ColumnarStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<ColumnarStore> {
        &self.store
    }

    /// Execute a query to completion on the calling thread
    pub fn execute(&self, query: &Query) -> Result<QueryResult> {
        let start = Instant::now();
        let table = self.store.get_table(&query.table)?;
        let snapshot = table.snapshot();

        let filter = match query.filter() {
            Some(filter) => Some((snapshot.chunks(&filter.column)?, &filter.condition)),
            None => None,
        };

        let result = match &query.kind {
            QueryKind::Select { columns, .. } => self.select(&table, &snapshot, columns, filter),
            QueryKind::Aggregate { column, func, .. } => {
                self.aggregate(&table, &snapshot, column, *func, filter)
            }
            QueryKind::Count { .. } => self.count(&table, &snapshot, filter),
        }?;

        debug!(
            kind = query.kind_name(),
            table = %query.table,
            scanned = result.stats.chunks_scanned,
            skipped = result.stats.chunks_skipped,
            from_stats = result.stats.chunks_from_stats,
            elapsed_us = start.elapsed().as_micros() as u64,
            "executed query"
        );
        Ok(result)
    }

    /// Execute on the blocking pool, giving up after `deadline`.
    ///
    /// On expiry the scan keeps running in the background and its result is
    /// discarded.
    pub async fn execute_with_timeout(
        &self,
        query: Query,
        deadline: Duration,
    ) -> Result<QueryResult> {
        let engine = self.clone();
        let table = query.table.clone();
        run_with_deadline(table, deadline, move || engine.execute(&query)).await
    }

    fn select(
        &self,
        table: &ColumnarTable,
        snapshot: &TableSnapshot,
        columns: &[String],
        filter: FilterChunks<'_>,
    ) -> Result<QueryResult> {
        let columns = if columns.is_empty() {
            snapshot.column_names()
        } else {
            columns.to_vec()
        };
        let targets = columns
            .iter()
            .map(|c| snapshot.chunks(c))
            .collect::<Result<Vec<_>>>()?;

        let indices: Vec<usize> = (0..snapshot.chunk_count()).collect();
        let parts = table.executor().try_map(&indices, |&i| {
            let selection = select_chunk(table.name(), i, filter)?;
            let values = match &selection {
                Selection::Skip => vec![Vec::new(); targets.len()],
                Selection::All => targets
                    .iter()
                    .map(|chunks| chunks[i].read_all())
                    .collect::<Result<Vec<_>>>()?,
                Selection::Positions(positions) => targets
                    .iter()
                    .map(|chunks| chunks[i].take(positions))
                    .collect::<Result<Vec<_>>>()?,
            };
            Ok((selection.stats(), values))
        })?;

        let mut stats = ScanStats::default();
        let mut rows: Vec<Vec<Value>> = vec![Vec::new(); columns.len()];
        for (chunk_stats, values) in parts {
            stats.record(chunk_stats);
            for (column, chunk_values) in rows.iter_mut().zip(values) {
                column.extend(chunk_values);
            }
        }

        let rows: HashMap<String, Vec<Value>> = columns.into_iter().zip(rows).collect();
        Ok(QueryResult {
            output: QueryOutput::Rows(rows),
            stats,
        })
    }

    fn aggregate(
        &self,
        table: &ColumnarTable,
        snapshot: &TableSnapshot,
        column: &str,
        func: AggFunc,
        filter: FilterChunks<'_>,
    ) -> Result<QueryResult> {
        let data_type = snapshot.data_type(column)?;
        if func.is_numeric_only() && !data_type.is_numeric() {
            return Err(ColumnarError::UnsupportedType(format!(
                "{} over {} column {}",
                func.name(),
                data_type,
                column
            )));
        }
        let targets = snapshot.chunks(column)?;

        let indices: Vec<usize> = (0..targets.len()).collect();
        let partials = table.executor().try_map(&indices, |&i| {
            let chunk = &targets[i];
            let mut acc = Accumulator::new(func);
            if filter.is_none() && acc.update_from_metadata(chunk.metadata()) {
                return Ok((Selection::from_stats(), acc));
            }
            let selection = select_chunk(table.name(), i, filter)?;
            match &selection {
                Selection::Skip => {}
                Selection::All => acc.update_batch(&chunk.read_all()?)?,
                Selection::Positions(positions) => acc.update_batch(&chunk.take(positions)?)?,
            }
            Ok((selection.stats(), acc))
        })?;

        let mut stats = ScanStats::default();
        let mut total = Accumulator::new(func);
        for (chunk_stats, acc) in &partials {
            stats.record(*chunk_stats);
            total.merge(acc);
        }

        Ok(QueryResult {
            output: QueryOutput::Value(total.finalize()),
            stats,
        })
    }

    fn count(
        &self,
        table: &ColumnarTable,
        snapshot: &TableSnapshot,
        filter: FilterChunks<'_>,
    ) -> Result<QueryResult> {
        if snapshot.schema().is_empty() {
            return Err(ColumnarError::EmptyTable(table.name().to_string()));
        }

        let Some((chunks, _)) = filter else {
            let chunk_count = snapshot.chunk_count();
            return Ok(QueryResult {
                output: QueryOutput::Count(snapshot.row_count() as u64),
                stats: ScanStats {
                    chunks_total: chunk_count,
                    chunks_from_stats: chunk_count,
                    ..ScanStats::default()
                },
            });
        };

        let indices: Vec<usize> = (0..chunks.len()).collect();
        let parts = table.executor().try_map(&indices, |&i| {
            let selection = select_chunk(table.name(), i, filter)?;
            let matched = match &selection {
                Selection::Skip => 0,
                Selection::All => chunks[i].row_count(),
                Selection::Positions(positions) => positions.len(),
            };
            Ok((selection.stats(), matched as u64))
        })?;

        let mut stats = ScanStats::default();
        let mut count = 0;
        for (chunk_stats, matched) in parts {
            stats.record(chunk_stats);
            count += matched;
        }

        Ok(QueryResult {
            output: QueryOutput::Count(count),
            stats,
        })
    }
}

/// Decide which rows of chunk `index` survive the filter
fn select_chunk(table: &str, index: usize, filter: FilterChunks<'_>) -> Result<Selection> {
    let Some((chunks, condition)) = filter else {
        return Ok(Selection::All);
    };
    let chunk = &chunks[index];
    if chunk.can_skip(condition) {
        trace!(
            table = %table,
            chunk = index,
            column = %chunk.metadata().column_name,
            "skipped chunk"
        );
        return Ok(Selection::Skip);
    }
    let positions = chunk.matching_positions(condition)?;
    if positions.len() == chunk.row_count() {
        Ok(Selection::All)
    } else {
        Ok(Selection::Positions(positions))
    }
}

/// Run `work` on the blocking pool and race it against `deadline`
async fn run_with_deadline<T, F>(table: String, deadline: Duration, work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let task = tokio::task::spawn_blocking(work);

    match tokio::time::timeout(deadline, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => Err(ColumnarError::Internal(format!("query task failed: {}", e))),
        Err(_) => {
            warn!(
                table = %table,
                deadline_ms = deadline.as_millis() as u64,
                "query deadline expired"
            );
            Err(ColumnarError::QueryTimeout(deadline))
        }
    }
}
