//! Query Engine
//!
//! Select, aggregate and count over a single table, with chunk skipping
//! driven by per-chunk min/max statistics.

pub mod aggregate;
pub mod executor;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::columnar::Filter;
use crate::types::Value;

pub use aggregate::Accumulator;
pub use executor::QueryEngine;

/// Aggregation functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggFunc {
    Sum,
    Average,
    Min,
    Max,
    Count,
}

impl AggFunc {
    pub fn name(&self) -> &'static str {
        match self {
            AggFunc::Sum => "sum",
            AggFunc::Average => "average",
            AggFunc::Min => "min",
            AggFunc::Max => "max",
            AggFunc::Count => "count",
        }
    }

    /// Requires Integer or Float input
    pub fn is_numeric_only(&self) -> bool {
        matches!(self, AggFunc::Sum | AggFunc::Average)
    }
}

/// What a query computes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryKind {
    /// Return column values; an empty list means every column
    Select {
        columns: Vec<String>,
        filter: Option<Filter>,
    },
    Aggregate {
        column: String,
        func: AggFunc,
        filter: Option<Filter>,
    },
    Count { filter: Option<Filter> },
}

/// A query against one table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub table: String,
    pub kind: QueryKind,
}

impl Query {
    pub fn select<I, S>(table: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            table: table.into(),
            kind: QueryKind::Select {
                columns: columns.into_iter().map(Into::into).collect(),
                filter: None,
            },
        }
    }

    pub fn aggregate(table: impl Into<String>, column: impl Into<String>, func: AggFunc) -> Self {
        Self {
            table: table.into(),
            kind: QueryKind::Aggregate {
                column: column.into(),
                func,
                filter: None,
            },
        }
    }

    pub fn count(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            kind: QueryKind::Count { filter: None },
        }
    }

    /// Attach a row filter
    pub fn with_filter(mut self, filter: Filter) -> Self {
        match &mut self.kind {
            QueryKind::Select { filter: f, .. }
            | QueryKind::Aggregate { filter: f, .. }
            | QueryKind::Count { filter: f } => *f = Some(filter),
        }
        self
    }

    pub fn filter(&self) -> Option<&Filter> {
        match &self.kind {
            QueryKind::Select { filter, .. }
            | QueryKind::Aggregate { filter, .. }
            | QueryKind::Count { filter } => filter.as_ref(),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            QueryKind::Select { .. } => "select",
            QueryKind::Aggregate { .. } => "aggregate",
            QueryKind::Count { .. } => "count",
        }
    }
}

/// Query payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum QueryOutput {
    Rows(HashMap<String, Vec<Value>>),
    Value(Value),
    Count(u64),
}

/// Chunk accounting for one query.
///
/// Counted over the filter column's chunks, or the target column's chunks
/// when there is no filter. `chunks_total` is always the sum of the other
/// three fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    pub chunks_total: usize,
    /// Decompressed and evaluated
    pub chunks_scanned: usize,
    /// Ruled out by min/max
    pub chunks_skipped: usize,
    /// Answered from chunk metadata alone
    pub chunks_from_stats: usize,
}

impl ScanStats {
    pub(crate) fn record(&mut self, other: ScanStats) {
        self.chunks_total += other.chunks_total;
        self.chunks_scanned += other.chunks_scanned;
        self.chunks_skipped += other.chunks_skipped;
        self.chunks_from_stats += other.chunks_from_stats;
    }
}

/// Output plus scan accounting
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub output: QueryOutput,
    pub stats: ScanStats,
}

impl QueryResult {
    pub fn rows(&self) -> Option<&HashMap<String, Vec<Value>>> {
        match &self.output {
            QueryOutput::Rows(rows) => Some(rows),
            _ => None,
        }
    }

    pub fn value(&self) -> Option<&Value> {
        match &self.output {
            QueryOutput::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn count(&self) -> Option<u64> {
        match self.output {
            QueryOutput::Count(count) => Some(count),
            _ => None,
        }
    }
}
