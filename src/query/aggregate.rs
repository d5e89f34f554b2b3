//! Streaming aggregation state
//!
//! Each chunk folds into its own [`Accumulator`]; partial states are merged
//! in chunk order, so parallel and sequential scans agree.

use std::cmp::Ordering;

use super::AggFunc;
use crate::columnar::ColumnMetadata;
use crate::error::{ColumnarError, Result};
use crate::types::Value;

/// Partial aggregate over non-null values
#[derive(Debug, Clone, PartialEq)]
pub struct Accumulator {
    func: AggFunc,
    sum: f64,
    count: u64,
    min: Option<Value>,
    max: Option<Value>,
}

impl Accumulator {
    pub fn new(func: AggFunc) -> Self {
        Self {
            func,
            sum: 0.0,
            count: 0,
            min: None,
            max: None,
        }
    }

    pub fn func(&self) -> AggFunc {
        self.func
    }

    /// Fold in one value. Nulls are ignored.
    pub fn update(&mut self, value: &Value) -> Result<()> {
        if value.is_null() {
            return Ok(());
        }
        match self.func {
            AggFunc::Sum | AggFunc::Average => {
                let v = value.as_f64().ok_or_else(|| {
                    ColumnarError::UnsupportedType(format!(
                        "{} over {} values",
                        self.func.name(),
                        value.type_name()
                    ))
                })?;
                self.sum += v;
            }
            AggFunc::Min => Self::keep(&mut self.min, value, Ordering::Less),
            AggFunc::Max => Self::keep(&mut self.max, value, Ordering::Greater),
            AggFunc::Count => {}
        }
        self.count += 1;
        Ok(())
    }

    pub fn update_batch<'a>(&mut self, values: impl IntoIterator<Item = &'a Value>) -> Result<()> {
        for value in values {
            self.update(value)?;
        }
        Ok(())
    }

    /// Fold in a whole chunk from its statistics, without decoding it.
    ///
    /// Only exact for Min, Max and Count; returns false otherwise.
    pub fn update_from_metadata(&mut self, metadata: &ColumnMetadata) -> bool {
        match self.func {
            AggFunc::Min => {
                if let Some(min) = &metadata.min {
                    Self::keep(&mut self.min, min, Ordering::Less);
                }
            }
            AggFunc::Max => {
                if let Some(max) = &metadata.max {
                    Self::keep(&mut self.max, max, Ordering::Greater);
                }
            }
            AggFunc::Count => {}
            AggFunc::Sum | AggFunc::Average => return false,
        }
        self.count += (metadata.row_count - metadata.null_count) as u64;
        true
    }

    /// Combine with a partial state of the same function
    pub fn merge(&mut self, other: &Accumulator) {
        self.sum += other.sum;
        self.count += other.count;
        if let Some(min) = &other.min {
            Self::keep(&mut self.min, min, Ordering::Less);
        }
        if let Some(max) = &other.max {
            Self::keep(&mut self.max, max, Ordering::Greater);
        }
    }

    /// Final value: Sum of nothing is 0.0, Average/Min/Max of nothing is Null
    pub fn finalize(&self) -> Value {
        match self.func {
            AggFunc::Sum => Value::Float(self.sum),
            AggFunc::Average if self.count == 0 => Value::Null,
            AggFunc::Average => Value::Float(self.sum / self.count as f64),
            AggFunc::Min => self.min.clone().unwrap_or(Value::Null),
            AggFunc::Max => self.max.clone().unwrap_or(Value::Null),
            AggFunc::Count => Value::Integer(self.count as i64),
        }
    }

    fn keep(slot: &mut Option<Value>, candidate: &Value, wanted: Ordering) {
        let replace = match slot {
            None => true,
            Some(current) => candidate.compare(current) == Some(wanted),
        };
        if replace {
            *slot = Some(candidate.clone());
        }
    }
}
