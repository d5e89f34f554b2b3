//! Column chunks
//!
//! A chunk is an immutable, compressed slice of at most `chunk_capacity`
//! rows of one column. Statistics are computed once at seal time and are
//! what lets the query engine skip a chunk without decompressing it.

use std::cmp::Ordering;
use std::collections::HashMap;

use bytes::Bytes;
use tracing::debug;

use super::compression::{
    compression_ratio, decode_value, encode_value, select_codec, ByteReader, Codec,
};
use super::predicate::Condition;
use crate::config::{CodecConfig, MAX_CHUNK_ROWS};
use crate::error::{ColumnarError, Result};
use crate::types::{DataType, Value};

/// Marker for an absent optional value in the chunk frame
const ABSENT: u8 = 0xFF;

/// Column names are length-prefixed with a u16 in the chunk frame
pub const MAX_COLUMN_NAME_LEN: usize = u16::MAX as usize;

/// Names that fit the chunk frame
pub(crate) fn check_column_name(name: &str) -> Result<()> {
    if name.len() > MAX_COLUMN_NAME_LEN {
        return Err(ColumnarError::LimitExceeded(format!(
            "column name of {} bytes, limit {}",
            name.len(),
            MAX_COLUMN_NAME_LEN
        )));
    }
    Ok(())
}

/// Per-chunk statistics
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMetadata {
    pub column_name: String,
    /// Type of the first non-null value; `None` for all-null chunks
    pub data_type: Option<DataType>,
    pub row_count: usize,
    pub null_count: usize,
    pub compressed_size: usize,
    pub uncompressed_size: usize,
    pub min: Option<Value>,
    pub max: Option<Value>,
    /// Hash-based; collisions can only undercount
    pub unique_count: usize,
    /// Ties go to the value seen first
    pub most_frequent: Option<Value>,
}

impl ColumnMetadata {
    /// Compute statistics in one pass. `compressed_size` is left at zero.
    pub fn compute(column_name: &str, values: &[Value]) -> Result<Self> {
        let mut data_type = None;
        let mut null_count = 0;
        let mut uncompressed_size = 0;
        let mut min: Option<&Value> = None;
        let mut max: Option<&Value> = None;
        // fingerprint -> (occurrences, first position)
        let mut frequencies: HashMap<u64, (usize, usize)> = HashMap::new();

        for (pos, value) in values.iter().enumerate() {
            let Some(value_type) = value.data_type() else {
                null_count += 1;
                continue;
            };
            match data_type {
                None => data_type = Some(value_type),
                Some(dt) if dt != value_type => {
                    return Err(ColumnarError::UnsupportedType(format!(
                        "column {} mixes {} and {} values",
                        column_name, dt, value_type
                    )))
                }
                _ => {}
            }

            uncompressed_size += value.size_bytes();
            if min.map_or(true, |m| value.compare(m) == Some(Ordering::Less)) {
                min = Some(value);
            }
            if max.map_or(true, |m| value.compare(m) == Some(Ordering::Greater)) {
                max = Some(value);
            }
            frequencies
                .entry(value.fingerprint())
                .or_insert((0, pos))
                .0 += 1;
        }

        let most_frequent = frequencies
            .values()
            .max_by(|(count_a, first_a), (count_b, first_b)| {
                count_a.cmp(count_b).then(first_b.cmp(first_a))
            })
            .map(|&(_, first)| values[first].clone());

        Ok(Self {
            column_name: column_name.to_string(),
            data_type,
            row_count: values.len(),
            null_count,
            compressed_size: 0,
            uncompressed_size,
            min: min.cloned(),
            max: max.cloned(),
            unique_count: frequencies.len(),
            most_frequent,
        })
    }

    /// uncompressed / compressed
    pub fn compression_ratio(&self) -> f64 {
        compression_ratio(self.uncompressed_size, self.compressed_size)
    }

    /// Whether min/max are present
    pub fn has_stats(&self) -> bool {
        self.row_count > self.null_count
    }
}

/// An immutable, compressed slice of one column
#[derive(Debug, Clone)]
pub struct ColumnChunk {
    codec: Codec,
    data: Bytes,
    metadata: ColumnMetadata,
}

impl ColumnChunk {
    /// Compute statistics, pick a codec and compress.
    ///
    /// Callers split input to the table's chunk capacity beforehand.
    pub fn seal(column_name: &str, values: &[Value], config: &CodecConfig) -> Result<Self> {
        check_column_name(column_name)?;
        if values.len() > MAX_CHUNK_ROWS {
            return Err(ColumnarError::LimitExceeded(format!(
                "chunk of {} rows, limit {}",
                values.len(),
                MAX_CHUNK_ROWS
            )));
        }
        let mut metadata = ColumnMetadata::compute(column_name, values)?;
        let compressed = select_codec(values, config)?;
        if compressed.compressed_size > u32::MAX as usize {
            return Err(ColumnarError::LimitExceeded(format!(
                "chunk payload of {} bytes, limit {}",
                compressed.compressed_size,
                u32::MAX
            )));
        }
        metadata.compressed_size = compressed.compressed_size;

        debug!(
            column = column_name,
            rows = metadata.row_count,
            codec = %compressed.codec,
            ratio = metadata.compression_ratio(),
            "sealed chunk"
        );

        Ok(Self {
            codec: compressed.codec,
            data: Bytes::from(compressed.data),
            metadata,
        })
    }

    pub fn codec(&self) -> Codec {
        self.codec
    }

    pub fn metadata(&self) -> &ColumnMetadata {
        &self.metadata
    }

    pub fn row_count(&self) -> usize {
        self.metadata.row_count
    }

    pub fn compressed_size(&self) -> usize {
        self.data.len()
    }

    pub fn compression_ratio(&self) -> f64 {
        self.metadata.compression_ratio()
    }

    /// Compressed payload
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Decompress every value, in order, nulls included
    pub fn read_all(&self) -> Result<Vec<Value>> {
        self.codec
            .decompress_rows(&self.data, self.metadata.row_count)
            .map_err(|e| match e {
                ColumnarError::CorruptData(reason) => ColumnarError::CorruptData(format!(
                    "chunk of {}: {}",
                    self.metadata.column_name, reason
                )),
                other => other,
            })
    }

    /// Decompress and keep values accepted by `predicate`.
    ///
    /// Nulls are handed to the predicate like any other value.
    pub fn read_filtered<F>(&self, predicate: F) -> Result<Vec<Value>>
    where
        F: Fn(&Value) -> bool,
    {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|v| predicate(v))
            .collect())
    }

    /// True only if min/max prove no value satisfies `condition`
    pub fn can_skip(&self, condition: &Condition) -> bool {
        condition.can_skip(self.metadata.min.as_ref(), self.metadata.max.as_ref())
    }

    /// In-chunk positions of values satisfying `condition`
    pub fn matching_positions(&self, condition: &Condition) -> Result<Vec<usize>> {
        Ok(self
            .read_all()?
            .iter()
            .enumerate()
            .filter(|(_, v)| condition.matches(v))
            .map(|(pos, _)| pos)
            .collect())
    }

    /// Values at the given in-chunk positions
    pub fn take(&self, positions: &[usize]) -> Result<Vec<Value>> {
        let values = self.read_all()?;
        positions
            .iter()
            .map(|&pos| {
                values.get(pos).cloned().ok_or_else(|| {
                    ColumnarError::CorruptData(format!(
                        "position {} outside chunk of {} rows",
                        pos,
                        values.len()
                    ))
                })
            })
            .collect()
    }

    // =========================================================================
    // Chunk frame
    // =========================================================================

    /// Serialize into the chunk frame.
    ///
    /// `seal` and `from_bytes` bound the row count, name and payload so every
    /// length below fits its field.
    ///
    /// ```text
    /// [codec_id u8][row_count u32][null_count u32][min][max]
    /// [data_type u8][unique_count u32][uncompressed_size u64][most_frequent]
    /// [name_len u16][name][payload_len u32][payload][crc32 u32]
    /// ```
    pub fn to_bytes(&self) -> Vec<u8> {
        let meta = &self.metadata;
        let mut out = Vec::with_capacity(self.data.len() + 64 + meta.column_name.len());

        out.push(self.codec.id());
        out.extend_from_slice(&(meta.row_count as u32).to_le_bytes());
        out.extend_from_slice(&(meta.null_count as u32).to_le_bytes());
        encode_optional(&mut out, meta.min.as_ref());
        encode_optional(&mut out, meta.max.as_ref());
        out.push(meta.data_type.map(DataType::to_u8).unwrap_or(ABSENT));
        out.extend_from_slice(&(meta.unique_count as u32).to_le_bytes());
        out.extend_from_slice(&(meta.uncompressed_size as u64).to_le_bytes());
        encode_optional(&mut out, meta.most_frequent.as_ref());
        out.extend_from_slice(&(meta.column_name.len() as u16).to_le_bytes());
        out.extend_from_slice(meta.column_name.as_bytes());
        out.extend_from_slice(&(self.data.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.data);

        let checksum = crc32fast::hash(&out);
        out.extend_from_slice(&checksum.to_le_bytes());
        out
    }

    /// Parse a chunk frame, verifying checksum and payload row count
    pub fn from_bytes(frame: &[u8]) -> Result<Self> {
        if frame.len() < 4 {
            return Err(ColumnarError::CorruptData("chunk frame too short".into()));
        }
        let (body, tail) = frame.split_at(frame.len() - 4);
        let mut expected = [0u8; 4];
        expected.copy_from_slice(tail);
        let expected = u32::from_le_bytes(expected);
        let actual = crc32fast::hash(body);
        if expected != actual {
            return Err(ColumnarError::CorruptData(format!(
                "chunk checksum mismatch: expected {:08x}, got {:08x}",
                expected, actual
            )));
        }

        let mut reader = ByteReader::new(body);
        let codec = Codec::from_id(reader.read_u8()?)?;
        let row_count = reader.read_u32()? as usize;
        let null_count = reader.read_u32()? as usize;
        let min = decode_optional(&mut reader)?;
        let max = decode_optional(&mut reader)?;
        let data_type = match reader.read_u8()? {
            ABSENT => None,
            tag => Some(DataType::from_u8(tag).ok_or_else(|| {
                ColumnarError::CorruptData(format!("unknown data type tag {}", tag))
            })?),
        };
        let unique_count = reader.read_u32()? as usize;
        let uncompressed_size = reader.read_u64()? as usize;
        let most_frequent = decode_optional(&mut reader)?;
        let name_len = reader.read_u16()? as usize;
        let column_name = std::str::from_utf8(reader.read_bytes(name_len)?)
            .map_err(|e| ColumnarError::CorruptData(format!("invalid column name: {}", e)))?
            .to_string();
        let payload_len = reader.read_u32()? as usize;
        let payload = reader.read_bytes(payload_len)?;
        reader.finish()?;

        if row_count > MAX_CHUNK_ROWS {
            return Err(ColumnarError::CorruptData(format!(
                "row count {} exceeds limit {}",
                row_count, MAX_CHUNK_ROWS
            )));
        }
        if null_count > row_count {
            return Err(ColumnarError::CorruptData(format!(
                "null count {} exceeds row count {}",
                null_count, row_count
            )));
        }

        let chunk = Self {
            codec,
            data: Bytes::copy_from_slice(payload),
            metadata: ColumnMetadata {
                column_name,
                data_type,
                row_count,
                null_count,
                compressed_size: payload_len,
                uncompressed_size,
                min,
                max,
                unique_count,
                most_frequent,
            },
        };
        // Surfaces payload/row-count disagreement as CorruptData
        chunk.read_all()?;
        Ok(chunk)
    }
}

fn encode_optional(out: &mut Vec<u8>, value: Option<&Value>) {
    match value {
        Some(v) => encode_value(out, v),
        None => out.push(ABSENT),
    }
}

fn decode_optional(reader: &mut ByteReader<'_>) -> Result<Option<Value>> {
    if reader.peek_u8()? == ABSENT {
        reader.read_u8()?;
        return Ok(None);
    }
    decode_value(reader).map(Some)
}
