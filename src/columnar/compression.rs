//! Columnar Compression
//!
//! Lossless codecs over `Value` sequences:
//! - Run-length for long runs of repeated values
//! - Dictionary for low cardinality
//! - Delta for slowly changing numerics
//! - Generic (bincode + LZ4/Zstd) as the always-available fallback
//!
//! [`select_codec`] compresses with every suitable codec and keeps the
//! smallest output. Decoding is dispatched by the recorded [`Codec`] id.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::config::{CodecConfig, GenericBackend, MAX_CHUNK_ROWS};
use crate::error::{ColumnarError, Result};
use crate::types::Value;

/// Compression codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Codec {
    RunLength,
    Dictionary,
    Delta,
    Generic,
}

impl Codec {
    /// Tie-break order used by [`select_codec`]: cheaper decode first
    pub const PRIORITY: [Codec; 4] = [
        Codec::Dictionary,
        Codec::RunLength,
        Codec::Delta,
        Codec::Generic,
    ];

    /// Stable on-disk codec id
    pub fn id(self) -> u8 {
        match self {
            Codec::RunLength => 1,
            Codec::Dictionary => 2,
            Codec::Delta => 3,
            Codec::Generic => 4,
        }
    }

    pub fn from_id(id: u8) -> Result<Self> {
        match id {
            1 => Ok(Codec::RunLength),
            2 => Ok(Codec::Dictionary),
            3 => Ok(Codec::Delta),
            4 => Ok(Codec::Generic),
            other => Err(ColumnarError::CorruptData(format!("unknown codec id {}", other))),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Codec::RunLength => "run_length",
            Codec::Dictionary => "dictionary",
            Codec::Delta => "delta",
            Codec::Generic => "generic",
        }
    }

    /// Encode values. Empty input produces an empty buffer.
    pub fn compress(self, values: &[Value], config: &CodecConfig) -> Result<Vec<u8>> {
        if values.is_empty() {
            return Ok(Vec::new());
        }
        match self {
            Codec::RunLength => Ok(rle_encode(values)),
            Codec::Dictionary => Ok(dictionary_encode(values)),
            Codec::Delta => delta_encode(values),
            Codec::Generic => generic_encode(values, config),
        }
    }

    /// Decode a buffer produced by [`Codec::compress`] with the same codec.
    ///
    /// Buffers claiming more than [`MAX_CHUNK_ROWS`] values are corrupt.
    pub fn decompress(self, data: &[u8]) -> Result<Vec<Value>> {
        self.decode(data, MAX_CHUNK_ROWS)
    }

    /// Decode a buffer that must hold exactly `rows` values.
    ///
    /// Length fields are checked against `rows` before anything is
    /// allocated for them.
    pub fn decompress_rows(self, data: &[u8], rows: usize) -> Result<Vec<Value>> {
        let values = self.decode(data, rows)?;
        if values.len() != rows {
            return Err(ColumnarError::CorruptData(format!(
                "{} payload decoded {} rows, expected {}",
                self,
                values.len(),
                rows
            )));
        }
        Ok(values)
    }

    fn decode(self, data: &[u8], max_rows: usize) -> Result<Vec<Value>> {
        if data.is_empty() {
            return Ok(Vec::new());
        }
        match self {
            Codec::RunLength => rle_decode(data, max_rows),
            Codec::Dictionary => dictionary_decode(data, max_rows),
            Codec::Delta => delta_decode(data, max_rows),
            Codec::Generic => generic_decode(data, max_rows),
        }
    }

    /// Cheap heuristic used to short-list candidates
    pub fn is_suitable(self, values: &[Value], config: &CodecConfig) -> bool {
        match self {
            Codec::RunLength => {
                values.len() >= config.min_values
                    && (count_runs(values) as f64) < values.len() as f64 * config.max_run_ratio
            }
            Codec::Dictionary => {
                if values.len() < config.min_values {
                    return false;
                }
                // Stop counting once the ratio can no longer be met
                let limit = (values.len() as f64 * config.max_unique_ratio).ceil() as usize;
                let mut unique: HashSet<&Value> = HashSet::new();
                for value in values {
                    unique.insert(value);
                    if unique.len() > limit {
                        return false;
                    }
                }
                (unique.len() as f64 / values.len() as f64) < config.max_unique_ratio
            }
            Codec::Delta => {
                values.len() >= config.min_values
                    && numeric_kind(values).ok().flatten().is_some()
                    && mean_abs_delta(values)
                        .map(|mean| mean < config.max_mean_delta)
                        .unwrap_or(false)
            }
            Codec::Generic => true,
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Compression result
#[derive(Debug, Clone)]
pub struct CompressedData {
    pub codec: Codec,
    pub original_size: usize,
    pub compressed_size: usize,
    pub data: Vec<u8>,
}

impl CompressedData {
    /// uncompressed / compressed
    pub fn ratio(&self) -> f64 {
        compression_ratio(self.original_size, self.compressed_size)
    }
}

pub(crate) fn compression_ratio(uncompressed: usize, compressed: usize) -> f64 {
    match (uncompressed, compressed) {
        (0, 0) => 1.0,
        (u, 0) => u as f64,
        (u, c) => u as f64 / c as f64,
    }
}

// =============================================================================
// Auto-select Compression
// =============================================================================

/// Compress with every suitable codec and keep the best ratio.
///
/// Ties go to the earlier entry of [`Codec::PRIORITY`].
pub fn select_codec(values: &[Value], config: &CodecConfig) -> Result<CompressedData> {
    let original_size: usize = values.iter().map(Value::size_bytes).sum();
    let mut best: Option<(Codec, Vec<u8>)> = None;

    for codec in Codec::PRIORITY {
        if !codec.is_suitable(values, config) {
            continue;
        }
        let data = codec.compress(values, config)?;
        let better = match &best {
            Some((_, current)) => data.len() < current.len(),
            None => true,
        };
        if better {
            best = Some((codec, data));
        }
    }

    // Generic is always suitable, so a candidate exists
    let (codec, data) = match best {
        Some(found) => found,
        None => (Codec::Generic, Codec::Generic.compress(values, config)?),
    };

    Ok(CompressedData {
        codec,
        original_size,
        compressed_size: data.len(),
        data,
    })
}

// =============================================================================
// Run-Length Encoding (for long runs)
// =============================================================================

fn check_rows(codec: Codec, rows: usize, max_rows: usize) -> Result<()> {
    if rows > max_rows {
        return Err(ColumnarError::CorruptData(format!(
            "{} payload claims {} rows, limit {}",
            codec, rows, max_rows
        )));
    }
    Ok(())
}

fn count_runs(values: &[Value]) -> usize {
    if values.is_empty() {
        return 0;
    }
    1 + values.windows(2).filter(|w| w[0] != w[1]).count()
}

fn rle_encode(values: &[Value]) -> Vec<u8> {
    let mut runs: Vec<(&Value, u64)> = Vec::new();
    for value in values {
        if let Some((current, count)) = runs.last_mut() {
            if *current == value {
                *count += 1;
                continue;
            }
        }
        runs.push((value, 1));
    }

    let mut result = Vec::with_capacity(runs.len() * 4 + 4);
    encode_varint_unsigned(&mut result, runs.len() as u64);
    for (value, count) in runs {
        encode_value(&mut result, value);
        encode_varint_unsigned(&mut result, count);
    }
    result
}

fn rle_decode(data: &[u8], max_rows: usize) -> Result<Vec<Value>> {
    let mut reader = ByteReader::new(data);
    let run_count = reader.read_len()?;
    // A run is at least a tag byte and a count byte
    if run_count > reader.remaining() / 2 {
        return Err(ColumnarError::CorruptData(format!(
            "{} runs cannot fit in {} bytes",
            run_count,
            reader.remaining()
        )));
    }

    let mut result = Vec::new();
    let mut total = 0usize;
    for _ in 0..run_count {
        let value = decode_value(&mut reader)?;
        let count = reader.read_len()?;
        if count == 0 {
            return Err(ColumnarError::CorruptData("zero-length run".into()));
        }
        total = total.saturating_add(count);
        check_rows(Codec::RunLength, total, max_rows)?;
        result.extend(std::iter::repeat(value).take(count));
    }

    reader.finish()?;
    Ok(result)
}

// =============================================================================
// Dictionary Encoding (for low cardinality)
// =============================================================================

/// Dictionary encoder, ids assigned in first-occurrence order
pub struct DictionaryEncoder<'a> {
    dict: Vec<&'a Value>,
    index: HashMap<&'a Value, u32>,
}

impl<'a> DictionaryEncoder<'a> {
    pub fn new() -> Self {
        Self {
            dict: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Encode a value, returns dictionary index
    pub fn encode(&mut self, value: &'a Value) -> u32 {
        if let Some(&idx) = self.index.get(value) {
            idx
        } else {
            let idx = self.dict.len() as u32;
            self.dict.push(value);
            self.index.insert(value, idx);
            idx
        }
    }

    /// Get the dictionary
    pub fn dictionary(&self) -> &[&'a Value] {
        &self.dict
    }
}

impl Default for DictionaryEncoder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

fn bits_for(dict_len: usize) -> u8 {
    if dict_len <= 2 {
        1
    } else {
        (usize::BITS - (dict_len - 1).leading_zeros()) as u8
    }
}

fn dictionary_encode(values: &[Value]) -> Vec<u8> {
    let mut encoder = DictionaryEncoder::new();
    let ids: Vec<u32> = values.iter().map(|v| encoder.encode(v)).collect();
    let dict = encoder.dictionary();
    let bits = bits_for(dict.len());

    let mut result = Vec::new();
    encode_varint_unsigned(&mut result, dict.len() as u64);
    for value in dict {
        encode_value(&mut result, value);
    }
    encode_varint_unsigned(&mut result, ids.len() as u64);
    result.push(bits);
    result.extend_from_slice(&bitpack_u32(&ids, bits));
    result
}

fn dictionary_decode(data: &[u8], max_rows: usize) -> Result<Vec<Value>> {
    let mut reader = ByteReader::new(data);
    let dict_len = reader.read_len()?;
    let mut dict = Vec::with_capacity(dict_len.min(data.len()));
    for _ in 0..dict_len {
        dict.push(decode_value(&mut reader)?);
    }

    let count = reader.read_len()?;
    check_rows(Codec::Dictionary, count, max_rows)?;
    let bits = reader.read_u8()?;
    if bits == 0 || bits > 32 {
        return Err(ColumnarError::CorruptData(format!("invalid bit width {}", bits)));
    }
    let packed_len = (count * bits as usize + 7) / 8;
    let ids = bitunpack_u32(reader.read_bytes(packed_len)?, bits, count)?;
    reader.finish()?;

    ids.into_iter()
        .map(|id| {
            dict.get(id as usize).cloned().ok_or_else(|| {
                ColumnarError::CorruptData(format!("dictionary id {} out of range", id))
            })
        })
        .collect()
}

// =============================================================================
// Bit-Packing (for dictionary ids)
// =============================================================================

/// Bit-pack u32 values with given bit width (1..=32)
pub fn bitpack_u32(values: &[u32], bits: u8) -> Vec<u8> {
    let bits = bits as u32;
    let mask = if bits == 32 { u32::MAX as u64 } else { (1u64 << bits) - 1 };
    let mut result = Vec::with_capacity((values.len() * bits as usize + 7) / 8);
    let mut acc: u64 = 0;
    let mut filled: u32 = 0;

    for &val in values {
        acc |= (val as u64 & mask) << filled;
        filled += bits;
        while filled >= 8 {
            result.push(acc as u8);
            acc >>= 8;
            filled -= 8;
        }
    }
    if filled > 0 {
        result.push(acc as u8);
    }

    result
}

/// Unpack bit-packed u32 values
pub fn bitunpack_u32(data: &[u8], bits: u8, count: usize) -> Result<Vec<u32>> {
    if bits == 0 || bits > 32 {
        return Err(ColumnarError::CorruptData(format!("invalid bit width {}", bits)));
    }
    let bits = bits as u32;
    let expected = count
        .checked_mul(bits as usize)
        .map(|total| (total + 7) / 8)
        .ok_or_else(|| ColumnarError::CorruptData(format!("{} bit-packed values", count)))?;
    if data.len() != expected {
        return Err(ColumnarError::CorruptData(format!(
            "bit-packed length {} does not hold {} values of {} bits",
            data.len(),
            count,
            bits
        )));
    }

    let mask = if bits == 32 { u32::MAX as u64 } else { (1u64 << bits) - 1 };
    let mut result = Vec::with_capacity(count);
    let mut bytes = data.iter();
    let mut acc: u64 = 0;
    let mut available: u32 = 0;

    for _ in 0..count {
        while available < bits {
            let byte = bytes
                .next()
                .ok_or_else(|| ColumnarError::CorruptData("bit-packed data truncated".into()))?;
            acc |= (*byte as u64) << available;
            available += 8;
        }
        result.push((acc & mask) as u32);
        acc >>= bits;
        available -= bits;
    }

    Ok(result)
}

// =============================================================================
// Delta Encoding (for slowly changing numerics)
// =============================================================================

const DELTA_INTEGER: u8 = 0;
const DELTA_FLOAT: u8 = 1;

/// Numeric variant shared by every non-null value.
///
/// `Ok(None)` when every value is null, `UnsupportedType` for text, booleans
/// or a mix of integers and floats.
fn numeric_kind(values: &[Value]) -> Result<Option<u8>> {
    let mut kind = None;
    for value in values {
        let this = match value {
            Value::Null => continue,
            Value::Integer(_) => DELTA_INTEGER,
            Value::Float(_) => DELTA_FLOAT,
            other => {
                return Err(ColumnarError::UnsupportedType(format!(
                    "delta codec requires numeric values, found {}",
                    other.type_name()
                )))
            }
        };
        match kind {
            None => kind = Some(this),
            Some(k) if k != this => {
                return Err(ColumnarError::UnsupportedType(
                    "delta codec requires a single numeric type".into(),
                ))
            }
            _ => {}
        }
    }
    Ok(kind)
}

fn mean_abs_delta(values: &[Value]) -> Option<f64> {
    let numbers: Vec<f64> = values.iter().filter_map(Value::as_f64).collect();
    if numbers.len() < 2 {
        return Some(0.0);
    }
    let total: f64 = numbers.windows(2).map(|w| (w[1] - w[0]).abs()).sum();
    let mean = total / (numbers.len() - 1) as f64;
    mean.is_finite().then_some(mean)
}

fn delta_encode(values: &[Value]) -> Result<Vec<u8>> {
    let kind = numeric_kind(values)?.unwrap_or(DELTA_INTEGER);
    let has_nulls = values.iter().any(Value::is_null);

    let mut result = Vec::with_capacity(values.len() * 2 + 16);
    result.push(kind);
    encode_varint_unsigned(&mut result, values.len() as u64);
    result.push(has_nulls as u8);
    if has_nulls {
        let mut bitmap = vec![0u8; (values.len() + 7) / 8];
        for (i, value) in values.iter().enumerate() {
            if !value.is_null() {
                bitmap[i / 8] |= 1 << (i % 8);
            }
        }
        result.extend_from_slice(&bitmap);
    }

    // Floats are delta'd over their bit patterns so the round trip is exact
    let raw: Vec<i64> = values
        .iter()
        .filter_map(|v| match v {
            Value::Integer(i) => Some(*i),
            Value::Float(f) => Some(f.to_bits() as i64),
            _ => None,
        })
        .collect();

    if let Some((&first, rest)) = raw.split_first() {
        result.extend_from_slice(&first.to_le_bytes());
        let mut prev = first;
        for &val in rest {
            encode_varint_signed(&mut result, val.wrapping_sub(prev));
            prev = val;
        }
    }

    Ok(result)
}

fn delta_decode(data: &[u8], max_rows: usize) -> Result<Vec<Value>> {
    let mut reader = ByteReader::new(data);
    let kind = reader.read_u8()?;
    if kind != DELTA_INTEGER && kind != DELTA_FLOAT {
        return Err(ColumnarError::CorruptData(format!("unknown delta kind {}", kind)));
    }
    let count = reader.read_len()?;
    check_rows(Codec::Delta, count, max_rows)?;
    let has_nulls = match reader.read_u8()? {
        0 => false,
        1 => true,
        other => {
            return Err(ColumnarError::CorruptData(format!("invalid null flag {}", other)))
        }
    };
    let bitmap = if has_nulls {
        Some(reader.read_bytes((count + 7) / 8)?)
    } else {
        None
    };
    let is_valid = |i: usize| bitmap.map_or(true, |b| b[i / 8] & (1 << (i % 8)) != 0);
    let non_null = (0..count).filter(|&i| is_valid(i)).count();
    // First value is 8 bytes, every delta at least one
    if non_null > 0 && reader.remaining() < 8 + (non_null - 1) {
        return Err(ColumnarError::CorruptData(format!(
            "{} delta values cannot fit in {} bytes",
            non_null,
            reader.remaining()
        )));
    }

    let mut raw = Vec::with_capacity(non_null);
    if non_null > 0 {
        let mut prev = reader.read_i64()?;
        raw.push(prev);
        for _ in 1..non_null {
            prev = prev.wrapping_add(reader.read_varint_signed()?);
            raw.push(prev);
        }
    }
    reader.finish()?;

    let mut raw = raw.into_iter();
    let mut result = Vec::with_capacity(count);
    for i in 0..count {
        if !is_valid(i) {
            result.push(Value::Null);
            continue;
        }
        let bits = raw
            .next()
            .ok_or_else(|| ColumnarError::CorruptData("delta values truncated".into()))?;
        result.push(if kind == DELTA_FLOAT {
            Value::Float(f64::from_bits(bits as u64))
        } else {
            Value::Integer(bits)
        });
    }
    Ok(result)
}

// =============================================================================
// Generic Compression (bincode + LZ4/Zstd)
// =============================================================================

const GENERIC_LZ4: u8 = 0;
const GENERIC_ZSTD: u8 = 1;

fn generic_encode(values: &[Value], config: &CodecConfig) -> Result<Vec<u8>> {
    let serialized = bincode::serialize(values)
        .map_err(|e| ColumnarError::UnsupportedType(e.to_string()))?;

    let mut result = Vec::new();
    match config.generic {
        GenericBackend::Lz4 => {
            result.push(GENERIC_LZ4);
            result.extend_from_slice(&lz4_flex::compress_prepend_size(&serialized));
        }
        GenericBackend::Zstd => {
            result.push(GENERIC_ZSTD);
            let compressed = zstd::encode_all(&serialized[..], config.zstd_level)
                .map_err(|e| ColumnarError::UnsupportedType(e.to_string()))?;
            result.extend_from_slice(&compressed);
        }
    }
    Ok(result)
}

/// An LZ4 block never expands by more than this factor
const LZ4_MAX_EXPANSION: usize = 255;

/// Upper bound on a decoded generic payload
const MAX_GENERIC_BYTES: usize = u32::MAX as usize;

fn generic_decode(data: &[u8], max_rows: usize) -> Result<Vec<Value>> {
    let (backend, body) = data
        .split_first()
        .ok_or_else(|| ColumnarError::CorruptData("missing generic backend tag".into()))?;

    let serialized = match *backend {
        GENERIC_LZ4 => lz4_decode(body)?,
        GENERIC_ZSTD => zstd_decode(body)?,
        other => {
            return Err(ColumnarError::CorruptData(format!(
                "unknown generic backend {}",
                other
            )))
        }
    };

    let values: Vec<Value> = bincode::deserialize(&serialized)?;
    check_rows(Codec::Generic, values.len(), max_rows)?;
    Ok(values)
}

/// Inverse of `lz4_flex::compress_prepend_size`, validating the size prefix
fn lz4_decode(body: &[u8]) -> Result<Vec<u8>> {
    let mut reader = ByteReader::new(body);
    let size = reader.read_u32()? as usize;
    let block = reader.rest();
    if size > block.len().saturating_mul(LZ4_MAX_EXPANSION) {
        return Err(ColumnarError::CorruptData(format!(
            "lz4 size prefix {} impossible for a {} byte block",
            size,
            block.len()
        )));
    }
    let decoded = lz4_flex::decompress(block, size)
        .map_err(|e| ColumnarError::CorruptData(format!("lz4: {}", e)))?;
    if decoded.len() != size {
        return Err(ColumnarError::CorruptData(format!(
            "lz4 decoded {} bytes, expected {}",
            decoded.len(),
            size
        )));
    }
    Ok(decoded)
}

fn zstd_decode(body: &[u8]) -> Result<Vec<u8>> {
    let mut decoded = Vec::new();
    zstd::stream::read::Decoder::new(body)
        .and_then(|decoder| {
            decoder
                .take(MAX_GENERIC_BYTES as u64 + 1)
                .read_to_end(&mut decoded)
        })
        .map_err(|e| ColumnarError::CorruptData(format!("zstd: {}", e)))?;
    if decoded.len() > MAX_GENERIC_BYTES {
        return Err(ColumnarError::CorruptData(format!(
            "zstd payload exceeds {} bytes",
            MAX_GENERIC_BYTES
        )));
    }
    Ok(decoded)
}

// =============================================================================
// Value Encoding
// =============================================================================

const TAG_NULL: u8 = 0;
const TAG_INTEGER: u8 = 1;
const TAG_FLOAT: u8 = 2;
const TAG_TEXT: u8 = 3;
const TAG_FALSE: u8 = 4;
const TAG_TRUE: u8 = 5;

/// Tag byte followed by a variant-specific payload
pub(crate) fn encode_value(output: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Null => output.push(TAG_NULL),
        Value::Integer(v) => {
            output.push(TAG_INTEGER);
            encode_varint_signed(output, *v);
        }
        Value::Float(v) => {
            output.push(TAG_FLOAT);
            output.extend_from_slice(&v.to_bits().to_le_bytes());
        }
        Value::Text(s) => {
            output.push(TAG_TEXT);
            encode_varint_unsigned(output, s.len() as u64);
            output.extend_from_slice(s.as_bytes());
        }
        Value::Boolean(false) => output.push(TAG_FALSE),
        Value::Boolean(true) => output.push(TAG_TRUE),
    }
}

pub(crate) fn decode_value(reader: &mut ByteReader<'_>) -> Result<Value> {
    match reader.read_u8()? {
        TAG_NULL => Ok(Value::Null),
        TAG_INTEGER => Ok(Value::Integer(reader.read_varint_signed()?)),
        TAG_FLOAT => Ok(Value::Float(f64::from_bits(reader.read_u64()?))),
        TAG_TEXT => {
            let len = reader.read_len()?;
            let bytes = reader.read_bytes(len)?;
            let text = std::str::from_utf8(bytes)
                .map_err(|e| ColumnarError::CorruptData(format!("invalid utf-8: {}", e)))?;
            Ok(Value::Text(text.to_string()))
        }
        TAG_FALSE => Ok(Value::Boolean(false)),
        TAG_TRUE => Ok(Value::Boolean(true)),
        other => Err(ColumnarError::CorruptData(format!("unknown value tag {}", other))),
    }
}

// =============================================================================
// Variable-length Integer Encoding
// =============================================================================

pub(crate) fn encode_varint_signed(output: &mut Vec<u8>, value: i64) {
    // ZigZag encoding
    let zigzag = ((value << 1) ^ (value >> 63)) as u64;
    encode_varint_unsigned(output, zigzag);
}

pub(crate) fn encode_varint_unsigned(output: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        output.push((value as u8) | 0x80);
        value >>= 7;
    }
    output.push(value as u8);
}

/// Bounds-checked cursor over an encoded buffer
pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub(crate) fn peek_u8(&self) -> Result<u8> {
        self.data.get(self.pos).copied().ok_or_else(|| {
            ColumnarError::CorruptData(format!("buffer truncated at offset {}", self.pos))
        })
    }

    pub(crate) fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| {
                ColumnarError::CorruptData(format!(
                    "buffer truncated: need {} bytes at offset {}, have {}",
                    len,
                    self.pos,
                    self.data.len()
                ))
            })?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Consume everything left
    pub(crate) fn rest(&mut self) -> &'a [u8] {
        let rest = &self.data[self.pos..];
        self.pos = self.data.len();
        rest
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16> {
        let mut buf = [0u8; 2];
        buf.copy_from_slice(self.read_bytes(2)?);
        Ok(u16::from_le_bytes(buf))
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.read_bytes(4)?);
        Ok(u32::from_le_bytes(buf))
    }

    pub(crate) fn read_u64(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.read_bytes(8)?);
        Ok(u64::from_le_bytes(buf))
    }

    pub(crate) fn read_i64(&mut self) -> Result<i64> {
        Ok(self.read_u64()? as i64)
    }

    pub(crate) fn read_varint_unsigned(&mut self) -> Result<u64> {
        let mut value = 0u64;
        let mut shift = 0u32;
        loop {
            let b = self.read_u8()?;
            if shift >= 64 {
                return Err(ColumnarError::CorruptData("varint overflow".into()));
            }
            value |= ((b & 0x7F) as u64) << shift;
            if b < 0x80 {
                return Ok(value);
            }
            shift += 7;
        }
    }

    pub(crate) fn read_varint_signed(&mut self) -> Result<i64> {
        let zigzag = self.read_varint_unsigned()?;
        Ok(((zigzag >> 1) as i64) ^ -((zigzag & 1) as i64))
    }

    /// Varint used as a length or count
    pub(crate) fn read_len(&mut self) -> Result<usize> {
        let len = self.read_varint_unsigned()?;
        usize::try_from(len)
            .ok()
            .filter(|&len| len <= u32::MAX as usize)
            .ok_or_else(|| ColumnarError::CorruptData(format!("length {} out of range", len)))
    }

    /// Fail if bytes remain
    pub(crate) fn finish(&self) -> Result<()> {
        if self.pos == self.data.len() {
            Ok(())
        } else {
            Err(ColumnarError::CorruptData(format!(
                "{} trailing bytes",
                self.data.len() - self.pos
            )))
        }
    }
}
