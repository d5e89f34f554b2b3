//! Core types for the columnar engine
//!
//! `Value` is the tagged scalar every other component works with. Ordering
//! rules:
//!
//! - `Null` sorts below every non-null value.
//! - Same-variant values compare natively. Floats use IEEE total ordering so
//!   NaN has a position and survives a codec round trip bit-for-bit.
//! - `Integer` and `Float` compare numerically with each other.
//! - Any other cross-variant pair is incomparable and [`Value::compare`]
//!   returns `None`. Incomparable is never treated as equal.
//!
//! Equality (`PartialEq`) is structural: `Integer(1) != Float(1.0)`, and
//! floats are equal only when their bit patterns are.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Column data types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Integer,
    Float,
    Text,
    Boolean,
}

impl DataType {
    /// Human readable type name
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Integer => "Integer",
            DataType::Float => "Float",
            DataType::Text => "Text",
            DataType::Boolean => "Boolean",
        }
    }

    /// Whether a value may be stored in a column of this type
    pub fn accepts(&self, value: &Value) -> bool {
        match value.data_type() {
            None => true,
            Some(dt) => dt == *self,
        }
    }

    /// Is this a numeric type?
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Integer | DataType::Float)
    }

    pub(crate) fn to_u8(self) -> u8 {
        match self {
            DataType::Integer => 0,
            DataType::Float => 1,
            DataType::Text => 2,
            DataType::Boolean => 3,
        }
    }

    pub(crate) fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(DataType::Integer),
            1 => Some(DataType::Float),
            2 => Some(DataType::Text),
            3 => Some(DataType::Boolean),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single cell value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Text(String),
    Boolean(bool),
    Null,
}

impl Value {
    /// Compare two values under the engine ordering.
    ///
    /// Returns `None` for incomparable variant pairs (e.g. Integer vs Text).
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Null, _) => Some(Ordering::Less),
            (_, Value::Null) => Some(Ordering::Greater),
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => Some(a.total_cmp(b)),
            (Value::Integer(a), Value::Float(b)) => Some(cmp_numeric(*a as f64, *b)),
            (Value::Float(a), Value::Integer(b)) => Some(cmp_numeric(*a, *b as f64)),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Data type of a non-null value
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Integer(_) => Some(DataType::Integer),
            Value::Float(_) => Some(DataType::Float),
            Value::Text(_) => Some(DataType::Text),
            Value::Boolean(_) => Some(DataType::Boolean),
            Value::Null => None,
        }
    }

    /// Variant name, used in error messages
    pub fn type_name(&self) -> &'static str {
        self.data_type().map(|dt| dt.name()).unwrap_or("Null")
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Float(_))
    }

    /// Numeric coercion used by Sum/Average
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Uncompressed footprint used for compression ratios
    pub fn size_bytes(&self) -> usize {
        match self {
            Value::Integer(_) | Value::Float(_) => 8,
            Value::Boolean(_) => 1,
            Value::Text(s) => s.len(),
            Value::Null => 0,
        }
    }

    /// 64-bit fingerprint used for approximate distinct counting
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = xxhash_rust::xxh3::Xxh3::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

fn cmp_numeric(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or_else(|| a.total_cmp(&b))
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Null, Value::Null) => true,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::Integer(v) => {
                state.write_u8(0);
                v.hash(state);
            }
            Value::Float(v) => {
                state.write_u8(1);
                v.to_bits().hash(state);
            }
            Value::Text(s) => {
                state.write_u8(2);
                s.hash(state);
            }
            Value::Boolean(b) => {
                state.write_u8(3);
                b.hash(state);
            }
            Value::Null => state.write_u8(4),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "{:?}", s),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Null => f.write_str("NULL"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_sorts_first() {
        assert_eq!(Value::Null.compare(&Value::Integer(i64::MIN)), Some(Ordering::Less));
        assert_eq!(Value::Text("".into()).compare(&Value::Null), Some(Ordering::Greater));
        assert_eq!(Value::Null.compare(&Value::Null), Some(Ordering::Equal));
    }

    #[test]
    fn test_numeric_family_compares() {
        assert_eq!(Value::Integer(2).compare(&Value::Float(1.5)), Some(Ordering::Greater));
        assert_eq!(Value::Float(3.0).compare(&Value::Integer(3)), Some(Ordering::Equal));
        // Structural equality stays variant-exact
        assert_ne!(Value::Float(3.0), Value::Integer(3));
    }

    #[test]
    fn test_cross_type_is_incomparable() {
        assert_eq!(Value::Integer(1).compare(&Value::Text("1".into())), None);
        assert_eq!(Value::Boolean(true).compare(&Value::Integer(1)), None);
        assert_eq!(Value::Float(0.0).compare(&Value::Boolean(false)), None);
    }

    #[test]
    fn test_float_equality_is_bitwise() {
        assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
        assert_ne!(Value::Float(0.0), Value::Float(-0.0));
        assert_eq!(
            Value::Float(f64::NAN).compare(&Value::Float(1.0)),
            Some(Ordering::Greater)
        );
    }

    #[test]
    fn test_data_type_accepts() {
        assert!(DataType::Integer.accepts(&Value::Integer(1)));
        assert!(DataType::Integer.accepts(&Value::Null));
        assert!(!DataType::Integer.accepts(&Value::Float(1.0)));
        assert!(!DataType::Text.accepts(&Value::Boolean(true)));
    }

    #[test]
    fn test_fingerprint_distinguishes_variants() {
        assert_ne!(Value::Integer(1).fingerprint(), Value::Boolean(true).fingerprint());
        assert_eq!(Value::from("a").fingerprint(), Value::Text("a".into()).fingerprint());
    }
}
