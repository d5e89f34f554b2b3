//! Filter predicates and zone-map style skip checks

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::types::Value;

/// Condition applied to a single column value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    Equal(Value),
    GreaterThan(Value),
    LessThan(Value),
    /// Substring match, Text only
    Contains(String),
}

impl Condition {
    /// Evaluate against one value.
    ///
    /// A Null on either side never matches, and neither does an
    /// incomparable pair (e.g. Integer vs Text).
    pub fn matches(&self, value: &Value) -> bool {
        if value.is_null() {
            return false;
        }
        match self {
            Condition::Equal(target) => {
                !target.is_null() && value.compare(target) == Some(Ordering::Equal)
            }
            Condition::GreaterThan(target) => {
                !target.is_null() && value.compare(target) == Some(Ordering::Greater)
            }
            Condition::LessThan(target) => {
                !target.is_null() && value.compare(target) == Some(Ordering::Less)
            }
            Condition::Contains(needle) => value
                .as_str()
                .map(|s| s.contains(needle.as_str()))
                .unwrap_or(false),
        }
    }

    /// Whether min/max statistics can ever rule this condition out
    pub fn supports_skipping(&self) -> bool {
        !matches!(self, Condition::Contains(_))
    }

    /// Returns true only if `[min, max]` proves no value can match.
    ///
    /// Conservative: missing statistics, Null targets, incomparable types
    /// and `Contains` all return false.
    pub fn can_skip(&self, min: Option<&Value>, max: Option<&Value>) -> bool {
        let (Some(min), Some(max)) = (min, max) else {
            return false;
        };
        match self {
            Condition::Equal(target) if !target.is_null() => {
                target.compare(min) == Some(Ordering::Less)
                    || target.compare(max) == Some(Ordering::Greater)
            }
            Condition::GreaterThan(target) if !target.is_null() => matches!(
                max.compare(target),
                Some(Ordering::Less) | Some(Ordering::Equal)
            ),
            Condition::LessThan(target) if !target.is_null() => matches!(
                min.compare(target),
                Some(Ordering::Greater) | Some(Ordering::Equal)
            ),
            _ => false,
        }
    }
}

/// A condition bound to the column it is evaluated on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub column: String,
    pub condition: Condition,
}

impl Filter {
    pub fn new(column: impl Into<String>, condition: Condition) -> Self {
        Self {
            column: column.into(),
            condition,
        }
    }

    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, Condition::Equal(value.into()))
    }

    pub fn gt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, Condition::GreaterThan(value.into()))
    }

    pub fn lt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, Condition::LessThan(value.into()))
    }

    pub fn contains(column: impl Into<String>, needle: impl Into<String>) -> Self {
        Self::new(column, Condition::Contains(needle.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches() {
        assert!(Condition::Equal(Value::Integer(5)).matches(&Value::Integer(5)));
        assert!(Condition::Equal(Value::Float(5.0)).matches(&Value::Integer(5)));
        assert!(Condition::GreaterThan(Value::Integer(5)).matches(&Value::Integer(6)));
        assert!(!Condition::GreaterThan(Value::Integer(5)).matches(&Value::Integer(5)));
        assert!(Condition::LessThan(Value::from("m")).matches(&Value::from("a")));
        assert!(Condition::Contains("ell".into()).matches(&Value::from("hello")));
    }

    #[test]
    fn test_nulls_and_incomparable_never_match() {
        assert!(!Condition::Equal(Value::Null).matches(&Value::Null));
        assert!(!Condition::LessThan(Value::Integer(5)).matches(&Value::Null));
        assert!(!Condition::Equal(Value::Integer(1)).matches(&Value::from("1")));
        assert!(!Condition::Contains("1".into()).matches(&Value::Integer(1)));
    }

    #[test]
    fn test_zone_map_skip() {
        let min = Value::Integer(18);
        let max = Value::Integer(65);
        let skip = |c: Condition| c.can_skip(Some(&min), Some(&max));

        // Might match
        assert!(!skip(Condition::Equal(Value::Integer(30))));
        assert!(!skip(Condition::GreaterThan(Value::Integer(10))));
        assert!(!skip(Condition::LessThan(Value::Integer(19))));

        // Provably empty
        assert!(skip(Condition::Equal(Value::Integer(17))));
        assert!(skip(Condition::Equal(Value::Integer(66))));
        assert!(skip(Condition::GreaterThan(Value::Integer(65))));
        assert!(skip(Condition::LessThan(Value::Integer(18))));
    }

    #[test]
    fn test_skip_is_conservative() {
        let min = Value::Integer(0);
        let max = Value::Integer(50);
        assert!(!Condition::Contains("x".into()).can_skip(Some(&min), Some(&max)));
        assert!(!Condition::GreaterThan(Value::from("z")).can_skip(Some(&min), Some(&max)));
        assert!(!Condition::Equal(Value::Null).can_skip(Some(&min), Some(&max)));
        assert!(!Condition::GreaterThan(Value::Integer(100)).can_skip(None, None));
    }
}
