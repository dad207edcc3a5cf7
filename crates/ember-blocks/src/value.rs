use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A script-level value: block parameters, context variables and script
/// globals all hold these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
}

impl Value {
    /// Truthiness used by conditions: null, false, zero and empty
    /// strings/lists are false.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
        }
    }

    /// Numeric view, parsing strings when they look like numbers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            Value::Str(s) => s.trim().parse().ok(),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Float(f) => Some(*f as i64),
            Value::Str(s) => s.trim().parse().ok(),
            Value::Bool(b) => Some(if *b { 1 } else { 0 }),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Compare against another value with the given comparator.
    ///
    /// Equality is numeric-aware (3 == 3.0); ordering comparisons require
    /// both sides to be numeric and are false otherwise; `Contains` checks
    /// substrings for strings and membership for lists.
    pub fn compare(&self, op: Comparator, other: &Value) -> bool {
        match op {
            Comparator::Equals => self.loose_eq(other),
            Comparator::NotEquals => !self.loose_eq(other),
            Comparator::Greater => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a > b,
                _ => false,
            },
            Comparator::Less => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a < b,
                _ => false,
            },
            Comparator::Contains => match self {
                Value::Str(s) => other.as_str().map(|needle| s.contains(needle)).unwrap_or(false),
                Value::List(items) => items.iter().any(|item| item.loose_eq(other)),
                _ => false,
            },
        }
    }

    fn loose_eq(&self, other: &Value) -> bool {
        if let (Some(a), Some(b)) = (self.as_f64(), other.as_f64()) {
            if !matches!((self, other), (Value::Str(_), Value::Str(_))) {
                return a == b;
            }
        }
        self == other
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{}", s),
            Value::List(items) => {
                let rendered = items
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{}", rendered)
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// Comparison operator shared by condition blocks and loop stop conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Equals,
    NotEquals,
    Greater,
    Less,
    Contains,
}

impl FromStr for Comparator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "equals" => Ok(Comparator::Equals),
            "not_equals" => Ok(Comparator::NotEquals),
            "greater" => Ok(Comparator::Greater),
            "less" => Ok(Comparator::Less),
            "contains" => Ok(Comparator::Contains),
            other => Err(format!("unknown comparator: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.truthy());
        assert!(!Value::Int(0).truthy());
        assert!(Value::Int(-1).truthy());
        assert!(!Value::Str(String::new()).truthy());
        assert!(Value::Str("x".into()).truthy());
    }

    #[test]
    fn test_numeric_equality_crosses_types() {
        assert!(Value::Int(3).compare(Comparator::Equals, &Value::Float(3.0)));
        assert!(Value::Str("3".into()).compare(Comparator::Equals, &Value::Int(3)));
        assert!(Value::Str("a".into()).compare(Comparator::NotEquals, &Value::Str("b".into())));
    }

    #[test]
    fn test_ordering_requires_numbers() {
        assert!(Value::Int(5).compare(Comparator::Greater, &Value::Int(4)));
        assert!(!Value::Str("abc".into()).compare(Comparator::Greater, &Value::Int(1)));
    }

    #[test]
    fn test_contains() {
        assert!(Value::Str("hello world".into()).compare(Comparator::Contains, &Value::from("wor")));
        let list = Value::List(vec![Value::Int(1), Value::Int(2)]);
        assert!(list.compare(Comparator::Contains, &Value::Int(2)));
        assert!(!list.compare(Comparator::Contains, &Value::Int(3)));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Int(3).to_string(), "3");
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(
            Value::List(vec![Value::Int(1), Value::from("a")]).to_string(),
            "1, a"
        );
    }
}
