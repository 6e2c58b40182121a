//! Cell values and column kinds.
//!
//! `Value::Absent` is a first-class missing value rather than a sentinel of a
//! concrete kind. Every operation documents how it propagates absents.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Declared kind of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Boolean,
    Integer,
    Real,
    Text,
    Factor,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Kind::Boolean => "boolean",
            Kind::Integer => "integer",
            Kind::Real => "real",
            Kind::Text => "text",
            Kind::Factor => "factor",
        };
        f.write_str(s)
    }
}

/// A single cell.
///
/// `Code` only appears inside factor columns, where it indexes the column's
/// level set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    Absent,
    Bool(bool),
    Int(i64),
    Real(f64),
    Text(String),
    Code(u32),
}

/// Ordered tuple of key-column values identifying a group or a join partner.
pub type KeyTuple = Vec<Value>;

impl Value {
    /// Kind of a present value; `None` for absent.
    pub fn kind(&self) -> Option<Kind> {
        match self {
            Value::Absent => None,
            Value::Bool(_) => Some(Kind::Boolean),
            Value::Int(_) => Some(Kind::Integer),
            Value::Real(_) => Some(Kind::Real),
            Value::Text(_) => Some(Kind::Text),
            Value::Code(_) => Some(Kind::Factor),
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    /// Numeric view used by reducers. Booleans count as 0/1.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Int(i) => Some(*i as f64),
            Value::Real(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// `-0.0` becomes `0.0`; every other value is returned as is.
    pub fn normalized(self) -> Self {
        match self {
            Value::Real(r) => Value::Real(unsigned_zero(r)),
            other => other,
        }
    }

    /// Total order: absents first, numbers by magnitude across integer and
    /// real, then by value within a kind, then by kind.
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        use Value::*;
        match (self, other) {
            (Absent, Absent) => Ordering::Equal,
            (Absent, _) => Ordering::Less,
            (_, Absent) => Ordering::Greater,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Int(a), Int(b)) => a.cmp(b),
            (Real(a), Real(b)) => unsigned_zero(*a).total_cmp(&unsigned_zero(*b)),
            // Ties (3 vs 3.0) fall back to kind so the order stays total.
            (Int(a), Real(b)) => (*a as f64)
                .total_cmp(&unsigned_zero(*b))
                .then(Ordering::Less),
            (Real(a), Int(b)) => unsigned_zero(*a)
                .total_cmp(&(*b as f64))
                .then(Ordering::Greater),
            (Text(a), Text(b)) => a.cmp(b),
            (Code(a), Code(b)) => a.cmp(b),
            _ => variant_order(self).cmp(&variant_order(other)),
        }
    }
}

fn variant_order(v: &Value) -> u8 {
    match v {
        Value::Absent => 0,
        Value::Bool(_) => 1,
        Value::Int(_) => 2,
        Value::Real(_) => 3,
        Value::Text(_) => 4,
        Value::Code(_) => 5,
    }
}

// -0.0 and 0.0 are the same key.
fn unsigned_zero(r: f64) -> f64 {
    if r == 0.0 {
        0.0
    } else {
        r
    }
}

fn real_bits(r: f64) -> u64 {
    unsigned_zero(r).to_bits()
}

/// Structural equality: two absents are equal, reals compare bitwise.
///
/// Join key matching does not use this directly; it excludes absent keys
/// before comparing.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Absent, Absent) => true,
            (Bool(a), Bool(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Real(a), Real(b)) => real_bits(*a) == real_bits(*b),
            (Text(a), Text(b)) => a == b,
            (Code(a), Code(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        variant_order(self).hash(state);
        match self {
            Value::Absent => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(i) => i.hash(state),
            Value::Real(r) => real_bits(*r).hash(state),
            Value::Text(s) => s.hash(state),
            Value::Code(c) => c.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Absent => f.write_str("NA"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Real(r) => write!(f, "{r}"),
            Value::Text(s) => f.write_str(s),
            Value::Code(c) => write!(f, "#{c}"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Absent)
    }
}
