//! Typed column storage.
//!
//! Every non-absent value in a column matches the column's declared kind.
//! Factor columns additionally carry a closed, ordered level set and store
//! `Value::Code` indices into it; a code outside `[0, levels)` is never
//! stored. Construction validates all of this up front, so a `Column` value
//! that exists is always well-formed.

use indexmap::IndexSet;
use serde::{Serialize, Serializer};

use crate::error::{Error, Result};
use crate::value::{Kind, Value};

/// Closed, ordered set of factor labels.
///
/// Each level also keeps the value it stands for, so decoding gives back
/// the original kind. Levels built from plain labels stand for text.
#[derive(Debug, Clone, Default)]
pub struct Levels {
    labels: IndexSet<String>,
    values: Vec<Value>,
}

impl Levels {
    /// Build a text level set; repeated labels fail with `DuplicateLevel`.
    pub fn new<I, S>(labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_values(labels.into_iter().map(|l| Value::Text(l.into())))
    }

    /// Build a level set from the values the levels stand for, labelled by
    /// display form. Two values with the same label fail with
    /// `DuplicateLevel`.
    pub fn from_values<I>(values: I) -> Result<Self>
    where
        I: IntoIterator<Item = Value>,
    {
        let mut labels = IndexSet::new();
        let mut kept = Vec::new();
        for value in values {
            if matches!(value, Value::Absent | Value::Code(_)) {
                return Err(Error::Invariant(format!("'{value}' cannot be a factor level")));
            }
            let value = value.normalized();
            let label = value.to_string();
            if labels.contains(&label) {
                return Err(Error::DuplicateLevel(label));
            }
            labels.insert(label);
            kept.push(value);
        }
        Ok(Self {
            labels,
            values: kept,
        })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn label(&self, code: u32) -> Option<&str> {
        self.labels.get_index(code as usize).map(String::as_str)
    }

    /// Value that level `code` stands for.
    pub fn value(&self, code: u32) -> Option<&Value> {
        self.values.get(code as usize)
    }

    pub fn code_of(&self, label: &str) -> Option<u32> {
        self.labels.get_index_of(label).map(|i| i as u32)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.labels.iter().cloned().collect()
    }
}

// Order matters for levels; IndexSet's own equality ignores it.
impl PartialEq for Levels {
    fn eq(&self, other: &Self) -> bool {
        self.labels.iter().eq(other.labels.iter()) && self.values == other.values
    }
}

impl Serialize for Levels {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.labels.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    name: String,
    kind: Kind,
    values: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    levels: Option<Levels>,
}

impl Column {
    /// Build a non-factor column, checking every value against `kind`.
    pub fn new(name: impl Into<String>, kind: Kind, values: Vec<Value>) -> Result<Self> {
        let name = name.into();
        if kind == Kind::Factor {
            return Err(Error::Invariant(format!(
                "factor column '{name}' must be built with a level set"
            )));
        }
        for v in &values {
            check_kind(&name, kind, v)?;
        }
        Ok(Self {
            name,
            kind,
            values,
            levels: None,
        })
    }

    /// Build a factor column from codes into `levels`.
    pub fn factor(name: impl Into<String>, levels: Levels, codes: Vec<Value>) -> Result<Self> {
        let name = name.into();
        for v in &codes {
            match v {
                Value::Absent => {}
                Value::Code(c) if (*c as usize) < levels.len() => {}
                Value::Code(c) => {
                    return Err(Error::Invariant(format!(
                        "code {c} outside the {} levels of '{name}'",
                        levels.len()
                    )))
                }
                other => check_kind(&name, Kind::Factor, other)?,
            }
        }
        Ok(Self {
            name,
            kind: Kind::Factor,
            values: codes,
            levels: Some(levels),
        })
    }

    pub fn boolean(name: impl Into<String>, values: Vec<Option<bool>>) -> Self {
        Self::typed(name, Kind::Boolean, values)
    }

    pub fn int(name: impl Into<String>, values: Vec<Option<i64>>) -> Self {
        Self::typed(name, Kind::Integer, values)
    }

    pub fn real(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self::typed(name, Kind::Real, values)
    }

    pub fn text(name: impl Into<String>, values: Vec<Option<&str>>) -> Self {
        Self::typed(name, Kind::Text, values)
    }

    // Callers pass values whose Rust type already pins the kind.
    fn typed<T: Into<Value>>(name: impl Into<String>, kind: Kind, values: Vec<Option<T>>) -> Self {
        Self {
            name: name.into(),
            kind,
            values: values.into_iter().map(Value::from).collect(),
            levels: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, row: usize) -> Option<&Value> {
        self.values.get(row)
    }

    pub fn levels(&self) -> Option<&Levels> {
        self.levels.as_ref()
    }

    pub fn is_factor(&self) -> bool {
        self.kind == Kind::Factor
    }

    /// Label stored at `row` of a factor column.
    pub fn label(&self, row: usize) -> Option<&str> {
        match (self.values.get(row), &self.levels) {
            (Some(Value::Code(c)), Some(levels)) => levels.label(*c),
            _ => None,
        }
    }

    /// Value used when comparing rows across columns: factor codes resolve
    /// to their label so columns with different level sets agree.
    pub fn key_value(&self, row: usize) -> Value {
        match self.values.get(row) {
            Some(Value::Code(_)) => self
                .label(row)
                .map(Value::from)
                .unwrap_or(Value::Absent),
            Some(v) => v.clone(),
            None => Value::Absent,
        }
    }

    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Gather rows by position; `None` yields an absent cell.
    pub fn take(&self, positions: &[Option<usize>]) -> Result<Self> {
        let mut values = Vec::with_capacity(positions.len());
        for pos in positions {
            match pos {
                Some(row) => values.push(
                    self.values
                        .get(*row)
                        .cloned()
                        .ok_or(Error::RowOutOfBounds {
                            row: *row,
                            len: self.len(),
                        })?,
                ),
                None => values.push(Value::Absent),
            }
        }
        Ok(Self {
            name: self.name.clone(),
            kind: self.kind,
            values,
            levels: self.levels.clone(),
        })
    }

    pub fn count_absent(&self) -> usize {
        self.values.iter().filter(|v| v.is_absent()).count()
    }
}

fn check_kind(column: &str, kind: Kind, value: &Value) -> Result<()> {
    match value.kind() {
        None => Ok(()),
        Some(found) if found == kind => Ok(()),
        Some(found) => Err(Error::KindMismatch {
            column: column.to_string(),
            expected: kind,
            found,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_values_of_another_kind() {
        let err = Column::new("x", Kind::Integer, vec![Value::Int(1), Value::from("a")])
            .unwrap_err();
        assert!(matches!(err, Error::KindMismatch { found: Kind::Text, .. }));
    }

    #[test]
    fn factor_rejects_out_of_range_codes() {
        let levels = Levels::new(["a", "b"]).unwrap();
        assert!(Column::factor("f", levels, vec![Value::Code(2)]).is_err());
    }

    #[test]
    fn level_equality_is_ordered() {
        let ab = Levels::new(["a", "b"]).unwrap();
        let ba = Levels::new(["b", "a"]).unwrap();
        assert_ne!(ab, ba);
    }

    #[test]
    fn levels_keep_their_source_values() {
        let levels = Levels::from_values([Value::Int(2), Value::Real(-0.0)]).unwrap();
        assert_eq!(levels.to_vec(), vec!["2", "0"]);
        assert_eq!(levels.value(0), Some(&Value::Int(2)));
        let zero = levels.value(1).and_then(Value::as_f64).map(f64::to_bits);
        assert_eq!(zero, Some(0.0f64.to_bits()));
        assert!(matches!(
            Levels::from_values([Value::Int(1), Value::Real(1.0)]),
            Err(Error::DuplicateLevel(l)) if l == "1"
        ));
        assert!(Levels::from_values([Value::Absent]).is_err());
    }

    #[test]
    fn duplicate_levels_fail() {
        assert!(matches!(
            Levels::new(["a", "a"]),
            Err(Error::DuplicateLevel(l)) if l == "a"
        ));
    }
}
