//! Categorical codec: raw values <-> factor columns.
//!
//! A factor's level set is closed. `assign` is the only scalar write path
//! and refuses labels outside the set; `relabel` renames levels without
//! touching stored codes; `drop_unused_levels` is the one operation that
//! narrows a level set in place.

use indexmap::IndexSet;
use tracing::{debug, warn};

use tabula_core::prelude::{Column, Error, Kind, Levels, Result, Schema, Table, Value};

use crate::plan::OpPlan;
use crate::traits::{input, OpError, Operator};

/// Encode raw values as a factor column.
///
/// Without `explicit_levels` the level set is the distinct present values,
/// sorted (numbers numerically across integer and real, text
/// lexicographically) so codes do not depend on row order. Each inferred
/// level remembers its raw value, so `decode` restores the input kind. With
/// `explicit_levels` the level set is exactly that list, in that order,
/// whether or not every level occurs; raw values outside it are stored as
/// absent, and decoding yields the labels as text.
///
/// Levels are labelled by display form (`3`, `true`). Raw values sharing a
/// label (`1` and `1.0`) share the level of the one that sorts first.
pub fn encode(
    name: &str,
    raw: &[Value],
    explicit_levels: Option<&[String]>,
) -> Result<Column> {
    for v in raw {
        if let Value::Code(_) = v {
            return Err(Error::KindMismatch {
                column: name.to_string(),
                expected: Kind::Text,
                found: Kind::Factor,
            });
        }
    }

    let levels = match explicit_levels {
        Some(labels) => Levels::new(labels.iter().cloned())?,
        None => infer_levels(raw)?,
    };

    let mut dropped = 0usize;
    let codes = raw
        .iter()
        .map(|v| {
            if v.is_absent() {
                return Value::Absent;
            }
            match levels.code_of(&v.clone().normalized().to_string()) {
                Some(code) => Value::Code(code),
                None => {
                    dropped += 1;
                    Value::Absent
                }
            }
        })
        .collect::<Vec<_>>();

    if dropped > 0 {
        warn!(
            column = name,
            dropped,
            levels = levels.len(),
            "values outside the declared levels were stored as absent"
        );
    }
    debug!(column = name, rows = raw.len(), levels = levels.len(), "encoded factor");

    Column::factor(name, levels, codes)
}

fn infer_levels(raw: &[Value]) -> Result<Levels> {
    let mut present: Vec<Value> = raw
        .iter()
        .filter(|v| !v.is_absent())
        .map(|v| v.clone().normalized())
        .collect();
    present.sort_by(|a, b| a.total_cmp(b));
    let mut seen: IndexSet<String> = IndexSet::new();
    present.retain(|v| seen.insert(v.to_string()));
    Levels::from_values(present)
}

/// Map each code back to the value its level stands for; absent stays
/// absent.
pub fn decode(column: &Column) -> Result<Vec<Value>> {
    let levels = factor_levels(column)?;
    Ok(column
        .values()
        .iter()
        .map(|v| match v {
            Value::Code(c) => levels.value(*c).cloned().unwrap_or(Value::Absent),
            _ => Value::Absent,
        })
        .collect())
}

/// Return a copy of `column` with `row` set to `raw`.
///
/// Fails with `UnknownLevel` when `raw` is not a current level; the input
/// column is never modified. Assigning absent is always allowed.
pub fn assign(column: &Column, row: usize, raw: &Value) -> Result<Column> {
    let levels = factor_levels(column)?;
    if row >= column.len() {
        return Err(Error::RowOutOfBounds {
            row,
            len: column.len(),
        });
    }

    let cell = match raw {
        Value::Absent => Value::Absent,
        Value::Code(c) => {
            // A bare code must already index this column's levels.
            if levels.label(*c).is_none() {
                return Err(Error::UnknownLevel {
                    column: column.name().to_string(),
                    value: raw.to_string(),
                });
            }
            Value::Code(*c)
        }
        other => {
            let label = other.clone().normalized().to_string();
            let code = levels.code_of(&label).ok_or_else(|| Error::UnknownLevel {
                column: column.name().to_string(),
                value: label,
            })?;
            Value::Code(code)
        }
    };

    let mut codes = column.values().to_vec();
    codes[row] = cell;
    Column::factor(column.name(), levels.clone(), codes)
}

/// Rename levels positionally. Codes are untouched, so every row that held
/// level `i` now reads `new_labels[i]` (as text when decoded).
pub fn relabel(column: &Column, new_labels: &[String]) -> Result<Column> {
    let levels = factor_levels(column)?;
    if new_labels.len() != levels.len() {
        return Err(Error::LevelCountMismatch {
            expected: levels.len(),
            found: new_labels.len(),
        });
    }
    let renamed = Levels::new(new_labels.iter().cloned())?;
    Column::factor(column.name(), renamed, column.values().to_vec())
}

/// Remove levels no row uses, keeping the order of the rest, and remap the
/// stored codes. Returns the number of levels removed.
///
/// This is the only in-place operation on a column.
pub fn drop_unused_levels(column: &mut Column) -> Result<usize> {
    let levels = factor_levels(column)?;
    let mut used = vec![false; levels.len()];
    for v in column.values() {
        if let Value::Code(c) = v {
            used[*c as usize] = true;
        }
    }

    let removed = used.iter().filter(|u| !**u).count();
    if removed == 0 {
        return Ok(0);
    }

    let mut remap = vec![None; levels.len()];
    let mut kept = Vec::with_capacity(levels.len() - removed);
    for (old, value) in levels.values().iter().enumerate() {
        if used[old] {
            remap[old] = Some(kept.len() as u32);
            kept.push(value.clone());
        }
    }

    let codes = column
        .values()
        .iter()
        .map(|v| match v {
            Value::Code(c) => remap[*c as usize].map(Value::Code).unwrap_or(Value::Absent),
            _ => Value::Absent,
        })
        .collect();

    let narrowed = Column::factor(column.name(), Levels::from_values(kept)?, codes)?;
    debug!(column = column.name(), removed, "dropped unused levels");
    *column = narrowed;
    Ok(removed)
}

fn factor_levels(column: &Column) -> Result<&Levels> {
    column.levels().ok_or_else(|| Error::KindMismatch {
        column: column.name().to_string(),
        expected: Kind::Factor,
        found: column.kind(),
    })
}

/// Replace a table column with its factor encoding.
///
/// An existing factor column is decoded first, so this also re-levels it.
#[derive(Debug, Clone, Default)]
pub struct FactorizeOp {
    pub column: String,
    pub levels: Option<Vec<String>>,
}

impl Operator for FactorizeOp {
    fn name(&self) -> &'static str {
        "factorize"
    }

    fn plan(&self, input_schemas: &[Schema]) -> std::result::Result<OpPlan, OpError> {
        let mut schema = input(input_schemas, 0, self.name())?.clone();
        let idx = schema
            .index_of(&self.column)
            .ok_or_else(|| OpError::Plan(format!("column '{}' not found", self.column)))?;
        schema.fields[idx].kind = Kind::Factor;
        Ok(OpPlan::new(schema))
    }

    fn eval(&self, inputs: &[Table]) -> std::result::Result<Table, OpError> {
        let table = input(inputs, 0, self.name())?;
        let source = table.column(&self.column)?;
        let raw = if source.is_factor() {
            decode(source)?
        } else {
            source.values().to_vec()
        };
        let encoded = encode(&self.column, &raw, self.levels.as_deref())?;
        Ok(table.with_column(encoded)?)
    }
}
