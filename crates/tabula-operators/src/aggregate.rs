//! Grouped aggregation.
//!
//! `group_by` partitions row indices by the tuple of key-column values in a
//! single pass. Groups iterate in order of first appearance, which keeps the
//! output deterministic without requiring key kinds to be orderable.
//! `aggregate` then reduces one target column per group.
//!
//! Absent handling:
//! - Keys: with `AbsentKeyPolicy::Group` an absent component is an ordinary
//!   key value (two absents in one position are the same key); with
//!   `AbsentKeyPolicy::Drop` rows with any absent key component are skipped.
//! - Targets: `skip_absent = true` ignores absent values; `false` makes the
//!   whole group's result absent as soon as one value is absent. A group with
//!   no present values reduces to absent for every reducer.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use tabula_core::prelude::{
    AbsentKeyPolicy, Column, EngineConfig, Error, Field, KeyTuple, Kind, Levels, Result, Schema,
    Table, Value,
};

use crate::plan::OpPlan;
use crate::traits::{input, OpError, Operator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reducer {
    Mean,
    Sum,
    Count,
    Min,
    Max,
}

impl Reducer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reducer::Mean => "mean",
            Reducer::Sum => "sum",
            Reducer::Count => "count",
            Reducer::Min => "min",
            Reducer::Max => "max",
        }
    }

    /// Kind of the reduced value for a target of kind `input`, or
    /// `InvalidReducer` when the pair makes no sense (sum of text, min of a
    /// factor whose labels carry no order).
    pub fn output_kind(&self, column: &str, input: Kind) -> Result<Kind> {
        let ok = match (self, input) {
            (Reducer::Count, _) => Some(Kind::Integer),
            (Reducer::Mean, Kind::Boolean | Kind::Integer | Kind::Real) => Some(Kind::Real),
            (Reducer::Sum, Kind::Boolean | Kind::Integer) => Some(Kind::Integer),
            (Reducer::Sum, Kind::Real) => Some(Kind::Real),
            (Reducer::Min | Reducer::Max, Kind::Factor) => None,
            (Reducer::Min | Reducer::Max, k) => Some(k),
            _ => None,
        };
        ok.ok_or_else(|| {
            Error::InvalidReducer(format!(
                "{} is not defined for {input} column '{column}'",
                self.as_str()
            ))
        })
    }
}

impl FromStr for Reducer {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mean" | "avg" => Ok(Reducer::Mean),
            "sum" => Ok(Reducer::Sum),
            "count" => Ok(Reducer::Count),
            "min" => Ok(Reducer::Min),
            "max" => Ok(Reducer::Max),
            other => Err(Error::InvalidReducer(other.to_string())),
        }
    }
}

impl fmt::Display for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name, kind and level set of a key column, enough to rebuild it.
#[derive(Debug, Clone)]
struct KeySpec {
    name: String,
    kind: Kind,
    levels: Option<Levels>,
}

/// Partition map: key tuple -> row indices, in first-appearance order.
///
/// Factor key components hold their label as `Value::Text`.
#[derive(Debug, Clone)]
pub struct GroupBy {
    keys: Vec<KeySpec>,
    groups: IndexMap<KeyTuple, Vec<usize>>,
    num_rows: usize,
}

/// Group rows of `table` by `keys`; absent key components form their own
/// groups.
pub fn group_by(table: &Table, keys: &[String]) -> Result<GroupBy> {
    GroupBy::new(table, keys, AbsentKeyPolicy::Group)
}

impl GroupBy {
    pub fn new(table: &Table, keys: &[String], policy: AbsentKeyPolicy) -> Result<Self> {
        let indices = table.resolve(keys)?;
        let specs = indices
            .iter()
            .map(|&i| {
                let col = &table.columns()[i];
                KeySpec {
                    name: col.name().to_string(),
                    kind: col.kind(),
                    levels: col.levels().cloned(),
                }
            })
            .collect();

        let mut groups: IndexMap<KeyTuple, Vec<usize>> = IndexMap::new();
        let mut dropped = 0usize;
        for row in 0..table.num_rows() {
            let key = table.key_tuple(&indices, row);
            if policy == AbsentKeyPolicy::Drop && key.iter().any(Value::is_absent) {
                dropped += 1;
                continue;
            }
            groups.entry(key).or_default().push(row);
        }

        debug!(
            keys = ?keys,
            rows = table.num_rows(),
            groups = groups.len(),
            dropped,
            "grouped rows"
        );

        Ok(Self {
            keys: specs,
            groups,
            num_rows: table.num_rows(),
        })
    }

    pub fn key_names(&self) -> Vec<&str> {
        self.keys.iter().map(|k| k.name.as_str()).collect()
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Row count of the table that was grouped.
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn get(&self, key: &[Value]) -> Option<&[usize]> {
        self.groups.get(key).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&KeyTuple, &[usize])> {
        self.groups.iter().map(|(k, rows)| (k, rows.as_slice()))
    }

    /// The distinct key tuples as a table, one row per group.
    pub fn key_table(&self) -> Result<Table> {
        let tuples: Vec<&KeyTuple> = self.groups.keys().collect();
        key_table(&self.keys, &tuples)
    }
}

fn key_table(specs: &[KeySpec], tuples: &[&KeyTuple]) -> Result<Table> {
    let columns = specs
        .iter()
        .enumerate()
        .map(|(k, spec)| {
            let values: Vec<Value> = tuples.iter().map(|t| t[k].clone()).collect();
            match &spec.levels {
                Some(levels) => {
                    let codes = values
                        .iter()
                        .map(|v| match v {
                            Value::Text(label) => levels
                                .code_of(label)
                                .map(Value::Code)
                                .unwrap_or(Value::Absent),
                            _ => Value::Absent,
                        })
                        .collect();
                    Column::factor(&spec.name, levels.clone(), codes)
                }
                None => Column::new(&spec.name, spec.kind, values),
            }
        })
        .collect::<Result<Vec<_>>>()?;
    Table::with_num_rows(tuples.len(), columns)
}

/// Group key tuple -> reduced value, in group order.
#[derive(Debug, Clone)]
pub struct Aggregated {
    keys: Vec<KeySpec>,
    name: String,
    kind: Kind,
    results: IndexMap<KeyTuple, Value>,
}

impl Aggregated {
    pub fn get(&self, key: &[Value]) -> Option<&Value> {
        self.results.get(key)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&KeyTuple, &Value)> {
        self.results.iter()
    }

    pub fn into_map(self) -> IndexMap<KeyTuple, Value> {
        self.results
    }

    /// Name of the result column (`<reducer>_<target>` unless aliased).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// The reduced values as a column, in group order.
    pub fn value_column(&self) -> Result<Column> {
        let values: Vec<Value> = self.results.values().cloned().collect();
        // Integer sums that overflowed i64 come back as reals.
        if self.kind == Kind::Integer && values.iter().any(|v| matches!(v, Value::Real(_))) {
            let promoted = values
                .iter()
                .map(|v| v.as_f64().map(Value::Real).unwrap_or(Value::Absent))
                .collect();
            return Column::new(&self.name, Kind::Real, promoted);
        }
        Column::new(&self.name, self.kind, values)
    }

    /// Key columns followed by the result column. A result name equal to a
    /// key name fails with `DuplicateColumn`.
    pub fn into_table(self) -> Result<Table> {
        let tuples: Vec<&KeyTuple> = self.results.keys().collect();
        let keys = key_table(&self.keys, &tuples)?;
        keys.append_columns(&Table::with_num_rows(
            tuples.len(),
            vec![self.value_column()?],
        )?)
    }
}

/// Reduce `target` within every group of `groups`.
///
/// `target` must have one value per row of the grouped table.
///
/// `count` counts present target values. Summed over all groups it equals
/// the grouped row count only when the target has no absent values; with
/// `skip_absent = false` a group holding any absent target counts as absent.
pub fn aggregate(
    groups: &GroupBy,
    target: &Column,
    reducer: Reducer,
    skip_absent: bool,
) -> Result<Aggregated> {
    if target.len() != groups.num_rows {
        return Err(Error::ShapeMismatch {
            context: format!("aggregate target '{}'", target.name()),
            expected: groups.num_rows,
            found: target.len(),
        });
    }
    let kind = reducer.output_kind(target.name(), target.kind())?;

    let results: IndexMap<KeyTuple, Value> = groups
        .groups
        .iter()
        .map(|(key, rows)| (key.clone(), reduce(target, rows, reducer, skip_absent)))
        .collect();

    debug!(
        target = target.name(),
        reducer = reducer.as_str(),
        skip_absent,
        groups = results.len(),
        "aggregated"
    );

    Ok(Aggregated {
        keys: groups.keys.clone(),
        name: format!("{}_{}", reducer.as_str(), target.name()),
        kind,
        results,
    })
}

fn reduce(target: &Column, rows: &[usize], reducer: Reducer, skip_absent: bool) -> Value {
    let mut present: Vec<&Value> = Vec::with_capacity(rows.len());
    for &row in rows {
        let v = &target.values()[row];
        if v.is_absent() {
            if !skip_absent {
                return Value::Absent;
            }
        } else {
            present.push(v);
        }
    }
    if present.is_empty() {
        return Value::Absent;
    }

    match reducer {
        Reducer::Count => Value::Int(present.len() as i64),
        Reducer::Mean => {
            let total: f64 = present.iter().filter_map(|v| v.as_f64()).sum();
            Value::Real(total / present.len() as f64)
        }
        Reducer::Sum => sum(&present),
        Reducer::Min => present
            .into_iter()
            .min_by(|a, b| a.total_cmp(b))
            .cloned()
            .unwrap_or(Value::Absent),
        Reducer::Max => present
            .into_iter()
            .max_by(|a, b| a.total_cmp(b))
            .cloned()
            .unwrap_or(Value::Absent),
    }
}

fn sum(values: &[&Value]) -> Value {
    if values.iter().all(|v| matches!(v, Value::Int(_) | Value::Bool(_))) {
        let mut acc: i64 = 0;
        for v in values {
            let x = match v {
                Value::Int(i) => *i,
                Value::Bool(b) => *b as i64,
                _ => 0,
            };
            match acc.checked_add(x) {
                Some(next) => acc = next,
                None => return Value::Real(values.iter().filter_map(|v| v.as_f64()).sum()),
            }
        }
        return Value::Int(acc);
    }
    Value::Real(values.iter().filter_map(|v| v.as_f64()).sum())
}

/// One reduction inside an `AggregateOp`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggSpec {
    pub column: String,
    pub reducer: Reducer,
    #[serde(default)]
    pub alias: Option<String>,
}

impl AggSpec {
    pub fn new(column: impl Into<String>, reducer: Reducer) -> Self {
        Self {
            column: column.into(),
            reducer,
            alias: None,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn output_name(&self) -> String {
        self.alias
            .clone()
            .unwrap_or_else(|| format!("{}_{}", self.reducer.as_str(), self.column))
    }
}

/// Group by `keys` and apply every spec; output is one row per group with
/// the key columns followed by one column per spec.
#[derive(Debug, Clone)]
pub struct AggregateOp {
    pub keys: Vec<String>,
    pub aggs: Vec<AggSpec>,
    pub skip_absent: bool,
    pub absent_keys: AbsentKeyPolicy,
}

impl AggregateOp {
    pub fn new(keys: Vec<String>, aggs: Vec<AggSpec>) -> Self {
        Self::from_config(keys, aggs, &EngineConfig::default())
    }

    pub fn from_config(keys: Vec<String>, aggs: Vec<AggSpec>, cfg: &EngineConfig) -> Self {
        Self {
            keys,
            aggs,
            skip_absent: cfg.skip_absent,
            absent_keys: cfg.absent_keys,
        }
    }
}

impl Operator for AggregateOp {
    fn name(&self) -> &'static str {
        "aggregate"
    }

    fn plan(&self, input_schemas: &[Schema]) -> std::result::Result<OpPlan, OpError> {
        let schema = input(input_schemas, 0, self.name())?;
        let field = |name: &str| {
            schema
                .index_of(name)
                .and_then(|i| schema.field(i))
                .ok_or_else(|| OpError::Plan(format!("column '{name}' not found")))
        };

        let mut fields = Vec::with_capacity(self.keys.len() + self.aggs.len());
        for key in &self.keys {
            let f = field(key)?;
            let nullable = f.nullable && self.absent_keys == AbsentKeyPolicy::Group;
            fields.push(Field::new(key.clone(), f.kind, nullable));
        }
        for spec in &self.aggs {
            let f = field(&spec.column)?;
            let kind = spec.reducer.output_kind(&spec.column, f.kind)?;
            fields.push(Field::new(spec.output_name(), kind, true));
        }
        Ok(OpPlan::new(Schema::new(fields)).with_partitions(self.keys.clone()))
    }

    fn eval(&self, inputs: &[Table]) -> std::result::Result<Table, OpError> {
        let table = input(inputs, 0, self.name())?;
        let groups = GroupBy::new(table, &self.keys, self.absent_keys)?;
        let mut out = groups.key_table()?;
        for spec in &self.aggs {
            let agg = aggregate(
                &groups,
                table.column(&spec.column)?,
                spec.reducer,
                self.skip_absent,
            )?
            .with_name(spec.output_name());
            out = out.append_columns(&Table::new(vec![agg.value_column()?])?)?;
        }
        Ok(out)
    }
}
