//! Relational merge of two tables on their shared column names.
//!
//! Key columns are the names present in both tables (or the subset named in
//! `MergeOptions::on`), ordered as in `left`.
//! Rows match when every key component is present and equal; absent never
//! matches, not even another absent. A left row with several partners
//! yields one output row per partner.
//!
//! Output columns: keys (left order), then left's other columns, then
//! right's other columns. A non-key name present on both sides is kept twice
//! with the configured suffixes.
//!
//! Output rows: left rows in order (partners in right's row order), then, for
//! right/full outer merges, unmatched right rows in order.

pub mod hash;

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use tabula_core::prelude::{
    Column, EngineConfig, Error, Field, Kind, Levels, Result, Schema, Table, Value,
};

use crate::plan::OpPlan;
use crate::traits::{expect_inputs, OpError, Operator};

use self::hash::KeyIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeMode {
    Inner,
    LeftOuter,
    RightOuter,
    FullOuter,
}

impl MergeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeMode::Inner => "inner",
            MergeMode::LeftOuter => "left_outer",
            MergeMode::RightOuter => "right_outer",
            MergeMode::FullOuter => "full_outer",
        }
    }

    fn keeps_unmatched_left(&self) -> bool {
        matches!(self, MergeMode::LeftOuter | MergeMode::FullOuter)
    }

    fn keeps_unmatched_right(&self) -> bool {
        matches!(self, MergeMode::RightOuter | MergeMode::FullOuter)
    }
}

impl FromStr for MergeMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "inner" => Ok(MergeMode::Inner),
            "left" | "left_outer" | "leftouter" => Ok(MergeMode::LeftOuter),
            "right" | "right_outer" | "rightouter" => Ok(MergeMode::RightOuter),
            "full" | "outer" | "full_outer" | "fullouter" => Ok(MergeMode::FullOuter),
            other => Err(Error::Config(format!("unknown merge mode '{other}'"))),
        }
    }
}

impl fmt::Display for MergeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for `merge_with`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeOptions {
    /// Restrict the keys to these shared names. `None` merges on every
    /// shared name.
    #[serde(default)]
    pub on: Option<Vec<String>>,

    /// Appended to non-key names present on both sides (left, right).
    pub suffixes: (String, String),
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl MergeOptions {
    pub fn from_config(cfg: &EngineConfig) -> Self {
        Self {
            on: None,
            suffixes: cfg.merge_suffixes.clone(),
        }
    }

    pub fn on(mut self, keys: Vec<String>) -> Self {
        self.on = Some(keys);
        self
    }
}

/// Merge on every shared column name.
pub fn merge(left: &Table, right: &Table, mode: MergeMode) -> Result<Table> {
    merge_with(left, right, mode, &MergeOptions::default())
}

pub fn merge_with(
    left: &Table,
    right: &Table,
    mode: MergeMode,
    opts: &MergeOptions,
) -> Result<Table> {
    let layout = Layout::new(&left.column_names(), &right.column_names(), opts.on.as_deref())?;
    let left_keys = left.resolve(&layout.keys)?;
    let right_keys = right.resolve(&layout.keys)?;
    for (&l, &r) in left_keys.iter().zip(&right_keys) {
        key_kind(&left.columns()[l], &right.columns()[r])?;
    }

    let index = KeyIndex::build(right, &right_keys);
    let mut pairs: Vec<(Option<usize>, Option<usize>)> = Vec::new();
    let mut right_matched = vec![false; right.num_rows()];

    for l in 0..left.num_rows() {
        let partners = index.probe(&left.key_tuple(&left_keys, l));
        if partners.is_empty() {
            if mode.keeps_unmatched_left() {
                pairs.push((Some(l), None));
            }
            continue;
        }
        for &r in partners {
            right_matched[r] = true;
            pairs.push((Some(l), Some(r)));
        }
    }

    let matched = pairs.iter().filter(|(_, r)| r.is_some()).count();
    if mode.keeps_unmatched_right() {
        pairs.extend(
            right_matched
                .iter()
                .enumerate()
                .filter(|(_, m)| !**m)
                .map(|(r, _)| (None, Some(r))),
        );
    }

    debug!(
        mode = mode.as_str(),
        keys = ?layout.keys,
        left_rows = left.num_rows(),
        right_rows = right.num_rows(),
        indexed_keys = index.len(),
        matched,
        rows = pairs.len(),
        "merged tables"
    );

    let left_pos: Vec<Option<usize>> = pairs.iter().map(|(l, _)| *l).collect();
    let right_pos: Vec<Option<usize>> = pairs.iter().map(|(_, r)| *r).collect();

    let mut columns = Vec::with_capacity(left.num_columns() + right.num_columns());
    for (&l, &r) in left_keys.iter().zip(&right_keys) {
        columns.push(coalesce_key(&left.columns()[l], &right.columns()[r], &pairs)?);
    }
    for name in &layout.left_rest {
        let col = left.column(name)?.take(&left_pos)?;
        columns.push(col.renamed(layout.output_name(name, &opts.suffixes.0)));
    }
    for name in &layout.right_rest {
        let col = right.column(name)?.take(&right_pos)?;
        columns.push(col.renamed(layout.output_name(name, &opts.suffixes.1)));
    }

    Table::with_num_rows(pairs.len(), columns)
}

/// Which names are keys, which remain on each side, and which of the
/// remaining names appear on both sides.
struct Layout {
    keys: Vec<String>,
    left_rest: Vec<String>,
    right_rest: Vec<String>,
    collisions: HashSet<String>,
}

impl Layout {
    fn new(left: &[&str], right: &[&str], on: Option<&[String]>) -> Result<Self> {
        let right_set: HashSet<&str> = right.iter().copied().collect();
        let left_set: HashSet<&str> = left.iter().copied().collect();

        if let Some(on) = on {
            for name in on {
                if !left_set.contains(name.as_str()) || !right_set.contains(name.as_str()) {
                    return Err(Error::UnknownColumn(name.clone()));
                }
            }
        }
        let wanted = |n: &str| on.map_or(true, |on| on.iter().any(|k| k == n));

        let keys: Vec<String> = left
            .iter()
            .filter(|n| right_set.contains(*n) && wanted(**n))
            .map(|n| n.to_string())
            .collect();
        if keys.is_empty() {
            return Err(Error::NoCommonKeys);
        }

        let key_set: HashSet<&str> = keys.iter().map(String::as_str).collect();
        let rest = |names: &[&str]| -> Vec<String> {
            names
                .iter()
                .filter(|n| !key_set.contains(*n))
                .map(|n| n.to_string())
                .collect()
        };
        let left_rest = rest(left);
        let right_rest = rest(right);
        let collisions = left_rest
            .iter()
            .filter(|n| right_set.contains(n.as_str()))
            .cloned()
            .collect();

        Ok(Self {
            keys,
            left_rest,
            right_rest,
            collisions,
        })
    }

    fn output_name(&self, name: &str, suffix: &str) -> String {
        if self.collisions.contains(name) {
            format!("{name}{suffix}")
        } else {
            name.to_string()
        }
    }
}

/// Output kind of a key column, or `KindMismatch` when the two sides cannot
/// hold equal values. Factor and text keys compare by label.
fn key_kind(left: &Column, right: &Column) -> Result<Kind> {
    match (left.kind(), right.kind()) {
        (a, b) if a == b => Ok(a),
        (Kind::Factor, Kind::Text) | (Kind::Text, Kind::Factor) => Ok(Kind::Text),
        (a, b) => Err(Error::KindMismatch {
            column: left.name().to_string(),
            expected: a,
            found: b,
        }),
    }
}

/// Build one output key column: the left value where a left row exists,
/// otherwise the right value.
fn coalesce_key(
    left: &Column,
    right: &Column,
    pairs: &[(Option<usize>, Option<usize>)],
) -> Result<Column> {
    let labels: Vec<Value> = pairs
        .iter()
        .map(|pair| match pair {
            (Some(l), _) => left.key_value(*l),
            (None, Some(r)) => right.key_value(*r),
            (None, None) => Value::Absent,
        })
        .collect();

    match key_kind(left, right)? {
        Kind::Factor => {
            let mut all: Vec<Value> = left
                .levels()
                .map(|l| l.values().to_vec())
                .unwrap_or_default();
            if let (Some(ours), Some(extra)) = (left.levels(), right.levels()) {
                for (label, value) in extra.iter().zip(extra.values()) {
                    if !ours.contains(label) {
                        all.push(value.clone());
                    }
                }
            }
            let levels = Levels::from_values(all)?;
            let codes = labels
                .iter()
                .map(|v| match v {
                    Value::Text(label) => levels
                        .code_of(label)
                        .map(Value::Code)
                        .unwrap_or(Value::Absent),
                    _ => Value::Absent,
                })
                .collect();
            Column::factor(left.name(), levels, codes)
        }
        kind => Column::new(left.name(), kind, labels),
    }
}

/// Merge `inputs[0]` (left) with `inputs[1]` (right).
#[derive(Debug, Clone)]
pub struct MergeOp {
    pub mode: MergeMode,
    pub options: MergeOptions,
}

impl MergeOp {
    pub fn new(mode: MergeMode) -> Self {
        Self::from_config(mode, &EngineConfig::default())
    }

    pub fn from_config(mode: MergeMode, cfg: &EngineConfig) -> Self {
        Self {
            mode,
            options: MergeOptions::from_config(cfg),
        }
    }

    pub fn on(mut self, keys: Vec<String>) -> Self {
        self.options.on = Some(keys);
        self
    }
}

impl Operator for MergeOp {
    fn name(&self) -> &'static str {
        "merge"
    }

    fn plan(&self, input_schemas: &[Schema]) -> std::result::Result<OpPlan, OpError> {
        expect_inputs(input_schemas, 2, self.name())?;
        let (left, right) = (&input_schemas[0], &input_schemas[1]);
        let left_names: Vec<&str> = left.names().collect();
        let right_names: Vec<&str> = right.names().collect();
        let layout = Layout::new(&left_names, &right_names, self.options.on.as_deref())?;

        let field = |schema: &Schema, name: &str| -> std::result::Result<Field, OpError> {
            schema
                .index_of(name)
                .and_then(|i| schema.field(i))
                .cloned()
                .ok_or_else(|| OpError::Plan(format!("column '{name}' not found")))
        };

        let keep_left = self.mode.keeps_unmatched_left();
        let keep_right = self.mode.keeps_unmatched_right();
        let mut fields = Vec::new();
        for key in &layout.keys {
            let (l, r) = (field(left, key)?, field(right, key)?);
            let kind = match (l.kind, r.kind) {
                (a, b) if a == b => a,
                (Kind::Factor, Kind::Text) | (Kind::Text, Kind::Factor) => Kind::Text,
                (a, b) => {
                    return Err(OpError::Plan(format!(
                        "key '{key}' is {a} on the left but {b} on the right"
                    )))
                }
            };
            // Absent keys only reach the output from unmatched rows.
            let nullable = (l.nullable && keep_left) || (r.nullable && keep_right);
            fields.push(Field::new(key.clone(), kind, nullable));
        }
        for name in &layout.left_rest {
            let f = field(left, name)?;
            fields.push(Field::new(
                layout.output_name(name, &self.options.suffixes.0),
                f.kind,
                f.nullable || keep_right,
            ));
        }
        for name in &layout.right_rest {
            let f = field(right, name)?;
            fields.push(Field::new(
                layout.output_name(name, &self.options.suffixes.1),
                f.kind,
                f.nullable || keep_left,
            ));
        }
        Ok(OpPlan::new(Schema::new(fields)).with_partitions(layout.keys))
    }

    fn eval(&self, inputs: &[Table]) -> std::result::Result<Table, OpError> {
        expect_inputs(inputs, 2, self.name())?;
        Ok(merge_with(&inputs[0], &inputs[1], self.mode, &self.options)?)
    }
}
