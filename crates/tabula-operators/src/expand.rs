//! Multi-value expansion: a delimited text column becomes a boolean
//! indicator table with one column per distinct token.
//!
//! An absent source cell tokenizes to the empty set, so its indicator row is
//! all `false` rather than absent. Elsewhere absent propagates; here "no
//! value" is read as "has none of the tokens".

use indexmap::IndexSet;
use tracing::debug;

use tabula_core::prelude::{Column, EngineConfig, Error, Kind, Result, Schema, Table, Value};

use crate::plan::OpPlan;
use crate::traits::{input, OpError, Operator};

/// Split one cell into its token set: trimmed, non-empty, first occurrence
/// kept when a token repeats within the cell.
pub fn tokenize(value: &Value, delimiter: &str) -> Vec<String> {
    let Value::Text(text) = value else {
        return vec![];
    };
    let tokens: IndexSet<&str> = text
        .split(delimiter)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect();
    tokens.into_iter().map(str::to_string).collect()
}

/// Build the indicator table for `column`.
///
/// Columns follow the first appearance of each token in row order; row `i`,
/// column `t` is true iff `t` is in row `i`'s token set. The result has the
/// same row count as `column`. Factor columns are expanded through their
/// labels.
pub fn expand(column: &Column, delimiter: &str) -> Result<Table> {
    if delimiter.is_empty() {
        return Err(Error::Config("delimiter must not be empty".into()));
    }
    let cells = match column.kind() {
        Kind::Text => column.values().to_vec(),
        Kind::Factor => (0..column.len()).map(|row| column.key_value(row)).collect(),
        other => {
            return Err(Error::KindMismatch {
                column: column.name().to_string(),
                expected: Kind::Text,
                found: other,
            })
        }
    };

    let mut universe: IndexSet<String> = IndexSet::new();
    let rows: Vec<Vec<usize>> = cells
        .iter()
        .map(|cell| {
            tokenize(cell, delimiter)
                .into_iter()
                .map(|t| universe.insert_full(t).0)
                .collect()
        })
        .collect();

    let mut matrix = vec![vec![Some(false); cells.len()]; universe.len()];
    for (row, token_ids) in rows.iter().enumerate() {
        for &t in token_ids {
            matrix[t][row] = Some(true);
        }
    }

    debug!(
        column = column.name(),
        rows = cells.len(),
        tokens = universe.len(),
        "expanded multi-value column"
    );

    let columns = universe
        .into_iter()
        .zip(matrix)
        .map(|(token, flags)| Column::boolean(token, flags))
        .collect();
    Table::with_num_rows(cells.len(), columns)
}

/// Expand a column and append the indicator columns to the source table.
#[derive(Debug, Clone)]
pub struct ExpandOp {
    pub column: String,
    pub delimiter: String,
    /// Prepended to every indicator column name.
    pub prefix: Option<String>,
}

impl ExpandOp {
    pub fn new(column: impl Into<String>) -> Self {
        Self::from_config(column, &EngineConfig::default())
    }

    pub fn from_config(column: impl Into<String>, cfg: &EngineConfig) -> Self {
        Self {
            column: column.into(),
            delimiter: cfg.delimiter.clone(),
            prefix: cfg.indicator_prefix.clone(),
        }
    }
}

impl Operator for ExpandOp {
    fn name(&self) -> &'static str {
        "expand"
    }

    fn plan(&self, input_schemas: &[Schema]) -> std::result::Result<OpPlan, OpError> {
        let schema = input(input_schemas, 0, self.name())?.clone();
        let idx = schema
            .index_of(&self.column)
            .ok_or_else(|| OpError::Plan(format!("column '{}' not found", self.column)))?;
        match schema.fields[idx].kind {
            Kind::Text | Kind::Factor => Ok(OpPlan::new(schema).data_dependent()),
            other => Err(OpError::Plan(format!(
                "cannot expand {other} column '{}'",
                self.column
            ))),
        }
    }

    fn eval(&self, inputs: &[Table]) -> std::result::Result<Table, OpError> {
        let table = input(inputs, 0, self.name())?;
        let indicators = expand(table.column(&self.column)?, &self.delimiter)?;
        let indicators = match &self.prefix {
            Some(prefix) => Table::with_num_rows(
                indicators.num_rows(),
                indicators
                    .into_columns()
                    .into_iter()
                    .map(|c| {
                        let name = format!("{prefix}{}", c.name());
                        c.renamed(name)
                    })
                    .collect(),
            )?,
            None => indicators,
        };
        Ok(table.append_columns(&indicators)?)
    }
}
