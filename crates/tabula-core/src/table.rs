//! Ordered collection of named, equal-length columns.
//!
//! Rows are addressed positionally (`0..num_rows`); there is no implicit key.
//! Columns are read by name; nothing is ever bound into an ambient scope.

use std::collections::HashSet;

use serde::Serialize;

use crate::column::Column;
use crate::error::{Error, Result};
use crate::hash::hash_key;
use crate::schema::{Field, Schema};
use crate::value::{KeyTuple, Value};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    num_rows: usize,
    columns: Vec<Column>,
}

impl Table {
    /// Build a table; all columns must have equal length and unique names.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let num_rows = columns.first().map(|c| c.len()).unwrap_or(0);
        Self::with_num_rows(num_rows, columns)
    }

    /// Build a table with an explicit row count, which also covers tables
    /// that have rows but no columns.
    pub fn with_num_rows(num_rows: usize, columns: Vec<Column>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(columns.len());
        for col in &columns {
            if col.len() != num_rows {
                return Err(Error::ShapeMismatch {
                    context: format!("column '{}'", col.name()),
                    expected: num_rows,
                    found: col.len(),
                });
            }
            if !seen.insert(col.name()) {
                return Err(Error::DuplicateColumn(col.name().to_string()));
            }
        }
        Ok(Self { num_rows, columns })
    }

    /// A table with `num_rows` rows and no columns.
    pub fn empty(num_rows: usize) -> Self {
        Self {
            num_rows,
            columns: vec![],
        }
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column(&self, name: &str) -> Result<&Column> {
        self.columns
            .iter()
            .find(|c| c.name() == name)
            .ok_or_else(|| Error::UnknownColumn(name.to_string()))
    }

    pub fn schema(&self) -> Schema {
        Schema::new(
            self.columns
                .iter()
                .map(|c| Field::new(c.name(), c.kind(), c.count_absent() > 0))
                .collect(),
        )
    }

    /// One row as raw stored values (factor cells stay codes).
    pub fn row(&self, row: usize) -> Result<Vec<Value>> {
        if row >= self.num_rows {
            return Err(Error::RowOutOfBounds {
                row,
                len: self.num_rows,
            });
        }
        Ok(self
            .columns
            .iter()
            .map(|c| c.values()[row].clone())
            .collect())
    }

    /// Column-wise append: `other`'s columns follow this table's columns.
    pub fn append_columns(&self, other: &Table) -> Result<Table> {
        if self.num_rows != other.num_rows {
            return Err(Error::ShapeMismatch {
                context: "column-wise append".into(),
                expected: self.num_rows,
                found: other.num_rows,
            });
        }
        let mut columns = self.columns.clone();
        columns.extend(other.columns.iter().cloned());
        Self::with_num_rows(self.num_rows, columns)
    }

    /// Replace the column of the same name, or append it.
    pub fn with_column(&self, column: Column) -> Result<Table> {
        let mut columns = self.columns.clone();
        match self.column_index(column.name()) {
            Some(idx) => columns[idx] = column,
            None => columns.push(column),
        }
        Self::with_num_rows(self.num_rows, columns)
    }

    /// Project to the named columns, in the given order.
    pub fn select(&self, names: &[&str]) -> Result<Table> {
        let columns = names
            .iter()
            .map(|n| self.column(n).cloned())
            .collect::<Result<Vec<_>>>()?;
        Self::with_num_rows(self.num_rows, columns)
    }

    /// Gather rows by position; `None` yields an all-absent row.
    pub fn take(&self, positions: &[Option<usize>]) -> Result<Table> {
        let columns = self
            .columns
            .iter()
            .map(|c| c.take(positions))
            .collect::<Result<Vec<_>>>()?;
        Self::with_num_rows(positions.len(), columns)
    }

    /// Resolve column names to indices, failing on the first unknown one.
    pub fn resolve(&self, names: &[String]) -> Result<Vec<usize>> {
        names
            .iter()
            .map(|n| {
                self.column_index(n)
                    .ok_or_else(|| Error::UnknownColumn(n.clone()))
            })
            .collect()
    }

    /// Key tuple of `row` over the columns at `indices`. Factor cells
    /// resolve to their labels.
    pub fn key_tuple(&self, indices: &[usize], row: usize) -> KeyTuple {
        indices
            .iter()
            .map(|&i| self.columns[i].key_value(row))
            .collect()
    }

    /// Assign each row a bucket in `0..num_partitions` by hashing its key
    /// columns. Equal keys always share a bucket.
    pub fn hash_partition(&self, keys: &[String], num_partitions: usize) -> Result<Vec<usize>> {
        if num_partitions == 0 {
            return Err(Error::Config("num_partitions must be positive".into()));
        }
        let indices = self.resolve(keys)?;
        Ok((0..self.num_rows)
            .map(|row| (hash_key(&self.key_tuple(&indices, row)) % num_partitions as u64) as usize)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_column_table_keeps_its_rows() {
        let t = Table::empty(3);
        let ids = Table::new(vec![Column::int("id", vec![Some(1), Some(2), Some(3)])]).unwrap();
        let joined = t.append_columns(&ids).unwrap();
        assert_eq!(joined.num_rows(), 3);
        assert_eq!(joined.column_names(), vec!["id"]);
    }

    #[test]
    fn take_fills_missing_positions_with_absent() {
        let t = Table::new(vec![Column::int("id", vec![Some(7), Some(8)])]).unwrap();
        let out = t.take(&[Some(1), None]).unwrap();
        assert_eq!(
            out.column("id").unwrap().values(),
            &[Value::Int(8), Value::Absent]
        );
    }
}
