//! Shared fixtures for integration tests.
#![allow(dead_code)]

use tabula_core::prelude::{Column, Table, Value};

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn text_values(items: &[Option<&str>]) -> Vec<Value> {
    items.iter().map(|s| Value::from(*s)).collect()
}

/// Small movie catalogue: a categorical rating, a delimited genre list, a
/// numeric score with gaps.
pub fn movies() -> Table {
    Table::new(vec![
        Column::int("id", vec![Some(1), Some(2), Some(3), Some(4), Some(5), Some(6)]),
        Column::text(
            "rating",
            vec![Some("PG"), Some("R"), Some("PG"), None, Some("G"), Some("R")],
        ),
        Column::text(
            "genres",
            vec![
                Some("Drama, Comedy"),
                Some("Action"),
                None,
                Some("Comedy,Action, Drama"),
                Some(""),
                Some("Drama"),
            ],
        ),
        Column::real(
            "score",
            vec![Some(7.5), Some(6.0), None, Some(8.0), Some(5.5), Some(9.0)],
        ),
    ])
    .expect("movies table")
}

pub fn column_ints(table: &Table, name: &str) -> Vec<Option<i64>> {
    table
        .column(name)
        .expect("column")
        .values()
        .iter()
        .map(|v| match v {
            Value::Int(i) => Some(*i),
            Value::Absent => None,
            other => panic!("expected integer, got {other:?}"),
        })
        .collect()
}
