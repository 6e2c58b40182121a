//! Contingency tables over two key columns, built on `group_by`.

use std::collections::HashSet;

use indexmap::IndexSet;

use tabula_core::prelude::{AbsentKeyPolicy, Column, Result, Table, Value};

use crate::aggregate::GroupBy;

/// Count rows for every (`row_key`, `col_key`) pair.
///
/// One output row per distinct `row_key` value (first appearance), then one
/// integer column per `col_key` value named by its label. A factor
/// `col_key` contributes every level in level order, used or not. Absent
/// values on either side form their own row or `NA` column.
///
/// Column names are unique: a label whose name is already taken (by the
/// row key or an earlier label, e.g. text `"NA"` next to absent) gets the
/// first free `_2`, `_3`, ... suffix.
pub fn crosstab(table: &Table, row_key: &str, col_key: &str) -> Result<Table> {
    let rows = GroupBy::new(table, &[row_key.to_string()], AbsentKeyPolicy::Group)?;
    let pairs = GroupBy::new(
        table,
        &[row_key.to_string(), col_key.to_string()],
        AbsentKeyPolicy::Group,
    )?;

    let across = table.column(col_key)?;
    let mut labels: IndexSet<Value> = IndexSet::new();
    if let Some(levels) = across.levels() {
        labels.extend(levels.iter().map(Value::from));
    }
    for row in 0..across.len() {
        labels.insert(across.key_value(row));
    }

    let mut taken: HashSet<String> = HashSet::from([row_key.to_string()]);
    let mut out = rows.key_table()?;
    for label in &labels {
        let name = unique_name(label.to_string(), &mut taken);
        let counts = rows
            .iter()
            .map(|(key, _)| {
                let pair = [key[0].clone(), label.clone()];
                Some(pairs.get(&pair).map_or(0, |r| r.len()) as i64)
            })
            .collect();
        out = out.append_columns(&Table::with_num_rows(
            rows.len(),
            vec![Column::int(name, counts)],
        )?)?;
    }
    Ok(out)
}

fn unique_name(base: String, taken: &mut HashSet<String>) -> String {
    let mut name = base.clone();
    let mut n = 2;
    while taken.contains(&name) {
        name = format!("{base}_{n}");
        n += 1;
    }
    taken.insert(name.clone());
    name
}
