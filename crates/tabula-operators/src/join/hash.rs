//! Hash index over the key columns of one merge operand.

use std::collections::HashMap;

use tabula_core::prelude::{KeyTuple, Table, Value};

/// Key tuple -> matching row indices (ascending), built once per merge.
///
/// Tuples with an absent component are never indexed: absent never equals
/// anything in a merge, not even another absent.
#[derive(Debug, Default)]
pub struct KeyIndex {
    rows: HashMap<KeyTuple, Vec<usize>>,
}

impl KeyIndex {
    pub fn build(table: &Table, key_indices: &[usize]) -> Self {
        let mut rows: HashMap<KeyTuple, Vec<usize>> = HashMap::new();
        for row in 0..table.num_rows() {
            let key = table.key_tuple(key_indices, row);
            if is_joinable(&key) {
                rows.entry(key).or_default().push(row);
            }
        }
        Self { rows }
    }

    /// Rows whose key equals `key`, in row order.
    pub fn probe(&self, key: &[Value]) -> &[usize] {
        if !is_joinable(key) {
            return &[];
        }
        self.rows.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of distinct indexed keys.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub fn is_joinable(key: &[Value]) -> bool {
    !key.iter().any(Value::is_absent)
}
