//! Operator trait + common interfaces.
//!
//! A host calls `plan(...)` to validate a step against its input schemas,
//! then `eval(...)` with the input tables.

use tabula_core::prelude::{Schema, Table};

use crate::plan::OpPlan;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OpError {
    #[error("planning error: {0}")]
    Plan(String),

    #[error("execution error: {0}")]
    Exec(String),

    #[error(transparent)]
    Core(#[from] tabula_core::Error),
}

/// Trait that all operators implement.
///
/// Invariants:
/// - `eval` never mutates its inputs and is deterministic given the same
///   inputs.
/// - Unary operators read `inputs[0]`; merges read `inputs[0]` (left) and
///   `inputs[1]` (right).
pub trait Operator: Send + Sync {
    /// Human-readable operator name (stable).
    fn name(&self) -> &'static str;

    /// Given input schemas, return the output schema and partition hints.
    fn plan(&self, input_schemas: &[Schema]) -> Result<OpPlan, OpError>;

    /// Evaluate the operator over whole tables.
    fn eval(&self, inputs: &[Table]) -> Result<Table, OpError>;
}

/// Fetch the `idx`-th input or fail with a message naming the operator.
pub(crate) fn input<'a, T>(inputs: &'a [T], idx: usize, op: &str) -> Result<&'a T, OpError> {
    inputs
        .get(idx)
        .ok_or_else(|| OpError::Exec(format!("{op} expects input #{idx}")))
}

pub(crate) fn expect_inputs<T>(inputs: &[T], n: usize, op: &str) -> Result<(), OpError> {
    if inputs.len() != n {
        return Err(OpError::Plan(format!(
            "{op} expects {n} input(s), got {}",
            inputs.len()
        )));
    }
    Ok(())
}
