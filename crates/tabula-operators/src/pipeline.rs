//! Sequential runner for unary operators.
//!
//! Steps run in order on one thread; each step sees the previous step's
//! output. A failing step aborts the run and nothing partial is returned.

use std::fmt;

use tracing::{debug, debug_span};

use tabula_core::prelude::{Schema, Table};

use crate::plan::OpPlan;
use crate::traits::{OpError, Operator};

#[derive(Default)]
pub struct Pipeline {
    steps: Vec<Box<dyn Operator>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step.
    pub fn then(mut self, op: impl Operator + 'static) -> Self {
        self.steps.push(Box::new(op));
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Plan every step against the schema its predecessor produces.
    pub fn plan(&self, input: &Schema) -> Result<Vec<OpPlan>, OpError> {
        let mut plans = Vec::with_capacity(self.steps.len());
        let mut schema = input.clone();
        for op in &self.steps {
            let plan = op
                .plan(std::slice::from_ref(&schema))
                .map_err(|e| OpError::Plan(format!("{}: {e}", op.name())))?;
            schema = plan.output_schema.clone();
            plans.push(plan);
        }
        Ok(plans)
    }

    pub fn run(&self, input: Table) -> Result<Table, OpError> {
        let mut current = input;
        for (idx, op) in self.steps.iter().enumerate() {
            let span = debug_span!("step", idx, op = op.name());
            let _enter = span.enter();
            let rows_in = current.num_rows();
            current = op.eval(std::slice::from_ref(&current))?;
            debug!(
                rows_in,
                rows_out = current.num_rows(),
                columns = current.num_columns(),
                "executed step"
            );
        }
        Ok(current)
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.steps.iter().map(|op| op.name()))
            .finish()
    }
}
