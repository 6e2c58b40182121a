//! Operator planning surface.
//!
//! A plan states the output schema an operator will produce for given input
//! schemas, so a pipeline can be checked before any rows are touched.

use serde::{Deserialize, Serialize};
use tabula_core::prelude::Schema;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpPlan {
    pub output_schema: Schema,

    /// Grouping columns (by name) when the operator partitions its input.
    pub partitions: Vec<String>,

    /// Set when extra output columns depend on the data (indicator columns),
    /// in which case `output_schema` lists only the columns known up front.
    pub data_dependent: bool,
}

impl OpPlan {
    pub fn new(output_schema: Schema) -> Self {
        Self {
            output_schema,
            partitions: vec![],
            data_dependent: false,
        }
    }

    pub fn with_partitions(mut self, cols: Vec<String>) -> Self {
        self.partitions = cols;
        self
    }

    pub fn data_dependent(mut self) -> Self {
        self.data_dependent = true;
        self
    }
}
