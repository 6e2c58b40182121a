#![forbid(unsafe_code)]
//! tabula: a small in-memory tabular engine.
//!
//! - factor columns with a closed level set (`codec`)
//! - delimited multi-value columns to indicator tables (`expand`)
//! - grouped aggregation over one or more keys (`aggregate`)
//! - inner/left/right/full merges on shared columns (`join`)
//!
//! This crate re-exports the workspace members; see `tabula_core` for the
//! data model and `tabula_operators` for the operations.

pub use tabula_core;
pub use tabula_operators;

pub mod prelude {
    pub use tabula_core::prelude::*;
    pub use tabula_operators::{
        aggregate, assign, crosstab, decode, drop_unused_levels, encode, expand, group_by, merge,
        merge_with, relabel, tokenize, AggSpec, AggregateOp, Aggregated, ExpandOp, FactorizeOp,
        GroupBy, MergeMode, MergeOp, MergeOptions, OpError, OpPlan, Operator, Pipeline, Reducer,
    };
}
