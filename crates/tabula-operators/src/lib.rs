#![forbid(unsafe_code)]
//! tabula-operators: factor codec, multi-value expansion, grouped
//! aggregation, and relational merges over `tabula-core` tables.
//!
//! Design intent:
//! - Pure and synchronous. Every operation maps inputs to a new table or
//!   column and either completes or fails without touching its inputs.
//! - Output order is deterministic: first-appearance order for groups and
//!   tokens, left-then-right row order for merges.
//! - Each operation is a plain function; the `Operator` wrappers add a
//!   planning surface so steps can be chained in a `Pipeline`.

pub mod plan;
pub mod traits;

pub mod aggregate;
pub mod codec;
pub mod crosstab;
pub mod expand;
pub mod join;
pub mod pipeline;

pub use aggregate::{aggregate, group_by, AggSpec, AggregateOp, Aggregated, GroupBy, Reducer};
pub use codec::{assign, decode, drop_unused_levels, encode, relabel, FactorizeOp};
pub use crosstab::crosstab;
pub use expand::{expand, tokenize, ExpandOp};
pub use join::{merge, merge_with, MergeMode, MergeOp, MergeOptions};
pub use pipeline::Pipeline;
pub use plan::OpPlan;
pub use traits::{OpError, Operator};
