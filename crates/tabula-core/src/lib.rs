#![forbid(unsafe_code)]
//! tabula-core: values, typed columns, tables, configuration, and hashing.
//!
//! Everything here is pure data. Tables and columns are immutable value
//! objects; transformations in `tabula-operators` build new ones instead of
//! mutating their inputs.

pub mod column;
pub mod config;
pub mod error;
pub mod hash;
pub mod prelude;
pub mod schema;
pub mod table;
pub mod value;

pub use column::{Column, Levels};
pub use config::{AbsentKeyPolicy, EngineConfig};
pub use error::{Error, Result};
pub use table::Table;
pub use value::{Kind, KeyTuple, Value};

/// Engine version string for provenance.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
