//! Convenient re-exports for downstream crates.

pub use crate::column::{Column, Levels};
pub use crate::config::{AbsentKeyPolicy, EngineConfig};
pub use crate::error::{Error, Result};
pub use crate::schema::{Field, Schema};
pub use crate::table::Table;
pub use crate::value::{KeyTuple, Kind, Value};
