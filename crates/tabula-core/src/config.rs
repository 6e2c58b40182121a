//! Engine configuration that callers can serialize/deserialize.
//!
//! Per-call options (explicit factor levels, the merge mode) are passed to
//! the operation itself; this struct only holds the defaults that apply
//! across calls.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// What `group_by` does with rows whose key tuple contains an absent value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbsentKeyPolicy {
    /// Absent is a regular key component; such rows form their own groups.
    #[default]
    Group,
    /// Rows with any absent key component are left out of every group.
    Drop,
}

impl FromStr for AbsentKeyPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "group" => Ok(AbsentKeyPolicy::Group),
            "drop" => Ok(AbsentKeyPolicy::Drop),
            other => Err(Error::Config(format!("unknown absent-key policy '{other}'"))),
        }
    }
}

impl fmt::Display for AbsentKeyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbsentKeyPolicy::Group => f.write_str("group"),
            AbsentKeyPolicy::Drop => f.write_str("drop"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Token separator for multi-value splitting.
    pub delimiter: String,

    /// Exclude absent target values from reductions.
    pub skip_absent: bool,

    /// Grouping policy for absent key components.
    pub absent_keys: AbsentKeyPolicy,

    /// Suffixes appended to colliding non-key names in a merge (left, right).
    pub merge_suffixes: (String, String),

    /// Optional prefix for indicator column names, e.g. `genre_`.
    pub indicator_prefix: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            delimiter: ",".to_string(),
            skip_absent: true,
            absent_keys: AbsentKeyPolicy::Group,
            merge_suffixes: ("_left".to_string(), "_right".to_string()),
            indicator_prefix: None,
        }
    }
}

impl EngineConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `TABULA_DELIMITER`: multi-value token separator
    /// - `TABULA_SKIP_ABSENT`: `true`/`false`
    /// - `TABULA_ABSENT_KEYS`: `group` or `drop`
    /// - `TABULA_MERGE_SUFFIXES`: two suffixes separated by a comma
    /// - `TABULA_INDICATOR_PREFIX`: indicator column prefix
    ///
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("TABULA_DELIMITER") {
            if !s.is_empty() {
                cfg.delimiter = s;
            }
        }

        if let Ok(s) = std::env::var("TABULA_SKIP_ABSENT") {
            if let Some(v) = parse_bool(&s) {
                cfg.skip_absent = v;
            }
        }

        if let Ok(s) = std::env::var("TABULA_ABSENT_KEYS") {
            if let Ok(v) = s.parse::<AbsentKeyPolicy>() {
                cfg.absent_keys = v;
            }
        }

        if let Ok(s) = std::env::var("TABULA_MERGE_SUFFIXES") {
            if let Some((l, r)) = s.split_once(',') {
                cfg.merge_suffixes = (l.trim().to_string(), r.trim().to_string());
            }
        }

        if let Ok(s) = std::env::var("TABULA_INDICATOR_PREFIX") {
            cfg.indicator_prefix = Some(s);
        }

        cfg
    }

    /// Parse a YAML document; missing keys take their defaults.
    ///
    /// ```yaml
    /// delimiter: "|"
    /// skip_absent: false
    /// absent_keys: drop
    /// merge_suffixes: [".x", ".y"]
    /// ```
    pub fn from_yaml_str(src: &str) -> Result<Self> {
        let cfg: Self = serde_yaml::from_str(src)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.delimiter.is_empty() {
            return Err(Error::Config("delimiter must not be empty".into()));
        }
        if self.merge_suffixes.0 == self.merge_suffixes.1 {
            return Err(Error::Config(format!(
                "merge suffixes must differ, both are '{}'",
                self.merge_suffixes.0
            )));
        }
        Ok(())
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
