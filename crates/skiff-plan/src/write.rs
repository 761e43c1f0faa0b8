use std::str::FromStr;

use crate::error::PlanError;

/// What to do when the write target already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveMode {
    Append,
    Overwrite,
    #[default]
    ErrorIfExists,
    IgnoreIfExists,
}

impl FromStr for SaveMode {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "append" => Ok(SaveMode::Append),
            "overwrite" => Ok(SaveMode::Overwrite),
            "error" | "errorifexists" => Ok(SaveMode::ErrorIfExists),
            "ignore" => Ok(SaveMode::IgnoreIfExists),
            other => Err(PlanError::unsupported(format!("save mode: {other}"))),
        }
    }
}
