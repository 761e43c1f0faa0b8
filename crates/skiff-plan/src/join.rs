use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::error::PlanError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    /// Keeps left rows with no match on the right.
    Anti,
}

impl Display for JoinType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JoinType::Inner => "inner",
            JoinType::Left => "left",
            JoinType::Right => "right",
            JoinType::Anti => "anti",
        };
        write!(f, "{name}")
    }
}

impl FromStr for JoinType {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "inner" => Ok(JoinType::Inner),
            "left" | "leftouter" | "left_outer" => Ok(JoinType::Left),
            "right" | "rightouter" | "right_outer" => Ok(JoinType::Right),
            "anti" | "leftanti" | "left_anti" => Ok(JoinType::Anti),
            other => Err(PlanError::unsupported(format!("join type: {other}"))),
        }
    }
}
