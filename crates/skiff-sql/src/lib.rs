pub mod error;
pub mod expression;
pub mod planner;

pub use planner::sql;
