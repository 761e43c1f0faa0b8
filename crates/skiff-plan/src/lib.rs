pub mod aggregate;
pub mod error;
pub mod expr;
pub mod join;
pub mod udf;
pub mod window;
pub mod write;
