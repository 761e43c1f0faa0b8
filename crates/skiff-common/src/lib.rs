pub mod config;
pub mod datetime;
pub mod error;
pub mod scalar;
pub mod schema;
