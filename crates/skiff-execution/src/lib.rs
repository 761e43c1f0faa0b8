pub mod aggregate;
pub mod dataframe;
pub mod error;
pub mod eval;
pub mod explode;
pub mod format;
pub mod functions;
pub mod join;
pub mod session;
pub mod utils;
pub mod window;
