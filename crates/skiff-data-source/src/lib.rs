pub mod error;
pub mod formats;
pub mod listing;
pub mod options;
pub mod writer;
