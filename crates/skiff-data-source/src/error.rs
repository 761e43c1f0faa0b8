use thiserror::Error;

pub type DataSourceResult<T> = Result<T, DataSourceError>;

#[derive(Debug, Error)]
pub enum DataSourceError {
    #[error("error in common: {0}")]
    CommonError(#[from] skiff_common::error::CommonError),
    #[error("error in execution: {0}")]
    ExecutionError(#[from] skiff_execution::error::ExecutionError),
    #[error("error in Arrow: {0}")]
    ArrowError(#[from] arrow::error::ArrowError),
    #[error("error in Parquet: {0}")]
    ParquetError(#[from] parquet::errors::ParquetError),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("missing argument: {0}")]
    MissingArgument(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("not supported: {0}")]
    NotSupported(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

impl DataSourceError {
    pub fn missing(message: impl Into<String>) -> Self {
        DataSourceError::MissingArgument(message.into())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        DataSourceError::InvalidArgument(message.into())
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        DataSourceError::NotSupported(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        DataSourceError::InternalError(message.into())
    }
}
