use thiserror::Error;

pub type SqlResult<T> = Result<T, SqlError>;

#[derive(Debug, Error)]
pub enum SqlError {
    #[error("error in SQL parser: {0}")]
    SqlParserError(#[from] sqlparser::parser::ParserError),
    #[error("error in common: {0}")]
    CommonError(#[from] skiff_common::error::CommonError),
    #[error("error in plan: {0}")]
    PlanError(#[from] skiff_plan::error::PlanError),
    #[error("error in execution: {0}")]
    ExecutionError(#[from] skiff_execution::error::ExecutionError),
    #[error("missing argument: {0}")]
    MissingArgument(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("not supported: {0}")]
    NotSupported(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

impl SqlError {
    pub fn missing(message: impl Into<String>) -> Self {
        SqlError::MissingArgument(message.into())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        SqlError::InvalidArgument(message.into())
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        SqlError::NotSupported(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        SqlError::InternalError(message.into())
    }
}
