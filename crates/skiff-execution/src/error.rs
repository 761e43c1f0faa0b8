use arrow::error::ArrowError;
use skiff_common::error::CommonError;
use skiff_plan::error::PlanError;
use thiserror::Error;

pub type ExecutionResult<T> = Result<T, ExecutionError>;

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("error in common: {0}")]
    CommonError(#[from] CommonError),
    #[error("error in plan: {0}")]
    PlanError(#[from] PlanError),
    #[error("error in Arrow: {0}")]
    ArrowError(#[from] ArrowError),
    #[error("missing argument: {0}")]
    MissingArgument(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("not supported: {0}")]
    NotSupported(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

impl ExecutionError {
    pub fn missing(message: impl Into<String>) -> Self {
        ExecutionError::MissingArgument(message.into())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        ExecutionError::InvalidArgument(message.into())
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        ExecutionError::NotSupported(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ExecutionError::InternalError(message.into())
    }
}
