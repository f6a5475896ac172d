//! 실행 에러 타입

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 연결/풀이 돌려준 실패
#[derive(Debug, Error)]
#[error("{message}")]
pub struct DriverError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl DriverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<sqlx::Error> for DriverError {
    fn from(err: sqlx::Error) -> Self {
        Self {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("execution failed on '{table}': {source}")]
    Execution {
        table: String,
        statement: String,
        #[source]
        source: DriverError,
    },

    #[error("refusing to remove every row of '{table}' without a condition; use remove_all")]
    UnconditionedRemove { table: String },

    #[error("count on '{table}' returned a non-numeric value")]
    NonNumericCount { table: String },
}

impl Error {
    /// 에러 코드 (클라이언트용)
    pub fn code(&self) -> &'static str {
        match self {
            Error::Execution { .. } => "EXECUTION_ERROR",
            Error::UnconditionedRemove { .. } => "UNCONDITIONED_REMOVE",
            Error::NonNumericCount { .. } => "NON_NUMERIC_COUNT",
        }
    }
}
