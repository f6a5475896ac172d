//! 컴파일 에러 타입
//!
//! 모든 에러는 컴파일 시점에 동기적으로 발생하며 재시도 대상이 아닙니다.
//! 항상 호출자 입력의 결함입니다.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────────────────────
    // Invalid Condition
    // ─────────────────────────────────────────────────────────────────────────────
    #[error("unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("unsupported boolean joiner: {0}")]
    UnsupportedJoiner(String),

    #[error("malformed condition: {reason}")]
    MalformedCondition { reason: String },

    // ─────────────────────────────────────────────────────────────────────────────
    // Policy
    // ─────────────────────────────────────────────────────────────────────────────
    #[error("update payload {index} has no matching condition ({conditions} supplied)")]
    UnpairedPayload { index: usize, conditions: usize },

    // ─────────────────────────────────────────────────────────────────────────────
    // Serialization
    // ─────────────────────────────────────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Error::MalformedCondition {
            reason: reason.into(),
        }
    }

    /// 조건 트리 형태나 연산자를 인식하지 못한 경우
    pub fn is_invalid_condition(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedOperator(_)
                | Error::UnsupportedJoiner(_)
                | Error::MalformedCondition { .. }
        )
    }

    /// 에러 코드 (클라이언트용)
    pub fn code(&self) -> &'static str {
        match self {
            Error::UnsupportedOperator(_)
            | Error::UnsupportedJoiner(_)
            | Error::MalformedCondition { .. } => "INVALID_CONDITION",
            Error::UnpairedPayload { .. } => "UNPAIRED_PAYLOAD",
            Error::Json(_) => "JSON_ERROR",
        }
    }
}
