//! 폴백 정책
//!
//! 에러 대신 조용히 폴백하는 동작들입니다. 기본값은 기존 동작을 그대로
//! 유지하고, 각 동작을 이름 붙은 상수로 노출해 설정으로 바꿀 수 있게 합니다.

use serde::{Deserialize, Serialize};

/// UPDATE 페이로드가 조건보다 많을 때
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurplusPayloadPolicy {
    /// 마지막 조건을 남은 페이로드에 재사용
    #[default]
    ReuseLastCondition,
    /// `UnpairedPayload` 에러
    Reject,
}

/// 조건 없는 DELETE 요청
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnconditionedRemovePolicy {
    /// 거부. 전체 삭제는 `remove_all`로만 가능
    #[default]
    Refuse,
    /// 테이블 전체 삭제
    DeleteAll,
}

/// COUNT 결과가 정수가 아닐 때
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NonNumericCountPolicy {
    /// 센티널(`RowCount::NonNumeric`) 반환
    #[default]
    Sentinel,
    /// 에러
    Error,
}

pub const SURPLUS_PAYLOAD_POLICY: SurplusPayloadPolicy = SurplusPayloadPolicy::ReuseLastCondition;
pub const UNCONDITIONED_REMOVE_POLICY: UnconditionedRemovePolicy = UnconditionedRemovePolicy::Refuse;
pub const NON_NUMERIC_COUNT_POLICY: NonNumericCountPolicy = NonNumericCountPolicy::Sentinel;

/// 정책 묶음
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Policy {
    pub surplus_payload: SurplusPayloadPolicy,
    pub unconditioned_remove: UnconditionedRemovePolicy,
    pub non_numeric_count: NonNumericCountPolicy,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            surplus_payload: SURPLUS_PAYLOAD_POLICY,
            unconditioned_remove: UNCONDITIONED_REMOVE_POLICY,
            non_numeric_count: NON_NUMERIC_COUNT_POLICY,
        }
    }
}
