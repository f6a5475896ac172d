//! rq-sql: 범용 쿼리 → SQL 컴파일러
//!
//! 조건 트리와 CRUD 파라미터 객체를 받아 SQL 조각(fragment)과
//! 바인딩할 값 목록을 생성합니다. 이 크레이트는 I/O를 하지 않습니다.
//!
//! 값은 절대 SQL 텍스트에 삽입되지 않고 항상 `?` 플레이스홀더로 바인딩됩니다.
//! 필드 이름은 그대로 삽입되므로 컬럼 허용 목록 검증은 호출자의 책임입니다.
//!
//! # 모듈 구조
//!
//! - `value`: 바인딩 값(`Scalar`)과 레코드(`Record`)
//! - `condition`: 조건 트리와 컴파일러
//! - `params`: 요청 파라미터
//! - `factory`: 연산별 SQL 조각 생성기
//! - `policy`: 폴백 정책
//! - `error`: 에러 타입

pub mod condition;
pub mod error;
pub mod factory;
pub mod params;
pub mod policy;
pub mod value;

pub use condition::{compile, BooleanJoiner, Condition, ConditionGroup, ConditionNode, Fragment, Operator};
pub use error::{Error, Result};
pub use factory::{
    AggregateFragment, CountFragment, FindFragment, QueryFactory, RemoveFragment, UpdateFragment,
};
pub use params::{
    AggregationParams, CountParams, FindParams, RemoveParams, Sort, SortDirection, UpdateRequest,
};
pub use policy::Policy;
pub use value::{Record, Scalar};
