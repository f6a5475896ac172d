//! 연결/풀 추상화
//!
//! 실행 계층이 의존하는 유일한 외부 능력입니다. 연결 수립, 풀 설정,
//! 와이어 인코딩은 구현체의 몫입니다.

use async_trait::async_trait;
use rq_sql::{Record, Scalar};

use crate::error::DriverError;

/// 드라이버 응답
///
/// 행 데이터이거나, 영향받은 행 수와 insert id를 담은 결과 헤더입니다.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    Rows(Vec<Record>),
    Header(ResultHeader),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResultHeader {
    pub affected_rows: u64,
    /// 이 문장이 생성한 첫 번째 행의 id
    pub insert_id: Option<i64>,
}

impl QueryResult {
    pub fn into_rows(self) -> Vec<Record> {
        match self {
            QueryResult::Rows(rows) => rows,
            QueryResult::Header(_) => Vec::new(),
        }
    }

    pub fn affected_rows(&self) -> u64 {
        match self {
            QueryResult::Rows(rows) => rows.len() as u64,
            QueryResult::Header(header) => header.affected_rows,
        }
    }

    pub fn insert_id(&self) -> Option<i64> {
        match self {
            QueryResult::Rows(_) => None,
            QueryResult::Header(header) => header.insert_id,
        }
    }
}

/// 문장 실행 능력
#[async_trait]
pub trait Connection: Send + Sync {
    async fn query(&self, sql: &str, values: &[Scalar]) -> Result<QueryResult, DriverError>;
}

/// 트랜잭션을 열 수 있는 공유 풀
#[async_trait]
pub trait Pool: Connection {
    async fn begin(&self) -> Result<Box<dyn Transaction>, DriverError>;
}

/// 열린 트랜잭션
///
/// 동시에 들어온 `query` 호출은 트랜잭션의 단일 연결 위에서 직렬화됩니다.
#[async_trait]
pub trait Transaction: Connection {
    async fn commit(self: Box<Self>) -> Result<(), DriverError>;

    async fn rollback(self: Box<Self>) -> Result<(), DriverError>;
}
