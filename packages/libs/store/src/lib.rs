//! rq-store: 컬렉션 실행 계층
//!
//! `rq-sql`이 만든 조각을 공유 커넥션 풀에서 실행하고 결과를 정규화합니다.
//!
//! # 모듈 구조
//!
//! - `driver`: 연결/풀/트랜잭션 능력 트레이트
//! - `sqlite`: sqlx 기반 SQLite 드라이버
//! - `collection`: 테이블 단위 CRUD 실행
//! - `error`: 실행 에러 타입

pub mod collection;
pub mod driver;
pub mod error;
pub mod sqlite;

pub use collection::{
    Collection, CollectionOptions, QueryInput, RawSql, RemoveStats, RowCount, Status,
    TransactionFailure, TransactionStage, UpdateStats,
};
pub use driver::{Connection, Pool, QueryResult, ResultHeader, Transaction};
pub use error::{DriverError, Error, Result};
pub use sqlite::SqliteDriver;
