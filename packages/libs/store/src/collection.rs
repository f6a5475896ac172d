//! 컬렉션 실행 계층
//!
//! 테이블 하나에 묶여 컴파일된 조각(또는 검증된 원시 SQL)을 완성된 문장으로
//! 조립하고, 공유 풀에서 실행한 뒤 드라이버 응답을 연산 결과로 정규화합니다.
//!
//! 풀은 프로세스 수준에서 만들어 넘겨받습니다. 컬렉션은 풀을 소유하거나
//! 닫지 않고, 트랜잭션 상태도 갖지 않습니다.

use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};

use rq_sql::factory::{AggregateFragment, CountFragment, FindFragment, RemoveFragment, UpdateFragment};
use rq_sql::policy::{NonNumericCountPolicy, UnconditionedRemovePolicy};
use rq_sql::{Policy, Record, Scalar};

use crate::driver::{Pool, QueryResult, Transaction};
use crate::error::{DriverError, Error, Result};

/// count 결과에서 읽는 컬럼
pub const COUNT_COLUMN: &str = "count";

/// 외부에서 검증을 마친 원시 SQL
///
/// 이 계층은 원시 SQL을 파싱하거나 정제하지 않고 그대로 실행합니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSql(String);

impl RawSql {
    pub fn trusted(sql: impl Into<String>) -> Self {
        Self(sql.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// 컴파일된 조각 또는 원시 SQL
#[derive(Debug, Clone, PartialEq)]
pub enum QueryInput<F> {
    Fragments(F),
    Raw(RawSql),
}

impl<F> From<RawSql> for QueryInput<F> {
    fn from(raw: RawSql) -> Self {
        QueryInput::Raw(raw)
    }
}

impl From<FindFragment> for QueryInput<FindFragment> {
    fn from(fragment: FindFragment) -> Self {
        QueryInput::Fragments(fragment)
    }
}

impl From<CountFragment> for QueryInput<CountFragment> {
    fn from(fragment: CountFragment) -> Self {
        QueryInput::Fragments(fragment)
    }
}

impl From<RemoveFragment> for QueryInput<RemoveFragment> {
    fn from(fragment: RemoveFragment) -> Self {
        QueryInput::Fragments(fragment)
    }
}

impl From<Vec<UpdateFragment>> for QueryInput<Vec<UpdateFragment>> {
    fn from(fragments: Vec<UpdateFragment>) -> Self {
        QueryInput::Fragments(fragments)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveStats {
    pub status: Status,
    pub deleted_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStage {
    Begin,
    Statement,
    Commit,
}

/// 다중 행 update가 롤백된 이유
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionFailure {
    pub stage: TransactionStage,
    pub message: String,
}

/// update 결과
///
/// 다중 행 update는 실패를 에러로 올리지 않고 `Failure` 상태로 돌려줍니다.
/// 이때 부분 카운트는 노출하지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStats {
    pub status: Status,
    pub modified_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<TransactionFailure>,
}

impl UpdateStats {
    fn success(modified_count: u64) -> Self {
        Self {
            status: Status::Success,
            modified_count: Some(modified_count),
            failure: None,
        }
    }

    fn failure(stage: TransactionStage, err: &DriverError) -> Self {
        Self {
            status: Status::Failure,
            modified_count: None,
            failure: Some(TransactionFailure {
                stage,
                message: err.to_string(),
            }),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}

/// count 결과. 드라이버가 정수가 아닌 값을 주면 `NonNumeric`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RowCount {
    Exact(i64),
    NonNumeric,
}

impl RowCount {
    pub fn value(&self) -> Option<i64> {
        match self {
            RowCount::Exact(n) => Some(*n),
            RowCount::NonNumeric => None,
        }
    }
}

/// 컬렉션 옵션
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CollectionOptions {
    /// insert 결과에 합성 id를 쓰는 필드. 단일 auto-increment 키만 지원
    pub primary_key: String,
    pub policy: Policy,
}

impl Default for CollectionOptions {
    fn default() -> Self {
        Self {
            primary_key: "id".to_string(),
            policy: Policy::default(),
        }
    }
}

/// 테이블 하나에 대한 실행 계층
#[derive(Clone)]
pub struct Collection {
    table: String,
    pool: Arc<dyn Pool>,
    options: CollectionOptions,
}

impl Collection {
    pub fn new(table: impl Into<String>, pool: Arc<dyn Pool>) -> Self {
        Self::with_options(table, pool, CollectionOptions::default())
    }

    pub fn with_options(table: impl Into<String>, pool: Arc<dyn Pool>, options: CollectionOptions) -> Self {
        Self {
            table: table.into(),
            pool,
            options,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn options(&self) -> &CollectionOptions {
        &self.options
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Read
    // ─────────────────────────────────────────────────────────────────────────

    /// `SELECT * FROM <table> [WHERE] [ORDER BY] [LIMIT]`
    pub async fn find(&self, input: impl Into<QueryInput<FindFragment>>) -> Result<Vec<Record>> {
        let (sql, values) = match input.into() {
            QueryInput::Raw(raw) => (raw.0, Vec::new()),
            QueryInput::Fragments(fragment) => {
                let sql = assemble(
                    format!("SELECT * FROM {}", self.table),
                    &[
                        fragment.r#where.as_ref().map(|w| w.text.as_str()),
                        fragment.order_by.as_deref(),
                        fragment.limit.as_deref(),
                    ],
                );
                (sql, fragment.values())
            }
        };
        Ok(self.execute(&sql, &values).await?.into_rows())
    }

    /// 드라이버 count 컬럼이 정수가 아니면 정책에 따라 센티널 또는 에러
    pub async fn count(&self, input: impl Into<QueryInput<CountFragment>>) -> Result<RowCount> {
        let (sql, values) = match input.into() {
            QueryInput::Raw(raw) => (raw.0, Vec::new()),
            QueryInput::Fragments(fragment) => {
                let sql = assemble(
                    format!("SELECT COUNT(*) AS {COUNT_COLUMN} FROM {}", self.table),
                    &[Some(fragment.r#where.text.as_str())],
                );
                (sql, fragment.r#where.values)
            }
        };

        let rows = self.execute(&sql, &values).await?.into_rows();
        let value = rows
            .first()
            .and_then(|row| row.get(COUNT_COLUMN).or_else(|| row.values().next()));

        match value {
            Some(Scalar::Int(n)) => Ok(RowCount::Exact(*n)),
            _ => match self.options.policy.non_numeric_count {
                NonNumericCountPolicy::Sentinel => Ok(RowCount::NonNumeric),
                NonNumericCountPolicy::Error => Err(Error::NonNumericCount {
                    table: self.table.clone(),
                }),
            },
        }
    }

    /// `SELECT <select list> FROM <table> [WHERE] [GROUP BY] [ORDER BY]`
    ///
    /// 행은 평평한 그대로 돌려줍니다.
    pub async fn aggregate(&self, fragment: AggregateFragment) -> Result<Vec<Record>> {
        let sql = assemble(
            format!("SELECT {} FROM {}", fragment.select_list, self.table),
            &[
                fragment.r#where.as_ref().map(|w| w.text.as_str()),
                fragment.group_by.as_deref(),
                fragment.sort.as_deref(),
            ],
        );
        Ok(self.execute(&sql, &fragment.values()).await?.into_rows())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Write
    // ─────────────────────────────────────────────────────────────────────────

    /// 다중 행 INSERT
    ///
    /// 컬럼은 첫 레코드의 키를 따릅니다. 다른 레코드에 없는 컬럼은 NULL.
    /// 각 레코드에 `insert_id + 위치`로 합성한 id를 붙여 돌려줍니다.
    /// 단일 auto-increment 키에서만 맞는 값이고, 첫 레코드가 이미 기본 키를
    /// 갖고 있으면 호출자가 준 id를 그대로 둡니다.
    pub async fn insert(&self, records: Vec<Record>) -> Result<Vec<Record>> {
        let Some(first) = records.first() else {
            return Ok(records);
        };

        let columns: Vec<String> = first.keys().cloned().collect();
        let row = format!("({})", vec!["?"; columns.len()].join(", "));
        let sql = format!(
            "INSERT INTO {} ({}) VALUES {}",
            self.table,
            columns.join(", "),
            vec![row; records.len()].join(", ")
        );
        let values: Vec<Scalar> = records
            .iter()
            .flat_map(|record| {
                columns
                    .iter()
                    .map(move |column| record.get(column).cloned().unwrap_or(Scalar::Null))
            })
            .collect();

        let explicit_keys = first.contains_key(&self.options.primary_key);
        let result = self.execute(&sql, &values).await?;
        if explicit_keys {
            return Ok(records);
        }
        let Some(insert_id) = result.insert_id() else {
            tracing::debug!(table = %self.table, "driver reported no insert id");
            return Ok(records);
        };

        Ok(records
            .into_iter()
            .zip(insert_id..)
            .map(|(mut record, id)| {
                record.insert(self.options.primary_key.clone(), Scalar::Int(id));
                record
            })
            .collect())
    }

    /// 조건 없는 remove 조각은 기본 정책상 거부됩니다. 전체 삭제는 `remove_all`.
    pub async fn remove(&self, input: impl Into<QueryInput<RemoveFragment>>) -> Result<RemoveStats> {
        match input.into() {
            QueryInput::Raw(raw) => self.delete(&raw.0, &[]).await,
            QueryInput::Fragments(fragment) => {
                if fragment.is_unconditioned()
                    && self.options.policy.unconditioned_remove == UnconditionedRemovePolicy::Refuse
                {
                    return Err(Error::UnconditionedRemove {
                        table: self.table.clone(),
                    });
                }
                let sql = assemble(
                    format!("DELETE FROM {}", self.table),
                    &[Some(fragment.r#where.text.as_str())],
                );
                self.delete(&sql, &fragment.r#where.values).await
            }
        }
    }

    /// 테이블의 모든 행 삭제
    pub async fn remove_all(&self) -> Result<RemoveStats> {
        self.delete(&format!("DELETE FROM {}", self.table), &[]).await
    }

    async fn delete(&self, sql: &str, values: &[Scalar]) -> Result<RemoveStats> {
        let result = self.execute(sql, values).await?;
        Ok(RemoveStats {
            status: Status::Success,
            deleted_count: result.affected_rows(),
        })
    }

    /// update
    ///
    /// 단일 조각은 바로 실행하고 실패는 에러로 올립니다. 여러 조각은 한
    /// 트랜잭션 안에서 동시에 실행하고, 하나라도 실패하면 전체를 롤백한 뒤
    /// `Failure` 상태를 돌려줍니다.
    pub async fn update(&self, input: impl Into<QueryInput<Vec<UpdateFragment>>>) -> Result<UpdateStats> {
        let fragments = match input.into() {
            QueryInput::Raw(raw) => {
                let result = self.execute(&raw.0, &[]).await?;
                return Ok(UpdateStats::success(result.affected_rows()));
            }
            QueryInput::Fragments(fragments) => fragments,
        };

        match fragments.as_slice() {
            [] => Ok(UpdateStats::success(0)),
            [fragment] => {
                let (sql, values) = self.update_statement(fragment);
                let result = self.execute(&sql, &values).await?;
                Ok(UpdateStats::success(result.affected_rows()))
            }
            _ => Ok(self.update_in_transaction(&fragments).await),
        }
    }

    fn update_statement(&self, fragment: &UpdateFragment) -> (String, Vec<Scalar>) {
        let sql = assemble(
            format!("UPDATE {} SET {}", self.table, fragment.set_clause()),
            &[Some(fragment.r#where.text.as_str())],
        );
        (sql, fragment.bound_values())
    }

    // Idle → TransactionOpen → Committed | RolledBack
    async fn update_in_transaction(&self, fragments: &[UpdateFragment]) -> UpdateStats {
        let tx = match self.pool.begin().await {
            Ok(tx) => tx,
            Err(err) => {
                tracing::warn!(table = %self.table, error = %err, "failed to begin update transaction");
                return UpdateStats::failure(TransactionStage::Begin, &err);
            }
        };

        let statements: Vec<(String, Vec<Scalar>)> =
            fragments.iter().map(|f| self.update_statement(f)).collect();
        let results = join_all(statements.iter().map(|(sql, values)| {
            tracing::debug!(table = %self.table, sql = %sql, values = values.len(), "executing statement in transaction");
            tx.query(sql, values)
        }))
        .await;

        let mut modified = 0;
        let mut first_error = None;
        for result in results {
            match result {
                Ok(result) => modified += result.affected_rows(),
                Err(err) if first_error.is_none() => first_error = Some(err),
                Err(_) => {}
            }
        }

        if let Some(err) = first_error {
            tracing::warn!(table = %self.table, error = %err, "multi-row update failed; rolling back");
            if let Err(rollback_err) = tx.rollback().await {
                tracing::error!(table = %self.table, error = %rollback_err, "rollback failed");
            }
            return UpdateStats::failure(TransactionStage::Statement, &err);
        }

        match tx.commit().await {
            Ok(()) => UpdateStats::success(modified),
            Err(err) => {
                tracing::warn!(table = %self.table, error = %err, "failed to commit update transaction");
                UpdateStats::failure(TransactionStage::Commit, &err)
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transaction
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn start_transaction(&self) -> Result<Box<dyn Transaction>> {
        self.pool.begin().await.map_err(|source| self.execution_error("BEGIN", source))
    }

    pub async fn commit_transaction(&self, tx: Box<dyn Transaction>) -> Result<()> {
        tx.commit().await.map_err(|source| self.execution_error("COMMIT", source))
    }

    pub async fn rollback_transaction(&self, tx: Box<dyn Transaction>) -> Result<()> {
        tx.rollback().await.map_err(|source| self.execution_error("ROLLBACK", source))
    }

    async fn execute(&self, sql: &str, values: &[Scalar]) -> Result<QueryResult> {
        tracing::debug!(table = %self.table, sql, values = values.len(), "executing statement");
        self.pool
            .query(sql, values)
            .await
            .map_err(|source| self.execution_error(sql, source))
    }

    fn execution_error(&self, statement: &str, source: DriverError) -> Error {
        Error::Execution {
            table: self.table.clone(),
            statement: statement.to_string(),
            source,
        }
    }
}

fn assemble(head: String, clauses: &[Option<&str>]) -> String {
    clauses
        .iter()
        .flatten()
        .filter(|clause| !clause.is_empty())
        .fold(head, |mut sql, clause| {
            sql.push(' ');
            sql.push_str(clause);
            sql
        })
}
