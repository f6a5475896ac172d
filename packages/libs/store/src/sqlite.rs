//! sqlx 기반 SQLite 드라이버
//!
//! `?` 플레이스홀더와 `LIMIT <offset>, <limit>` 문법을 그대로 받습니다.
//! 리스트 값에 바인딩된 `?`는 `(?, ?, ...)`로, 빈 리스트는 `()`로 펼칩니다.

use async_trait::async_trait;
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, TypeInfo, ValueRef};
use tokio::sync::Mutex;

use rq_sql::{Record, Scalar};

use crate::driver::{Connection, Pool, QueryResult, ResultHeader, Transaction};
use crate::error::DriverError;

/// SQLite 커넥션 풀
#[derive(Debug, Clone)]
pub struct SqliteDriver {
    pool: SqlitePool,
}

impl SqliteDriver {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, DriverError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        tracing::info!(url, max_connections, "sqlite pool connected");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl Connection for SqliteDriver {
    async fn query(&self, sql: &str, values: &[Scalar]) -> Result<QueryResult, DriverError> {
        run(&self.pool, sql, values).await
    }
}

#[async_trait]
impl Pool for SqliteDriver {
    async fn begin(&self) -> Result<Box<dyn Transaction>, DriverError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(SqliteTransaction { tx: Mutex::new(tx) }))
    }
}

/// 풀에서 꺼낸 연결 하나에 묶인 트랜잭션
pub struct SqliteTransaction {
    tx: Mutex<sqlx::Transaction<'static, Sqlite>>,
}

#[async_trait]
impl Connection for SqliteTransaction {
    async fn query(&self, sql: &str, values: &[Scalar]) -> Result<QueryResult, DriverError> {
        let mut tx = self.tx.lock().await;
        run(&mut **tx, sql, values).await
    }
}

#[async_trait]
impl Transaction for SqliteTransaction {
    async fn commit(self: Box<Self>) -> Result<(), DriverError> {
        self.tx.into_inner().commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DriverError> {
        self.tx.into_inner().rollback().await?;
        Ok(())
    }
}

async fn run<'c, E>(executor: E, sql: &str, values: &[Scalar]) -> Result<QueryResult, DriverError>
where
    E: sqlx::Executor<'c, Database = Sqlite>,
{
    let (sql, values) = expand_placeholders(sql, values);
    let query = bind_values(sqlx::query::<Sqlite>(&sql), values);

    if returns_rows(&sql) {
        let rows = query.fetch_all(executor).await?;
        return Ok(QueryResult::Rows(rows.iter().map(row_to_record).collect()));
    }

    let result = query.execute(executor).await?;
    let affected_rows = result.rows_affected();
    // SQLite는 마지막 rowid를 준다. 첫 번째 행 id로 맞춘다.
    let insert_id = (is_insert(&sql) && affected_rows > 0)
        .then(|| result.last_insert_rowid() - affected_rows as i64 + 1);

    Ok(QueryResult::Header(ResultHeader {
        affected_rows,
        insert_id,
    }))
}

/// 첫 키워드가 SELECT/WITH/PRAGMA/VALUES이거나 `RETURNING` 키워드가 있으면 행을 돌려준다
///
/// 따옴표와 주석 안의 단어, `returning_id` 같은 식별자는 키워드로 보지 않습니다.
fn returns_rows(sql: &str) -> bool {
    let mut words = keywords(sql);
    match words.next().as_deref() {
        Some("select" | "with" | "pragma" | "values") => true,
        Some(_) => words.any(|word| word == "returning"),
        None => false,
    }
}

fn is_insert(sql: &str) -> bool {
    keywords(sql).next().as_deref() == Some("insert")
}

/// 따옴표/주석 밖의 단어들 (소문자)
fn keywords(sql: &str) -> impl Iterator<Item = String> {
    let code: String = sql
        .chars()
        .zip(code_mask(sql))
        .map(|(ch, in_code)| if in_code { ch.to_ascii_lowercase() } else { ' ' })
        .collect();
    code.split(|ch: char| !(ch.is_alphanumeric() || ch == '_'))
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect::<Vec<_>>()
        .into_iter()
}

/// 문자마다 SQL 코드인지 여부. 따옴표(`'`, `"`, `` ` ``) 안, `--` 줄 주석,
/// `/* */` 블록 주석은 false
fn code_mask(sql: &str) -> Vec<bool> {
    let chars: Vec<char> = sql.chars().collect();
    let len = chars.len();
    let mut mask = vec![true; len];
    let mut i = 0;

    while i < len {
        let end = match (chars[i], chars.get(i + 1)) {
            (q @ ('\'' | '"' | '`'), _) => chars[i + 1..]
                .iter()
                .position(|&ch| ch == q)
                .map_or(len, |p| i + p + 2),
            ('-', Some('-')) => chars[i..]
                .iter()
                .position(|&ch| ch == '\n')
                .map_or(len, |p| i + p),
            ('/', Some('*')) => chars[i + 2..]
                .windows(2)
                .position(|w| w[0] == '*' && w[1] == '/')
                .map_or(len, |p| i + p + 4),
            _ => {
                i += 1;
                continue;
            }
        };
        mask[i..end].fill(false);
        i = end;
    }
    mask
}

/// 리스트 값에 바인딩된 `?`를 `(?, ?, ...)`로 펼치고 값 목록을 평탄화
///
/// 따옴표와 주석 안의 `?`는 플레이스홀더로 세지 않습니다.
/// 빈 리스트는 `()`가 되어 `IN ()`은 어떤 행과도, `NOT IN ()`은 모든 행과 맞습니다.
fn expand_placeholders(sql: &str, values: &[Scalar]) -> (String, Vec<Scalar>) {
    let mut out = String::with_capacity(sql.len());
    let mut bound = Vec::with_capacity(values.len());
    let mut remaining = values.iter();

    for (ch, in_code) in sql.chars().zip(code_mask(sql)) {
        if !(in_code && ch == '?') {
            out.push(ch);
            continue;
        }
        match remaining.next() {
            Some(Scalar::List(items)) => {
                out.push('(');
                out.push_str(&vec!["?"; items.len()].join(", "));
                out.push(')');
                bound.extend(items.iter().cloned());
            }
            Some(value) => {
                out.push('?');
                bound.push(value.clone());
            }
            None => out.push('?'),
        }
    }

    bound.extend(remaining.cloned());
    (out, bound)
}

fn bind_values<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    values: Vec<Scalar>,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for value in values {
        query = match value {
            Scalar::Null => query.bind(Option::<String>::None),
            Scalar::Bool(b) => query.bind(b),
            Scalar::Int(i) => query.bind(i),
            Scalar::Float(f) => query.bind(f),
            Scalar::Text(s) => query.bind(s),
            // 펼친 뒤에도 남은 중첩 리스트는 JSON 텍스트로 저장
            Scalar::List(items) => query.bind(serde_json::to_string(&items).unwrap_or_default()),
        };
    }
    query
}

fn row_to_record(row: &SqliteRow) -> Record {
    let mut record = Record::with_capacity(row.columns().len());
    for column in row.columns() {
        let index = column.ordinal();
        let type_name = match row.try_get_raw(index) {
            Ok(raw) if !raw.is_null() => Some(raw.type_info().name().to_ascii_uppercase()),
            _ => None,
        };

        let value = match type_name.as_deref() {
            None => Scalar::Null,
            Some("INTEGER" | "INT" | "BIGINT" | "BOOLEAN") => row
                .try_get_unchecked::<i64, _>(index)
                .map(Scalar::Int)
                .unwrap_or(Scalar::Null),
            Some("REAL" | "FLOAT" | "DOUBLE" | "NUMERIC") => row
                .try_get_unchecked::<f64, _>(index)
                .map(Scalar::Float)
                .unwrap_or(Scalar::Null),
            Some("BLOB") => row
                .try_get_unchecked::<Vec<u8>, _>(index)
                .map(|bytes| Scalar::Text(String::from_utf8_lossy(&bytes).into_owned()))
                .unwrap_or(Scalar::Null),
            Some(_) => row
                .try_get_unchecked::<String, _>(index)
                .map(Scalar::Text)
                .unwrap_or(Scalar::Null),
        };

        record.insert(column.name().to_string(), value);
    }
    record
}
