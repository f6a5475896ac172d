//! run 명령어

use serde_json::from_value;

use rq_sql::{QueryFactory, Record};
use rq_store::{Collection, RawSql};

use super::{print_output, read_json, OutputFormat};

/// 컬렉션 하나에 대해 연산을 실행하고 결과를 출력
pub struct Runner<'a> {
    collection: &'a Collection,
    factory: QueryFactory,
    format: OutputFormat,
}

impl<'a> Runner<'a> {
    pub fn new(collection: &'a Collection, factory: QueryFactory, format: OutputFormat) -> Self {
        Self {
            collection,
            factory,
            format,
        }
    }

    pub async fn find(&self, params: &str, raw: Option<String>) -> anyhow::Result<()> {
        let rows = match raw {
            Some(sql) => self.collection.find(RawSql::trusted(sql)).await?,
            None => {
                let fragment = self.factory.compile_find(&from_value(read_json(params)?)?)?;
                self.collection.find(fragment).await?
            }
        };
        print_output(self.format, &rows)
    }

    pub async fn count(&self, params: &str, raw: Option<String>) -> anyhow::Result<()> {
        let count = match raw {
            Some(sql) => self.collection.count(RawSql::trusted(sql)).await?,
            None => {
                let fragment = self.factory.compile_count(&from_value(read_json(params)?)?)?;
                self.collection.count(fragment).await?
            }
        };
        match count.value() {
            Some(n) => print_output(self.format, &n),
            None => {
                tracing::warn!(table = self.collection.table(), "count returned a non-numeric value");
                print_output(self.format, &"NaN")
            }
        }
    }

    pub async fn remove(&self, params: &str, raw: Option<String>) -> anyhow::Result<()> {
        let stats = match raw {
            Some(sql) => self.collection.remove(RawSql::trusted(sql)).await?,
            None => {
                let fragment = self.factory.compile_remove(&from_value(read_json(params)?)?)?;
                self.collection.remove(fragment).await?
            }
        };
        print_output(self.format, &stats)
    }

    pub async fn remove_all(&self) -> anyhow::Result<()> {
        let stats = self.collection.remove_all().await?;
        print_output(self.format, &stats)
    }

    pub async fn update(&self, params: &str, raw: Option<String>) -> anyhow::Result<()> {
        let stats = match raw {
            Some(sql) => self.collection.update(RawSql::trusted(sql)).await?,
            None => {
                let fragments = self.factory.compile_update(&from_value(read_json(params)?)?)?;
                self.collection.update(fragments).await?
            }
        };
        if let Some(failure) = &stats.failure {
            tracing::warn!(table = self.collection.table(), "update rolled back: {}", failure.message);
        }
        print_output(self.format, &stats)
    }

    pub async fn insert(&self, records: &str) -> anyhow::Result<()> {
        let records: Vec<Record> = from_value(read_json(records)?)?;
        let inserted = self.collection.insert(records).await?;
        print_output(self.format, &inserted)
    }

    pub async fn aggregate(&self, params: &str) -> anyhow::Result<()> {
        let fragment = self.factory.compile_aggregate(&from_value(read_json(params)?)?)?;
        let rows = self.collection.aggregate(fragment).await?;
        print_output(self.format, &rows)
    }
}
