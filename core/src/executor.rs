//! 基于 sqlx 连接池的 [`Connection`] / [`Statement`] 实现

use crate::builder::{BuiltSql, DeleteBuilder, InsertBuilder, UpdateBuilder, UpsertBuilder};
use crate::connection::{Connection, Statement};
use crate::db_pool::{DbDriver, DbPool};
use crate::error::DbError;
use crate::predicate::Qb;
use crate::value::{BindValue, Binds, Record};
use async_trait::async_trait;
use std::collections::VecDeque;

/// 包装 DbPool 的连接
#[derive(Debug, Clone)]
pub struct SqlxConnection {
    pool: DbPool,
}

impl SqlxConnection {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn driver(&self) -> DbDriver {
        self.pool.driver()
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    async fn execute_built(&self, (sql, values): BuiltSql) -> Result<u64, DbError> {
        Ok(self.pool.execute(&sql, &values).await?.rows_affected)
    }

    /// 执行插入类语句并返回新行标识
    ///
    /// PostgreSQL 读取 RETURNING 的第一列，MySQL / SQLite 使用自增 ID；
    /// 自增 ID 不可用（为 0）时退回到记录中显式给出的标识值。
    async fn insert_returning_id(
        &self,
        (sql, values): BuiltSql,
        identifier: &str,
        record: &Record,
    ) -> Result<BindValue, DbError> {
        let explicit = record.get(identifier).filter(|v| !v.is_null()).cloned();
        match self.driver() {
            DbDriver::Postgres => {
                let rows = self.pool.fetch_all(&sql, &values).await?;
                Ok(rows
                    .first()
                    .and_then(|row| row.get_index(0).cloned())
                    .or(explicit)
                    .unwrap_or(BindValue::Null))
            }
            DbDriver::MySql | DbDriver::Sqlite => {
                let outcome = self.pool.execute(&sql, &values).await?;
                if let Some(id) = explicit {
                    return Ok(id);
                }
                Ok(match outcome.last_insert_id {
                    Some(id) if id != 0 && outcome.rows_affected > 0 => BindValue::Int64(id),
                    _ => BindValue::Null,
                })
            }
        }
    }
}

#[async_trait]
impl Connection for SqlxConnection {
    fn prepare(&self, sql: &str) -> Result<Box<dyn Statement>, DbError> {
        Ok(Box::new(SqlxStatement::new(self.pool.clone(), sql)))
    }

    async fn insert(
        &self,
        table: &str,
        identifier: &str,
        record: &Record,
    ) -> Result<BindValue, DbError> {
        let records = std::slice::from_ref(record);
        let built = InsertBuilder::new(table, records)
            .returning(identifier)
            .build(self.driver())?;
        self.insert_returning_id(built, identifier, record).await
    }

    async fn insert_group(&self, table: &str, records: &[Record]) -> Result<u64, DbError> {
        let built = InsertBuilder::new(table, records).build(self.driver())?;
        self.execute_built(built).await
    }

    async fn update(&self, table: &str, record: &Record, predicate: &Qb) -> Result<u64, DbError> {
        let built = UpdateBuilder::new(table, record, predicate).build(self.driver())?;
        self.execute_built(built).await
    }

    async fn delete(&self, table: &str, predicate: &Qb) -> Result<u64, DbError> {
        let built = DeleteBuilder::new(table, predicate).build(self.driver())?;
        self.execute_built(built).await
    }

    async fn upsert(
        &self,
        table: &str,
        identifier: &str,
        record: &Record,
        conflict_columns: &[&str],
        update_columns: Option<&[&str]>,
    ) -> Result<BindValue, DbError> {
        let records = std::slice::from_ref(record);
        let built = UpsertBuilder::new(table, records, conflict_columns, update_columns)
            .returning(identifier)
            .build(self.driver())?;
        self.insert_returning_id(built, identifier, record).await
    }

    async fn upsert_group(
        &self,
        table: &str,
        records: &[Record],
        conflict_columns: &[&str],
        update_columns: Option<&[&str]>,
    ) -> Result<u64, DbError> {
        let built = UpsertBuilder::new(table, records, conflict_columns, update_columns)
            .build(self.driver())?;
        self.execute_built(built).await
    }
}

/// sqlx 预处理语句：执行时一次性取回全部行，之后按游标读取
pub struct SqlxStatement {
    pool: DbPool,
    sql: String,
    binds: Binds,
    rows: VecDeque<Record>,
    executed: bool,
}

impl SqlxStatement {
    pub fn new(pool: DbPool, sql: impl Into<String>) -> Self {
        Self {
            pool,
            sql: sql.into(),
            binds: Binds::new(),
            rows: VecDeque::new(),
            executed: false,
        }
    }

    fn ensure_executed(&self) -> Result<(), DbError> {
        if self.executed {
            Ok(())
        } else {
            Err(DbError::new("Statement has not been executed"))
        }
    }
}

#[async_trait]
impl Statement for SqlxStatement {
    fn bind_value(&mut self, token: &str, value: BindValue) {
        self.binds.insert(token, value);
    }

    async fn execute(&mut self) -> Result<(), DbError> {
        let (sql, values) = self.pool.driver().bind_named(&self.sql, &self.binds)?;
        let rows = self.pool.fetch_all(&sql, &values).await?;
        self.rows = rows.into();
        self.executed = true;
        Ok(())
    }

    fn fetch_one(&mut self) -> Result<Option<Record>, DbError> {
        self.ensure_executed()?;
        Ok(self.rows.pop_front())
    }

    fn fetch_column(&mut self, index: usize) -> Result<Option<BindValue>, DbError> {
        self.ensure_executed()?;
        Ok(self
            .rows
            .pop_front()
            .and_then(|row| row.get_index(index).cloned()))
    }

    fn fetch_all(&mut self) -> Result<Vec<Record>, DbError> {
        self.ensure_executed()?;
        Ok(self.rows.drain(..).collect())
    }
}
