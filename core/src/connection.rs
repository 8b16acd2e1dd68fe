//! 仓储依赖的外部协作者接口
//!
//! 仓储本身只负责组装 SQL 和分发调用，连接、语句执行和写操作执行器
//! 都通过这里的 trait 注入，默认实现见 [`crate::executor`]。

use crate::config::DbConfig;
use crate::error::DbError;
use crate::predicate::Qb;
use crate::value::{BindValue, Record};
use async_trait::async_trait;
use std::sync::Arc;

/// 连接提供者：按配置标识解析配置和连接
pub trait ConnectionProvider: Send + Sync {
    fn config(&self, name: &str) -> Result<DbConfig, DbError>;

    fn connection(&self, name: &str) -> Result<Arc<dyn Connection>, DbError>;
}

/// 数据库连接：预处理读语句，并提供写操作执行器
///
/// `table` 为未转义的表名，可能带 `schema.` 前缀。
#[async_trait]
pub trait Connection: Send + Sync {
    fn prepare(&self, sql: &str) -> Result<Box<dyn Statement>, DbError>;

    /// 插入一行，返回新行的标识
    async fn insert(&self, table: &str, identifier: &str, record: &Record)
        -> Result<BindValue, DbError>;

    /// 批量插入，返回影响行数
    async fn insert_group(&self, table: &str, records: &[Record]) -> Result<u64, DbError>;

    async fn update(&self, table: &str, record: &Record, predicate: &Qb) -> Result<u64, DbError>;

    async fn delete(&self, table: &str, predicate: &Qb) -> Result<u64, DbError>;

    /// 插入或更新一行；`update_columns` 为 `None` 时更新冲突列以外的全部列
    async fn upsert(
        &self,
        table: &str,
        identifier: &str,
        record: &Record,
        conflict_columns: &[&str],
        update_columns: Option<&[&str]>,
    ) -> Result<BindValue, DbError>;

    async fn upsert_group(
        &self,
        table: &str,
        records: &[Record],
        conflict_columns: &[&str],
        update_columns: Option<&[&str]>,
    ) -> Result<u64, DbError>;
}

/// 预处理语句：先绑定、再执行、最后按游标读取结果
#[async_trait]
pub trait Statement: Send {
    fn bind_value(&mut self, token: &str, value: BindValue);

    async fn execute(&mut self) -> Result<(), DbError>;

    /// 读取下一行
    fn fetch_one(&mut self) -> Result<Option<Record>, DbError>;

    /// 读取下一行的第 `index` 列
    fn fetch_column(&mut self, index: usize) -> Result<Option<BindValue>, DbError>;

    /// 读取剩余全部行
    fn fetch_all(&mut self) -> Result<Vec<Record>, DbError>;
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use crate::value::Binds;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// 记录调用的内存连接，不访问数据库
    #[derive(Default)]
    pub(crate) struct MockConnection {
        pub prepared: Mutex<Vec<String>>,
        pub bound: Mutex<Vec<Binds>>,
        pub rows: Mutex<Vec<Record>>,
        pub mutations: Mutex<Vec<String>>,
        pub fail_with: Mutex<Option<(String, String)>>,
    }

    impl MockConnection {
        pub fn with_rows(rows: Vec<Record>) -> Self {
            let conn = Self::default();
            *conn.rows.lock().unwrap() = rows;
            conn
        }

        pub fn last_sql(&self) -> Option<String> {
            self.prepared.lock().unwrap().last().cloned()
        }

        pub fn last_binds(&self) -> Option<Binds> {
            self.bound.lock().unwrap().last().cloned()
        }

        pub fn fail_mutations(&self, message: &str, code: &str) {
            *self.fail_with.lock().unwrap() = Some((message.to_string(), code.to_string()));
        }

        fn mutate(&self, call: String) -> Result<(), DbError> {
            if let Some((message, code)) = self.fail_with.lock().unwrap().clone() {
                return Err(DbError::new(message).with_code(code));
            }
            self.mutations.lock().unwrap().push(call);
            Ok(())
        }
    }

    struct MockStatement {
        conn: Arc<MockConnection>,
        binds: Binds,
        rows: VecDeque<Record>,
    }

    #[async_trait]
    impl Statement for MockStatement {
        fn bind_value(&mut self, token: &str, value: BindValue) {
            self.binds.insert(token, value);
        }

        async fn execute(&mut self) -> Result<(), DbError> {
            self.conn.bound.lock().unwrap().push(self.binds.clone());
            self.rows = self.conn.rows.lock().unwrap().iter().cloned().collect();
            Ok(())
        }

        fn fetch_one(&mut self) -> Result<Option<Record>, DbError> {
            Ok(self.rows.pop_front())
        }

        fn fetch_column(&mut self, index: usize) -> Result<Option<BindValue>, DbError> {
            Ok(self
                .rows
                .pop_front()
                .and_then(|row| row.get_index(index).cloned()))
        }

        fn fetch_all(&mut self) -> Result<Vec<Record>, DbError> {
            Ok(self.rows.drain(..).collect())
        }
    }

    /// 包装 `Arc<MockConnection>`，以便 `prepare` 返回的语句能回写记录
    pub(crate) struct MockHandle(pub Arc<MockConnection>);

    #[async_trait]
    impl Connection for MockHandle {
        fn prepare(&self, sql: &str) -> Result<Box<dyn Statement>, DbError> {
            self.0.prepared.lock().unwrap().push(sql.to_string());
            Ok(Box::new(MockStatement {
                conn: self.0.clone(),
                binds: Binds::new(),
                rows: VecDeque::new(),
            }))
        }

        async fn insert(
            &self,
            table: &str,
            identifier: &str,
            record: &Record,
        ) -> Result<BindValue, DbError> {
            self.0.mutate(format!("insert {} {}", table, record.len()))?;
            Ok(record
                .get(identifier)
                .cloned()
                .unwrap_or(BindValue::Int64(1)))
        }

        async fn insert_group(&self, table: &str, records: &[Record]) -> Result<u64, DbError> {
            self.0.mutate(format!("insert_group {} {}", table, records.len()))?;
            Ok(records.len() as u64)
        }

        async fn update(&self, table: &str, record: &Record, predicate: &Qb) -> Result<u64, DbError> {
            self.0
                .mutate(format!("update {} {} WHERE {}", table, record.len(), predicate.sql()))?;
            Ok(1)
        }

        async fn delete(&self, table: &str, predicate: &Qb) -> Result<u64, DbError> {
            self.0.mutate(format!("delete {} WHERE {}", table, predicate.sql()))?;
            Ok(1)
        }

        async fn upsert(
            &self,
            table: &str,
            identifier: &str,
            record: &Record,
            conflict_columns: &[&str],
            _update_columns: Option<&[&str]>,
        ) -> Result<BindValue, DbError> {
            self.0
                .mutate(format!("upsert {} ({})", table, conflict_columns.join(", ")))?;
            Ok(record.get(identifier).cloned().unwrap_or(BindValue::Null))
        }

        async fn upsert_group(
            &self,
            table: &str,
            records: &[Record],
            conflict_columns: &[&str],
            _update_columns: Option<&[&str]>,
        ) -> Result<u64, DbError> {
            self.0.mutate(format!(
                "upsert_group {} {} ({})",
                table,
                records.len(),
                conflict_columns.join(", ")
            ))?;
            Ok(records.len() as u64)
        }
    }

    /// 单配置的内存连接提供者
    pub(crate) struct MockProvider {
        pub config: DbConfig,
        pub conn: Arc<MockConnection>,
    }

    impl MockProvider {
        pub fn new(name: &str) -> Self {
            Self::with_connection(name, MockConnection::default())
        }

        pub fn with_connection(name: &str, conn: MockConnection) -> Self {
            Self {
                config: DbConfig::new(name, "sqlite::memory:"),
                conn: Arc::new(conn),
            }
        }

        pub fn with_schema(mut self, schema: &str) -> Self {
            self.config.schema = Some(schema.to_string());
            self
        }
    }

    impl ConnectionProvider for MockProvider {
        fn config(&self, name: &str) -> Result<DbConfig, DbError> {
            if name == self.config.name {
                Ok(self.config.clone())
            } else {
                Err(DbError::new(format!("Unknown database config: {}", name)))
            }
        }

        fn connection(&self, name: &str) -> Result<Arc<dyn Connection>, DbError> {
            self.config(name)?;
            Ok(Arc::new(MockHandle(self.conn.clone())))
        }
    }
}
