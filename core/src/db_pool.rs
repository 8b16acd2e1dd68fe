use crate::config::DbConfig;
use crate::error::DbError;
use crate::value::{BindValue, Binds, Record};
#[cfg(any(feature = "mysql", feature = "postgres", feature = "sqlite"))]
use bigdecimal::BigDecimal;
#[cfg(any(feature = "mysql", feature = "postgres", feature = "sqlite"))]
use sqlx::Pool;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbDriver {
    MySql,
    Postgres,
    Sqlite,
}

impl DbDriver {
    pub fn from_url(url: &str) -> Result<Self, DbError> {
        if url.starts_with("mysql://") || url.starts_with("mariadb://") {
            Ok(DbDriver::MySql)
        } else if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Ok(DbDriver::Postgres)
        } else if url.starts_with("sqlite://") || url.starts_with("sqlite:") {
            Ok(DbDriver::Sqlite)
        } else {
            Err(DbError::new(format!("Unsupported database URL: {}", url)))
        }
    }

    pub fn placeholder(&self, index: usize) -> String {
        match self {
            DbDriver::MySql | DbDriver::Sqlite => "?".to_string(),
            DbDriver::Postgres => format!("${}", index + 1),
        }
    }

    /// 转义 SQL 标识符
    pub fn escape_identifier(&self, name: &str) -> String {
        match self {
            DbDriver::MySql => format!("`{}`", name.replace('`', "``")),
            DbDriver::Postgres | DbDriver::Sqlite => format!("\"{}\"", name.replace('"', "\"\"")),
        }
    }

    /// 转义表名，`schema.table` 会逐段转义
    pub fn escape_table(&self, table: &str) -> String {
        table
            .split('.')
            .map(|part| self.escape_identifier(part))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// 将命名占位符（`:name`）按出现顺序改写为驱动的位置占位符
    ///
    /// 引号内的内容和 `::` 类型转换不会被当作占位符；
    /// 同一占位符出现多次时，绑定值会按出现次数重复。
    pub fn bind_named(&self, sql: &str, binds: &Binds) -> Result<(String, Vec<BindValue>), DbError> {
        let chars: Vec<char> = sql.chars().collect();
        let mut out = String::with_capacity(sql.len());
        let mut values = Vec::new();
        let mut quote: Option<char> = None;
        let mut i = 0;

        while i < chars.len() {
            let ch = chars[i];
            if let Some(q) = quote {
                out.push(ch);
                if ch == q {
                    quote = None;
                }
                i += 1;
                continue;
            }
            match ch {
                '\'' | '"' | '`' => {
                    quote = Some(ch);
                    out.push(ch);
                    i += 1;
                }
                ':' if chars.get(i + 1) == Some(&':') => {
                    out.push_str("::");
                    i += 2;
                }
                ':' if chars
                    .get(i + 1)
                    .is_some_and(|c| c.is_ascii_alphabetic() || *c == '_') =>
                {
                    let start = i;
                    i += 1;
                    while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                        i += 1;
                    }
                    let token: String = chars[start..i].iter().collect();
                    let value = binds
                        .get(&token)
                        .ok_or_else(|| DbError::new(format!("No value bound for placeholder {}", token)))?;
                    out.push_str(&self.placeholder(values.len()));
                    values.push(value.clone());
                }
                _ => {
                    out.push(ch);
                    i += 1;
                }
            }
        }

        Ok((out, values))
    }
}

/// 一次执行的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecOutcome {
    pub rows_affected: u64,
    /// MySQL / SQLite 的自增 ID；PostgreSQL 请使用 RETURNING
    pub last_insert_id: Option<i64>,
}

/// 宏：根据 BindValue 类型绑定值到查询
///
/// SQLite 不支持定点数类型，定点数以文本绑定。
macro_rules! apply_bind_value {
    ($query:expr, $bind:expr) => {
        apply_bind_value!($query, $bind, decimal => |d: BigDecimal| d)
    };
    ($query:expr, $bind:expr, decimal => $decimal:expr) => {
        match $bind {
            BindValue::String(s) => {
                $query = $query.bind(s);
            }
            BindValue::Int64(i) => {
                $query = $query.bind(i);
            }
            BindValue::Int32(i) => {
                $query = $query.bind(i);
            }
            BindValue::Int16(i) => {
                $query = $query.bind(i);
            }
            BindValue::Float64(f) => {
                $query = $query.bind(f);
            }
            BindValue::Float32(f) => {
                $query = $query.bind(f);
            }
            BindValue::Decimal(d) => {
                $query = $query.bind(($decimal)(d));
            }
            BindValue::Bool(b) => {
                $query = $query.bind(b);
            }
            BindValue::Bytes(b) => {
                $query = $query.bind(b);
            }
            BindValue::DateTime(dt) => {
                $query = $query.bind(dt);
            }
            BindValue::Null => {
                $query = $query.bind(Option::<String>::None);
            }
        }
    };
}

/// 宏：为某个驱动生成「行 → Record」的解码函数
///
/// 按 i64、i32、i16、f64、f32、bool、String、时间的顺序尝试解码，
/// 再交给驱动专有的 `$extra`，最后按字节解码，取第一个类型兼容的结果。
macro_rules! impl_decode_row {
    ($fn_name:ident, $row_ty:ty, $extra:path) => {
        fn $fn_name(row: &$row_ty) -> Result<Record, DbError> {
            use sqlx::{Column as _, Row as _, ValueRef as _};

            let mut record = Record::new();
            for (index, column) in row.columns().iter().enumerate() {
                let name = column.name();
                let is_null = row.try_get_raw(index).map_err(DbError::from)?.is_null();
                let value = if is_null {
                    BindValue::Null
                } else if let Ok(v) = row.try_get::<i64, _>(index) {
                    BindValue::Int64(v)
                } else if let Ok(v) = row.try_get::<i32, _>(index) {
                    BindValue::Int32(v)
                } else if let Ok(v) = row.try_get::<i16, _>(index) {
                    BindValue::Int16(v)
                } else if let Ok(v) = row.try_get::<f64, _>(index) {
                    BindValue::Float64(v)
                } else if let Ok(v) = row.try_get::<f32, _>(index) {
                    BindValue::Float32(v)
                } else if let Ok(v) = row.try_get::<bool, _>(index) {
                    BindValue::Bool(v)
                } else if let Ok(v) = row.try_get::<String, _>(index) {
                    BindValue::String(v)
                } else if let Ok(v) = row.try_get::<chrono::NaiveDateTime, _>(index) {
                    BindValue::DateTime(v)
                } else if let Ok(v) = row.try_get::<chrono::DateTime<chrono::Utc>, _>(index) {
                    BindValue::DateTime(v.naive_utc())
                } else if let Some(v) = $extra(row, index) {
                    v
                } else if let Ok(v) = row.try_get::<Vec<u8>, _>(index) {
                    BindValue::Bytes(v)
                } else {
                    return Err(DbError::new(format!(
                        "Unsupported column type for '{}': {}",
                        name,
                        column.type_info()
                    )));
                };
                record.push(name, value);
            }
            Ok(record)
        }
    };
}

/// MySQL：无符号整数、DECIMAL、日期、时间和 JSON
#[cfg(feature = "mysql")]
fn decode_mysql_extra(row: &sqlx::mysql::MySqlRow, index: usize) -> Option<BindValue> {
    use sqlx::Row as _;

    if let Ok(v) = row.try_get::<u64, _>(index) {
        Some(BindValue::from(v))
    } else if let Ok(v) = row.try_get::<BigDecimal, _>(index) {
        Some(BindValue::Decimal(v))
    } else if let Ok(v) = row.try_get::<chrono::NaiveDate, _>(index) {
        Some(BindValue::String(v.to_string()))
    } else if let Ok(v) = row.try_get::<chrono::NaiveTime, _>(index) {
        Some(BindValue::String(v.to_string()))
    } else if let Ok(v) = row.try_get::<sqlx::types::JsonValue, _>(index) {
        Some(BindValue::String(v.to_string()))
    } else {
        None
    }
}

/// PostgreSQL：NUMERIC（包括 `AVG` / `SUM(bigint)` 的结果）、日期、时间、UUID 和 JSON
#[cfg(feature = "postgres")]
fn decode_pg_extra(row: &sqlx::postgres::PgRow, index: usize) -> Option<BindValue> {
    use sqlx::Row as _;

    if let Ok(v) = row.try_get::<BigDecimal, _>(index) {
        Some(BindValue::Decimal(v))
    } else if let Ok(v) = row.try_get::<chrono::NaiveDate, _>(index) {
        Some(BindValue::String(v.to_string()))
    } else if let Ok(v) = row.try_get::<chrono::NaiveTime, _>(index) {
        Some(BindValue::String(v.to_string()))
    } else if let Ok(v) = row.try_get::<sqlx::types::Uuid, _>(index) {
        Some(BindValue::String(v.to_string()))
    } else if let Ok(v) = row.try_get::<sqlx::types::JsonValue, _>(index) {
        Some(BindValue::String(v.to_string()))
    } else {
        None
    }
}

/// SQLite 的存储类型都已被通用规则覆盖
#[cfg(feature = "sqlite")]
fn decode_sqlite_extra(_row: &sqlx::sqlite::SqliteRow, _index: usize) -> Option<BindValue> {
    None
}

#[cfg(feature = "mysql")]
impl_decode_row!(decode_mysql_row, sqlx::mysql::MySqlRow, decode_mysql_extra);
#[cfg(feature = "postgres")]
impl_decode_row!(decode_pg_row, sqlx::postgres::PgRow, decode_pg_extra);
#[cfg(feature = "sqlite")]
impl_decode_row!(decode_sqlite_row, sqlx::sqlite::SqliteRow, decode_sqlite_extra);

#[derive(Debug, Clone)]
pub struct DbPool {
    driver: DbDriver,
    #[cfg(feature = "mysql")]
    mysql: Option<Arc<Pool<sqlx::MySql>>>,
    #[cfg(feature = "postgres")]
    pg: Option<Arc<Pool<sqlx::Postgres>>>,
    #[cfg(feature = "sqlite")]
    sqlite: Option<Arc<Pool<sqlx::Sqlite>>>,
}

fn no_pool() -> DbError {
    DbError::new("No connection pool available for driver")
}

impl DbPool {
    /// 从数据库 URL 连接并创建 DbPool
    pub async fn connect(url: &str) -> Result<Self, DbError> {
        Self::connect_with(&DbConfig::new("", url)).await
    }

    /// 按配置连接，`max_connections` 为空时使用 sqlx 默认值
    pub async fn connect_with(config: &DbConfig) -> Result<Self, DbError> {
        let driver = DbDriver::from_url(&config.url)?;
        let url = config.url.as_str();

        macro_rules! pool_options {
            ($db:ty) => {{
                let mut options = sqlx::pool::PoolOptions::<$db>::new();
                if let Some(max) = config.max_connections {
                    options = options.max_connections(max);
                }
                options
            }};
        }

        match driver {
            #[cfg(feature = "mysql")]
            DbDriver::MySql => {
                let pool = pool_options!(sqlx::MySql).connect(url).await?;
                Ok(Self::from_mysql_pool(Arc::new(pool)))
            }
            #[cfg(feature = "postgres")]
            DbDriver::Postgres => {
                let pool = pool_options!(sqlx::Postgres).connect(url).await?;
                Ok(Self::from_postgres_pool(Arc::new(pool)))
            }
            #[cfg(feature = "sqlite")]
            DbDriver::Sqlite => {
                let pool = pool_options!(sqlx::Sqlite).connect(url).await?;
                Ok(Self::from_sqlite_pool(Arc::new(pool)))
            }
            #[allow(unreachable_patterns)]
            _ => Err(DbError::new(format!(
                "Unsupported database driver, only mysql, postgres, sqlite is supported, got: {:?}",
                driver
            ))),
        }
    }

    /// 从 MySQL Pool 创建 DbPool
    #[cfg(feature = "mysql")]
    pub fn from_mysql_pool(pool: Arc<Pool<sqlx::MySql>>) -> Self {
        Self {
            driver: DbDriver::MySql,
            mysql: Some(pool),
            #[cfg(feature = "postgres")]
            pg: None,
            #[cfg(feature = "sqlite")]
            sqlite: None,
        }
    }

    /// 从 PostgreSQL Pool 创建 DbPool
    #[cfg(feature = "postgres")]
    pub fn from_postgres_pool(pool: Arc<Pool<sqlx::Postgres>>) -> Self {
        Self {
            driver: DbDriver::Postgres,
            #[cfg(feature = "mysql")]
            mysql: None,
            pg: Some(pool),
            #[cfg(feature = "sqlite")]
            sqlite: None,
        }
    }

    /// 从 SQLite Pool 创建 DbPool
    #[cfg(feature = "sqlite")]
    pub fn from_sqlite_pool(pool: Arc<Pool<sqlx::Sqlite>>) -> Self {
        Self {
            driver: DbDriver::Sqlite,
            #[cfg(feature = "mysql")]
            mysql: None,
            #[cfg(feature = "postgres")]
            pg: None,
            sqlite: Some(pool),
        }
    }

    pub fn driver(&self) -> DbDriver {
        self.driver
    }

    /// 执行查询并返回全部行；`sql` 中使用驱动的位置占位符
    pub async fn fetch_all(&self, sql: &str, binds: &[BindValue]) -> Result<Vec<Record>, DbError> {
        tracing::debug!(sql, binds = binds.len(), "sqlx fetch");
        match self.driver {
            #[cfg(feature = "mysql")]
            DbDriver::MySql => {
                let pool = self.mysql.as_deref().ok_or_else(no_pool)?;
                let mut query = sqlx::query(sql);
                for bind in binds.iter().cloned() {
                    apply_bind_value!(query, bind);
                }
                let rows = query.fetch_all(pool).await?;
                rows.iter().map(decode_mysql_row).collect()
            }
            #[cfg(feature = "postgres")]
            DbDriver::Postgres => {
                let pool = self.pg.as_deref().ok_or_else(no_pool)?;
                let mut query = sqlx::query(sql);
                for bind in binds.iter().cloned() {
                    apply_bind_value!(query, bind);
                }
                let rows = query.fetch_all(pool).await?;
                rows.iter().map(decode_pg_row).collect()
            }
            #[cfg(feature = "sqlite")]
            DbDriver::Sqlite => {
                let pool = self.sqlite.as_deref().ok_or_else(no_pool)?;
                let mut query = sqlx::query(sql);
                for bind in binds.iter().cloned() {
                    apply_bind_value!(query, bind, decimal => |d: BigDecimal| d.to_string());
                }
                let rows = query.fetch_all(pool).await?;
                rows.iter().map(decode_sqlite_row).collect()
            }
            #[allow(unreachable_patterns)]
            _ => Err(no_pool()),
        }
    }

    /// 执行写语句；`sql` 中使用驱动的位置占位符
    pub async fn execute(&self, sql: &str, binds: &[BindValue]) -> Result<ExecOutcome, DbError> {
        tracing::debug!(sql, binds = binds.len(), "sqlx execute");
        match self.driver {
            #[cfg(feature = "mysql")]
            DbDriver::MySql => {
                let pool = self.mysql.as_deref().ok_or_else(no_pool)?;
                let mut query = sqlx::query(sql);
                for bind in binds.iter().cloned() {
                    apply_bind_value!(query, bind);
                }
                let result = query.execute(pool).await?;
                Ok(ExecOutcome {
                    rows_affected: result.rows_affected(),
                    last_insert_id: Some(result.last_insert_id() as i64),
                })
            }
            #[cfg(feature = "postgres")]
            DbDriver::Postgres => {
                let pool = self.pg.as_deref().ok_or_else(no_pool)?;
                let mut query = sqlx::query(sql);
                for bind in binds.iter().cloned() {
                    apply_bind_value!(query, bind);
                }
                let result = query.execute(pool).await?;
                Ok(ExecOutcome {
                    rows_affected: result.rows_affected(),
                    last_insert_id: None,
                })
            }
            #[cfg(feature = "sqlite")]
            DbDriver::Sqlite => {
                let pool = self.sqlite.as_deref().ok_or_else(no_pool)?;
                let mut query = sqlx::query(sql);
                for bind in binds.iter().cloned() {
                    apply_bind_value!(query, bind, decimal => |d: BigDecimal| d.to_string());
                }
                let result = query.execute(pool).await?;
                Ok(ExecOutcome {
                    rows_affected: result.rows_affected(),
                    last_insert_id: Some(result.last_insert_rowid()),
                })
            }
            #[allow(unreachable_patterns)]
            _ => Err(no_pool()),
        }
    }
}
