//! 表结构声明：按数据库配置分组，用于建表
//!
//! ```ignore
//! let mut declaration = Declaration::new();
//! declaration.push(&main_db, users_table);
//! declaration.push(&main_db, orders_table); // 追加到 main_db 分组
//! for item in declaration.items() {
//!     for sql in item.create_statements() { /* 执行 */ }
//! }
//! ```

use crate::config::DbConfig;
use crate::db_pool::DbDriver;

/// 列结构
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColumnStructure {
    pub name: String,
    /// SQL 类型，例如 `BIGINT`、`VARCHAR(255)`
    pub sql_type: String,
    pub nullable: bool,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub unique: bool,
    /// 默认值（SQL 表达式，原样写入）
    pub default: Option<String>,
    pub comment: Option<String>,
}

impl ColumnStructure {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            ..Default::default()
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn default_value(mut self, expr: impl Into<String>) -> Self {
        self.default = Some(expr.into());
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// 表结构
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableStructure {
    pub name: String,
    pub schema: Option<String>,
    pub comment: Option<String>,
    pub columns: Vec<ColumnStructure>,
}

fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

impl TableStructure {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn column(mut self, column: ColumnStructure) -> Self {
        self.columns.push(column);
        self
    }

    pub fn qualified_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema, self.name),
            None => self.name.clone(),
        }
    }

    fn column_sql(&self, driver: DbDriver, column: &ColumnStructure, inline_pk: bool) -> String {
        let name = driver.escape_identifier(&column.name);
        let upper = column.sql_type.to_uppercase();

        // PostgreSQL 自增主键使用 SERIAL / BIGSERIAL
        let mut sql = match driver {
            DbDriver::Postgres if column.auto_increment && upper.contains("BIGINT") => {
                format!("{} BIGSERIAL", name)
            }
            DbDriver::Postgres if column.auto_increment && upper.contains("INT") => {
                format!("{} SERIAL", name)
            }
            // SQLite 的 AUTOINCREMENT 只能用于 INTEGER PRIMARY KEY
            DbDriver::Sqlite if inline_pk => format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", name),
            _ => format!("{} {}", name, column.sql_type),
        };

        if !column.nullable && !column.primary_key {
            sql.push_str(" NOT NULL");
        }
        if let Some(default) = &column.default {
            sql.push_str(&format!(" DEFAULT {}", default));
        }
        if column.unique && !column.primary_key {
            sql.push_str(" UNIQUE");
        }
        if driver == DbDriver::MySql {
            if column.auto_increment {
                sql.push_str(" AUTO_INCREMENT");
            }
            if let Some(comment) = &column.comment {
                sql.push_str(&format!(" COMMENT {}", quote_literal(comment)));
            }
        }
        sql
    }

    /// 生成建表语句；PostgreSQL 的注释以独立的 `COMMENT ON` 语句返回
    pub fn create_sql(&self, driver: DbDriver) -> Vec<String> {
        let table = driver.escape_table(&self.qualified_name());
        let primary: Vec<&ColumnStructure> =
            self.columns.iter().filter(|c| c.primary_key).collect();
        let sqlite_inline_pk = driver == DbDriver::Sqlite
            && primary.len() == 1
            && primary[0].auto_increment;

        let mut defs: Vec<String> = self
            .columns
            .iter()
            .map(|c| {
                let inline = sqlite_inline_pk && c.primary_key;
                format!("    {}", self.column_sql(driver, c, inline))
            })
            .collect();
        if !primary.is_empty() && !sqlite_inline_pk {
            let keys = primary
                .iter()
                .map(|c| driver.escape_identifier(&c.name))
                .collect::<Vec<_>>()
                .join(", ");
            defs.push(format!("    PRIMARY KEY ({})", keys));
        }

        let mut create = format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{}\n)",
            table,
            defs.join(",\n")
        );
        if let (DbDriver::MySql, Some(comment)) = (driver, &self.comment) {
            create.push_str(&format!(" COMMENT {}", quote_literal(comment)));
        }

        let mut statements = vec![create];
        if driver == DbDriver::Postgres {
            if let Some(comment) = &self.comment {
                statements.push(format!(
                    "COMMENT ON TABLE {} IS {}",
                    table,
                    quote_literal(comment)
                ));
            }
            for column in &self.columns {
                if let Some(comment) = &column.comment {
                    statements.push(format!(
                        "COMMENT ON COLUMN {}.{} IS {}",
                        table,
                        driver.escape_identifier(&column.name),
                        quote_literal(comment)
                    ));
                }
            }
        }
        statements
    }
}

/// 同一数据库配置下的表结构
#[derive(Debug, Clone, PartialEq)]
pub struct DeclarationItem {
    pub config: DbConfig,
    tables: Vec<TableStructure>,
}

impl DeclarationItem {
    pub fn new(config: DbConfig) -> Self {
        Self {
            config,
            tables: Vec::new(),
        }
    }

    pub fn push(&mut self, table: TableStructure) {
        self.tables.push(table);
    }

    pub fn tables(&self) -> &[TableStructure] {
        &self.tables
    }

    /// 按配置 URL 推断驱动，生成该分组所有表的建表语句
    pub fn create_statements(&self) -> Result<Vec<String>, crate::error::DbError> {
        let driver = DbDriver::from_url(&self.config.url)?;
        Ok(self
            .tables
            .iter()
            .flat_map(|table| table.create_sql(driver))
            .collect())
    }
}

/// 声明注册表：配置标识 → 表结构列表
#[derive(Debug, Clone, Default)]
pub struct Declaration {
    items: Vec<DeclarationItem>,
}

impl Declaration {
    pub fn new() -> Self {
        Self::default()
    }

    /// 同一配置（按 `DbConfig::name`）的表追加到已有分组，否则新建分组
    pub fn push(&mut self, config: &DbConfig, table: TableStructure) {
        match self.items.iter_mut().find(|item| item.config.name == config.name) {
            Some(item) => item.push(table),
            None => {
                let mut item = DeclarationItem::new(config.clone());
                item.push(table);
                self.items.push(item);
            }
        }
    }

    pub fn items(&self) -> &[DeclarationItem] {
        &self.items
    }
}
