//! Insert Builder - 单行或多行插入

use super::{check_table, column_list, shared_columns, values_rows, BuiltSql};
use crate::db_pool::DbDriver;
use crate::error::DbError;
use crate::value::{Binds, Record};

/// Insert Builder
///
/// 所有记录必须拥有相同的列（以第一条记录为准）。
pub struct InsertBuilder<'a> {
    table: &'a str,
    records: &'a [Record],
    returning: Option<&'a str>,
}

impl<'a> InsertBuilder<'a> {
    pub fn new(table: &'a str, records: &'a [Record]) -> Self {
        Self {
            table,
            records,
            returning: None,
        }
    }

    /// PostgreSQL 下追加 `RETURNING <column>`，其他驱动忽略
    pub fn returning(mut self, column: &'a str) -> Self {
        self.returning = Some(column);
        self
    }

    pub fn build(self, driver: DbDriver) -> Result<BuiltSql, DbError> {
        check_table(self.table)?;
        let columns = shared_columns(self.records)?;
        let mut binds = Binds::new();
        let values = values_rows(&columns, self.records, &mut binds);

        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES {}",
            driver.escape_table(self.table),
            column_list(driver, &columns),
            values
        );
        if let (DbDriver::Postgres, Some(column)) = (driver, self.returning) {
            super::check_column(column)?;
            sql.push_str(&format!(" RETURNING {}", driver.escape_identifier(column)));
        }
        driver.bind_named(&sql, &binds)
    }
}
