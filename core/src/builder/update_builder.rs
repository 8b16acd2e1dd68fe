//! Update Builder - 按条件更新

use super::{check_column, check_table, BuiltSql};
use crate::db_pool::DbDriver;
use crate::error::DbError;
use crate::predicate::Qb;
use crate::value::{Binds, Record};

/// Update Builder - 记录中的每一列都会写入 SET 子句（包括 NULL）
pub struct UpdateBuilder<'a> {
    table: &'a str,
    record: &'a Record,
    predicate: &'a Qb,
}

impl<'a> UpdateBuilder<'a> {
    pub fn new(table: &'a str, record: &'a Record, predicate: &'a Qb) -> Self {
        Self {
            table,
            record,
            predicate,
        }
    }

    pub fn build(self, driver: DbDriver) -> Result<BuiltSql, DbError> {
        check_table(self.table)?;
        if self.record.is_empty() {
            return Err(DbError::new("No fields to update"));
        }
        if self.predicate.is_empty() {
            return Err(DbError::new("Update operation requires WHERE condition"));
        }

        // 构建 SET 子句
        let mut binds = Binds::new();
        let mut set_parts = Vec::with_capacity(self.record.len());
        for (index, (column, value)) in self.record.iter().enumerate() {
            check_column(column)?;
            let token = format!(":set_{}", index);
            set_parts.push(format!("{} = {}", driver.escape_identifier(column), token));
            binds.insert(token, value.clone());
        }

        let sql = format!(
            "UPDATE {} SET {} WHERE {}",
            driver.escape_table(self.table),
            set_parts.join(", "),
            self.predicate.sql()
        );
        binds.extend(self.predicate.binds());
        driver.bind_named(&sql, &binds)
    }
}
