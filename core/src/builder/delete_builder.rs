//! Delete Builder - 按条件删除

use super::{check_table, BuiltSql};
use crate::db_pool::DbDriver;
use crate::error::DbError;
use crate::predicate::Qb;

/// Delete Builder
///
/// 空条件会被拒绝；确实要清空整张表时请显式传入 `Qb::raw("1 = 1")`。
pub struct DeleteBuilder<'a> {
    table: &'a str,
    predicate: &'a Qb,
}

impl<'a> DeleteBuilder<'a> {
    pub fn new(table: &'a str, predicate: &'a Qb) -> Self {
        Self { table, predicate }
    }

    pub fn build(self, driver: DbDriver) -> Result<BuiltSql, DbError> {
        check_table(self.table)?;
        if self.predicate.is_empty() {
            return Err(DbError::new(
                "Delete operation requires WHERE condition",
            ));
        }
        let sql = format!(
            "DELETE FROM {} WHERE {}",
            driver.escape_table(self.table),
            self.predicate.sql()
        );
        driver.bind_named(&sql, self.predicate.binds())
    }
}
