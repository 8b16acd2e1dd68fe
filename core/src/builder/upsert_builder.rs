//! Upsert Builder - 插入，冲突时更新或忽略
//!
//! - PostgreSQL / SQLite: `ON CONFLICT (..) DO UPDATE SET c = EXCLUDED.c` 或 `DO NOTHING`
//! - MySQL: `ON DUPLICATE KEY UPDATE c = VALUES(c)` 或 `INSERT IGNORE`

use super::{check_column, check_table, column_list, shared_columns, values_rows, BuiltSql};
use crate::db_pool::DbDriver;
use crate::error::DbError;
use crate::value::{Binds, Record};

pub struct UpsertBuilder<'a> {
    table: &'a str,
    records: &'a [Record],
    conflict_columns: &'a [&'a str],
    update_columns: Option<&'a [&'a str]>,
    returning: Option<&'a str>,
}

impl<'a> UpsertBuilder<'a> {
    /// `update_columns` 为 `None` 时更新冲突列以外的全部列
    pub fn new(
        table: &'a str,
        records: &'a [Record],
        conflict_columns: &'a [&'a str],
        update_columns: Option<&'a [&'a str]>,
    ) -> Self {
        Self {
            table,
            records,
            conflict_columns,
            update_columns,
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
        if self.conflict_columns.is_empty() {
            return Err(DbError::new("Upsert requires at least one conflict column"));
        }
        for column in self.conflict_columns {
            check_column(column)?;
        }

        let updates: Vec<String> = match self.update_columns {
            Some(list) => {
                for column in list {
                    check_column(column)?;
                }
                list.iter().map(|c| c.to_string()).collect()
            }
            None => columns
                .iter()
                .filter(|c| !self.conflict_columns.contains(&c.as_str()))
                .cloned()
                .collect(),
        };

        let mut binds = Binds::new();
        let values = values_rows(&columns, self.records, &mut binds);
        let table = driver.escape_table(self.table);
        let column_sql = column_list(driver, &columns);

        let mut sql = match driver {
            DbDriver::MySql if updates.is_empty() => format!(
                "INSERT IGNORE INTO {} ({}) VALUES {}",
                table, column_sql, values
            ),
            DbDriver::MySql => {
                let set = updates
                    .iter()
                    .map(|c| {
                        let col = driver.escape_identifier(c);
                        format!("{} = VALUES({})", col, col)
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                format!(
                    "INSERT INTO {} ({}) VALUES {} ON DUPLICATE KEY UPDATE {}",
                    table, column_sql, values, set
                )
            }
            DbDriver::Postgres | DbDriver::Sqlite => {
                let conflict = self
                    .conflict_columns
                    .iter()
                    .map(|c| driver.escape_identifier(c))
                    .collect::<Vec<_>>()
                    .join(", ");
                let action = if updates.is_empty() {
                    "DO NOTHING".to_string()
                } else {
                    let set = updates
                        .iter()
                        .map(|c| {
                            let col = driver.escape_identifier(c);
                            format!("{} = EXCLUDED.{}", col, col)
                        })
                        .collect::<Vec<_>>()
                        .join(", ");
                    format!("DO UPDATE SET {}", set)
                };
                format!(
                    "INSERT INTO {} ({}) VALUES {} ON CONFLICT ({}) {}",
                    table, column_sql, values, conflict, action
                )
            }
        };

        if let (DbDriver::Postgres, Some(column)) = (driver, self.returning) {
            check_column(column)?;
            sql.push_str(&format!(" RETURNING {}", driver.escape_identifier(column)));
        }
        driver.bind_named(&sql, &binds)
    }
}
