//! 写操作 SQL 构建模块
//!
//! 提供 InsertBuilder、UpdateBuilder、DeleteBuilder 和 UpsertBuilder，
//! 生成带命名占位符的 SQL 后统一交给 [`DbDriver::bind_named`] 改写为位置占位符。

pub mod delete_builder;
pub mod insert_builder;
pub mod update_builder;
pub mod upsert_builder;

pub use delete_builder::DeleteBuilder;
pub use insert_builder::InsertBuilder;
pub use update_builder::UpdateBuilder;
pub use upsert_builder::UpsertBuilder;

use crate::db_pool::DbDriver;
use crate::error::DbError;
use crate::utils::{is_safe_field_name, is_safe_table_name};
use crate::value::{BindValue, Binds, Record};

/// 已改写为驱动占位符的 SQL 及其按顺序排列的绑定值
pub type BuiltSql = (String, Vec<BindValue>);

fn check_table(table: &str) -> Result<(), DbError> {
    if is_safe_table_name(table) {
        Ok(())
    } else {
        Err(DbError::new(format!("Invalid table name: '{}'", table)))
    }
}

fn check_column(column: &str) -> Result<(), DbError> {
    if is_safe_field_name(column) {
        Ok(())
    } else {
        Err(DbError::new(format!("Invalid column name: '{}'", column)))
    }
}

/// 取第一条记录的列作为列清单，并要求其余记录列一致
fn shared_columns(records: &[Record]) -> Result<Vec<String>, DbError> {
    let first = records
        .first()
        .ok_or_else(|| DbError::new("No rows to write"))?;
    let columns: Vec<String> = first.columns().map(str::to_string).collect();
    if columns.is_empty() {
        return Err(DbError::new("No fields to write"));
    }
    for column in &columns {
        check_column(column)?;
    }
    for (index, record) in records.iter().enumerate().skip(1) {
        let same = record.len() == columns.len()
            && columns.iter().all(|c| record.get(c).is_some());
        if !same {
            return Err(DbError::new(format!(
                "Row {} does not have the same columns as the first row",
                index
            )));
        }
    }
    Ok(columns)
}

/// 生成 `(:v_0, :v_1, ...)` 形式的 VALUES 行，并写入绑定值
fn values_rows(columns: &[String], records: &[Record], binds: &mut Binds) -> String {
    let mut rows = Vec::with_capacity(records.len());
    for (row, record) in records.iter().enumerate() {
        let mut tokens = Vec::with_capacity(columns.len());
        for (col, column) in columns.iter().enumerate() {
            let token = format!(":v_{}_{}", row, col);
            binds.insert(token.clone(), record.get(column).cloned().unwrap_or(BindValue::Null));
            tokens.push(token);
        }
        rows.push(format!("({})", tokens.join(", ")));
    }
    rows.join(", ")
}

fn column_list(driver: DbDriver, columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| driver.escape_identifier(c))
        .collect::<Vec<_>>()
        .join(", ")
}
