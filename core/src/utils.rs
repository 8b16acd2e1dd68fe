//! 工具函数模块

/// 验证表名是否安全（允许 `schema.table` 形式）
pub fn is_safe_table_name(name: &str) -> bool {
    !name.is_empty() && name.split('.').all(is_safe_field_name)
}

/// 验证字段名是否安全
pub fn is_safe_field_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_')
}
